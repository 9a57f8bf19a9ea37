use ndarray::{ArrayD, ArrayView1, Axis, Zip};
use std::ops::Mul;

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiplies every lane along `axis` elementwise by `weights`.
    ///
    /// `weights.len()` must equal the size of `axis`.
    pub fn scale_along_axis<A, W>(data: &ArrayD<A>, axis: Axis, weights: ArrayView1<W>) -> ArrayD<A>
    where
        A: Copy + Mul<W, Output = A>,
        W: Copy,
    {
        let mut output = data.clone();
        Zip::from(output.lanes_mut(axis)).for_each(|mut lane| {
            for (value, &weight) in lane.iter_mut().zip(weights.iter()) {
                *value = *value * weight;
            }
        });
        output
    }
}
