use ndarray::{ArrayD, Axis};
use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Helper that wraps a planned forward `rustfft` transform for reuse.
#[derive(Clone)]
pub struct FftHelper {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transforms every lane of `data` along `axis` in place.
    ///
    /// The lane length must match the planned size.
    pub fn forward_along(&self, data: &mut ArrayD<Complex32>, axis: Axis) {
        let mut buffer = vec![Complex32::zero(); self.size];
        for mut lane in data.lanes_mut(axis) {
            for (slot, value) in buffer.iter_mut().zip(lane.iter()) {
                *slot = *value;
            }
            self.fft.process(&mut buffer);
            for (value, slot) in lane.iter_mut().zip(buffer.iter()) {
                *value = *slot;
            }
        }
    }
}

impl fmt::Debug for FftHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftHelper").field("size", &self.size).finish()
    }
}

/// Moves the zero-frequency bin to the centre of each lane along `axis`.
pub fn fft_shift_along(data: &mut ArrayD<Complex32>, axis: Axis) {
    for mut lane in data.lanes_mut(axis) {
        let mut values = lane.to_vec();
        let half = values.len() / 2;
        values.rotate_right(half);
        for (value, shifted) in lane.iter_mut().zip(values) {
            *value = shifted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn naive_dft(lane: &[f32]) -> Vec<Complex32> {
        let n = lane.len();
        (0..n)
            .map(|k| {
                lane.iter()
                    .enumerate()
                    .map(|(t, &x)| {
                        let phase = -2.0 * std::f32::consts::PI * (k * t) as f32 / n as f32;
                        Complex32::from_polar(x, phase)
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn forward_along_matches_direct_dft_on_every_lane() {
        let helper = FftHelper::new(4);
        let lane = [1.0f32, 2.0, 0.0, -1.0];
        let expected = naive_dft(&lane);

        let mut data = ArrayD::from_shape_fn(IxDyn(&[2, 4]), |idx| {
            Complex32::new(lane[idx[1]], 0.0)
        });
        helper.forward_along(&mut data, Axis(1));

        for row in data.outer_iter() {
            for (got, want) in row.iter().zip(expected.iter()) {
                assert!((got - want).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn forward_along_leading_axis_transforms_columns() {
        let helper = FftHelper::new(4);
        let mut data = ArrayD::from_elem(IxDyn(&[4, 3]), Complex32::new(1.0, 0.0));
        helper.forward_along(&mut data, Axis(0));
        for (row, values) in data.outer_iter().enumerate() {
            let want = if row == 0 { 4.0 } else { 0.0 };
            for value in values.iter() {
                assert!((*value - Complex32::new(want, 0.0)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn shift_moves_dc_to_centre() {
        let mut data = ArrayD::from_shape_fn(IxDyn(&[4]), |idx| {
            Complex32::new(idx[0] as f32, 0.0)
        });
        fft_shift_along(&mut data, Axis(0));
        let reals: Vec<f32> = data.iter().map(|c| c.re).collect();
        assert_eq!(reals, vec![2.0, 3.0, 0.0, 1.0]);
    }
}
