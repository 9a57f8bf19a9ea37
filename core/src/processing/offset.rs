use crate::prelude::{unsupported, Samples, Shape, ShapeContract, StageResult, Transform};
use ndarray::{ArrayD, Axis, Zip};
use num_complex::Complex32;
use std::ops::{Add, Div, Sub};

/// Removes the DC offset of every ramp by subtracting the mean of each
/// last-axis lane.
#[derive(Debug, Clone)]
pub struct OffsetRemoval {
    contract: ShapeContract,
}

impl OffsetRemoval {
    pub fn new(in_shape: Shape) -> Self {
        Self {
            contract: ShapeContract::preserving(in_shape),
        }
    }
}

fn remove_lane_mean<A>(data: &ArrayD<A>, zero: A) -> ArrayD<A>
where
    A: Copy + Add<Output = A> + Sub<Output = A> + Div<f32, Output = A>,
{
    let mut output = data.clone();
    if output.ndim() == 0 {
        return output;
    }
    let axis = Axis(output.ndim() - 1);
    Zip::from(output.lanes_mut(axis)).for_each(|mut lane| {
        if lane.is_empty() {
            return;
        }
        let mean = lane.iter().fold(zero, |acc, &v| acc + v) / lane.len() as f32;
        lane.mapv_inplace(|v| v - mean);
    });
    output
}

impl Transform for OffsetRemoval {
    fn name(&self) -> &'static str {
        "offset-removal"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        match input {
            Samples::Real(data) => Ok(Samples::Real(remove_lane_mean(data, 0.0))),
            Samples::Complex(data) => Ok(Samples::Complex(remove_lane_mean(
                data,
                Complex32::new(0.0, 0.0),
            ))),
            other => Err(unsupported(self.name(), "real or complex", other)),
        }
    }
}
