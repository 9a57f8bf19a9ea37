use crate::prelude::{
    unsupported, Samples, Shape, ShapeContract, StageError, StageResult, Transform,
};
use crate::processing::selector::selector;
use ndarray::{ArrayD, Axis, Zip};
use serde::{Deserialize, Serialize};

selector! {
    ScaleMode, "scale mode" {
        /// Divide everything by `scaling_factor`.
        Fixed => "fixed",
        /// Divide each last-axis lane by its maximum.
        Max => "max",
    }
}

impl Default for ScaleMode {
    fn default() -> Self {
        ScaleMode::Fixed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub scaling_factor: f32,
    pub mode: ScaleMode,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scaling_factor: 1.0,
            mode: ScaleMode::Fixed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scale {
    contract: ShapeContract,
    config: ScaleConfig,
}

impl Scale {
    pub fn new(config: ScaleConfig, in_shape: Shape) -> StageResult<Self> {
        if config.mode == ScaleMode::Fixed
            && (config.scaling_factor == 0.0 || !config.scaling_factor.is_finite())
        {
            return Err(StageError::InvalidParameter(format!(
                "scaling_factor must be finite and non-zero, got {}",
                config.scaling_factor
            )));
        }
        Ok(Self {
            contract: ShapeContract::preserving(in_shape),
            config,
        })
    }

    fn scale_by_lane_max(data: &ArrayD<f32>) -> ArrayD<f32> {
        let mut output = data.clone();
        if output.ndim() == 0 {
            return output;
        }
        let axis = Axis(output.ndim() - 1);
        Zip::from(output.lanes_mut(axis)).for_each(|mut lane| {
            let max = lane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let divisor = if max == 0.0 || !max.is_finite() { 1.0 } else { max };
            lane.mapv_inplace(|v| v / divisor);
        });
        output
    }
}

impl Transform for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        let factor = self.config.scaling_factor;
        match (self.config.mode, input) {
            (ScaleMode::Fixed, Samples::Real(data)) => Ok(Samples::Real(data.mapv(|v| v / factor))),
            (ScaleMode::Fixed, Samples::Complex(data)) => {
                Ok(Samples::Complex(data.mapv(|v| v / factor)))
            }
            (ScaleMode::Max, Samples::Real(data)) => {
                Ok(Samples::Real(Self::scale_by_lane_max(data)))
            }
            (ScaleMode::Fixed, other) => Err(unsupported(self.name(), "real or complex", other)),
            (ScaleMode::Max, other) => Err(unsupported(self.name(), "real", other)),
        }
    }
}
