use crate::math::MatrixHelper;
use crate::prelude::{
    unsupported, Samples, Shape, ShapeContract, StageError, StageResult, Transform,
};
use crate::processing::selector::selector;
use ndarray::{Array1, Axis};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

selector! {
    /// Apodization window family.
    WindowType, "window type" {
        Hann => "hann",
    }
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::Hann
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Axis the window runs along; negative values count from the end.
    pub axis: isize,
    pub window_type: WindowType,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            axis: -1,
            window_type: WindowType::Hann,
        }
    }
}

/// Symmetric Hann window of `length` points.
pub fn hann(length: usize) -> Array1<f32> {
    if length == 1 {
        return Array1::ones(1);
    }
    let span = (length.max(2) - 1) as f32;
    Array1::from_shape_fn(length, |n| 0.5 - 0.5 * (2.0 * PI * n as f32 / span).cos())
}

/// Multiplies the input by a unity-gain window broadcast along one axis.
#[derive(Debug, Clone)]
pub struct WindowStage {
    contract: ShapeContract,
    axis: Axis,
    window: Array1<f32>,
}

impl WindowStage {
    pub fn new(config: WindowConfig, in_shape: Shape) -> StageResult<Self> {
        let axis = in_shape.resolve_axis(config.axis).ok_or_else(|| {
            StageError::InvalidParameter(format!(
                "window axis {} out of range for shape {}",
                config.axis, in_shape
            ))
        })?;
        let length = in_shape.dims()[axis];

        let raw = match config.window_type {
            WindowType::Hann => hann(length),
        };
        let sum = raw.sum();
        if length > 0 && !(sum > 0.0) {
            return Err(StageError::InvalidParameter(format!(
                "{} window of length {} has no energy",
                config.window_type, length
            )));
        }
        let window = if length > 0 {
            raw * (length as f32 / sum)
        } else {
            raw
        };

        Ok(Self {
            contract: ShapeContract::preserving(in_shape),
            axis: Axis(axis),
            window,
        })
    }

    /// Normalized window; its samples sum to its length.
    pub fn window(&self) -> &Array1<f32> {
        &self.window
    }
}

impl Transform for WindowStage {
    fn name(&self) -> &'static str {
        "window"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        match input {
            Samples::Real(data) => Ok(Samples::Real(MatrixHelper::scale_along_axis(
                data,
                self.axis,
                self.window.view(),
            ))),
            Samples::Complex(data) => {
                let window = self.window.mapv(|w| Complex32::new(w, 0.0));
                Ok(Samples::Complex(MatrixHelper::scale_along_axis(
                    data,
                    self.axis,
                    window.view(),
                )))
            }
            other => Err(unsupported(self.name(), "real or complex", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn normalized_window_has_unity_average_gain() {
        let stage = WindowStage::new(WindowConfig::default(), Shape::from([3, 64])).unwrap();
        let window = stage.window();
        assert_eq!(window.len(), 64);
        assert!((window.sum() - 64.0).abs() < 1e-3);
    }

    #[test]
    fn dividing_by_window_restores_constant_input() {
        let shape = Shape::from([2, 32]);
        let stage = WindowStage::new(WindowConfig::default(), shape.clone()).unwrap();
        let data = ArrayD::from_elem(IxDyn(shape.dims()), 3.5f32);
        let output = stage.invoke(&Samples::Real(data)).unwrap();
        let output = output.as_real().unwrap();

        for row in output.outer_iter() {
            for (value, &w) in row.iter().zip(stage.window().iter()) {
                if w.abs() > 1e-6 {
                    assert!((value / w - 3.5).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn window_applies_along_leading_axis() {
        let config = WindowConfig {
            axis: 0,
            window_type: WindowType::Hann,
        };
        let stage = WindowStage::new(config, Shape::from([5, 2])).unwrap();
        let data = ArrayD::from_elem(IxDyn(&[5, 2]), 1.0f32);
        let output = stage.invoke(&Samples::Real(data)).unwrap();
        let output = output.as_real().unwrap();
        for (n, &w) in stage.window().iter().enumerate() {
            assert_eq!(output[[n, 0]], w);
            assert_eq!(output[[n, 1]], w);
        }
        assert_eq!(output[[0, 0]], 0.0);
    }

    #[test]
    fn unknown_window_type_is_invalid_parameter() {
        let err = "blackman".parse::<WindowType>().unwrap_err();
        assert!(matches!(err, StageError::InvalidParameter(_)));
    }

    #[test]
    fn axis_outside_shape_is_rejected() {
        let config = WindowConfig {
            axis: 2,
            window_type: WindowType::Hann,
        };
        assert!(WindowStage::new(config, Shape::from([4, 4])).is_err());
    }
}
