use crate::prelude::{Samples, Shape, ShapeContract, StageResult, Transform};
use crate::processing::cfar::{OsCfar, OsCfarConfig};
use crate::processing::cluster::{Dbscan, DbscanConfig};
use crate::processing::identity::Identity;
use crate::processing::offset::OffsetRemoval;
use crate::processing::scale::{Scale, ScaleConfig};
use crate::processing::spectral::{SpectralConfig, SpectralTransform};
use crate::processing::window::{WindowConfig, WindowStage};
use serde::{Deserialize, Serialize};

/// Named stage parameters, as found in a pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum StageSpec {
    OffsetRemoval,
    Window(WindowConfig),
    Spectral(SpectralConfig),
    OsCfar(OsCfarConfig),
    Scale(ScaleConfig),
    Identity,
    Dbscan(DbscanConfig),
}

impl StageSpec {
    /// Validates the parameters against `in_shape` and fixes the output shape.
    pub fn build(&self, in_shape: Shape) -> StageResult<Stage> {
        let stage = match self {
            StageSpec::OffsetRemoval => Stage::OffsetRemoval(OffsetRemoval::new(in_shape)),
            StageSpec::Window(config) => Stage::Window(WindowStage::new(config.clone(), in_shape)?),
            StageSpec::Spectral(config) => {
                Stage::Spectral(SpectralTransform::new(config.clone(), in_shape)?)
            }
            StageSpec::OsCfar(config) => Stage::OsCfar(OsCfar::new(config.clone(), in_shape)?),
            StageSpec::Scale(config) => Stage::Scale(Scale::new(config.clone(), in_shape)?),
            StageSpec::Identity => Stage::Identity(Identity::new(in_shape)),
            StageSpec::Dbscan(config) => Stage::Dbscan(Dbscan::new(config.clone(), in_shape)?),
        };
        Ok(stage)
    }
}

/// Closed set of stage kinds a pipeline can hold.
#[derive(Debug, Clone)]
pub enum Stage {
    OffsetRemoval(OffsetRemoval),
    Window(WindowStage),
    Spectral(SpectralTransform),
    OsCfar(OsCfar),
    Scale(Scale),
    Identity(Identity),
    Dbscan(Dbscan),
}

impl Stage {
    fn inner(&self) -> &dyn Transform {
        match self {
            Stage::OffsetRemoval(stage) => stage,
            Stage::Window(stage) => stage,
            Stage::Spectral(stage) => stage,
            Stage::OsCfar(stage) => stage,
            Stage::Scale(stage) => stage,
            Stage::Identity(stage) => stage,
            Stage::Dbscan(stage) => stage,
        }
    }
}

impl Transform for Stage {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn contract(&self) -> &ShapeContract {
        self.inner().contract()
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        self.inner().transform(input)
    }
}

macro_rules! stage_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Stage {
                fn from(stage: $ty) -> Self {
                    Stage::$variant(stage)
                }
            }
        )+
    };
}

stage_from!(
    OffsetRemoval(OffsetRemoval),
    Window(WindowStage),
    Spectral(SpectralTransform),
    OsCfar(OsCfar),
    Scale(Scale),
    Identity(Identity),
    Dbscan(Dbscan),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::cfar::PaddingMode;
    use crate::processing::spectral::{OutputFormat, SpectralMode};
    use crate::processing::window::WindowType;
    use ndarray::{ArrayD, IxDyn};

    fn sample_specs() -> Vec<StageSpec> {
        let mut spectral = SpectralConfig::new(SpectralMode::RangeDoppler);
        spectral.out_format = OutputFormat::ModulusPhase;
        vec![
            StageSpec::OffsetRemoval,
            StageSpec::Window(WindowConfig {
                axis: -2,
                window_type: WindowType::Hann,
            }),
            StageSpec::Spectral(SpectralConfig::new(SpectralMode::Range)),
            StageSpec::Spectral(SpectralConfig::new(SpectralMode::Doppler)),
            StageSpec::Spectral(spectral),
            StageSpec::OsCfar(OsCfarConfig {
                n_dims: 2,
                window_width: 4,
                n_guard_cells: 2,
                ordered_k: 6,
                alpha: 0.3,
                range_padding: PaddingMode::Mean,
            }),
            StageSpec::Scale(ScaleConfig::default()),
            StageSpec::Identity,
        ]
    }

    #[test]
    fn invocation_shape_matches_declared_out_shape() {
        let in_shape = Shape::from([2, 8, 16]);
        let input = Samples::Real(ArrayD::from_shape_fn(IxDyn(in_shape.dims()), |idx| {
            ((idx[0] + 3 * idx[1] + 7 * idx[2]) % 11) as f32
        }));
        for spec in sample_specs() {
            let stage = spec.build(in_shape.clone()).unwrap();
            let output = stage.invoke(&input).unwrap();
            assert_eq!(&output.shape(), stage.out_shape(), "stage {}", stage.name());
        }
    }

    #[test]
    fn dbscan_shape_contract_holds_on_masks() {
        let spec = StageSpec::Dbscan(DbscanConfig {
            min_pts: 1,
            epsilon: 2.0,
        });
        let stage = spec.build(Shape::from([3, 10])).unwrap();
        let mask = Samples::Mask(ArrayD::from_shape_fn(IxDyn(&[3, 10]), |idx| idx[1] % 3 == 0));
        let output = stage.invoke(&mask).unwrap();
        assert_eq!(&output.shape(), stage.out_shape());
    }

    #[test]
    fn stage_config_deserializes_from_tagged_json() {
        let json = r#"[
            {"stage": "offset-removal"},
            {"stage": "window", "window_type": "hann"},
            {"stage": "spectral", "mode": "range-doppler", "logarithmic": true},
            {"stage": "os-cfar", "n_dims": 2, "window_width": 16, "n_guard_cells": 2,
             "ordered_k": 6, "alpha": 0.2}
        ]"#;
        let specs: Vec<StageSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[1], StageSpec::Window(WindowConfig::default()));
        match &specs[2] {
            StageSpec::Spectral(config) => {
                assert_eq!(config.mode, SpectralMode::RangeDoppler);
                assert!(config.normalize);
                assert!(config.logarithmic);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn unknown_selector_fails_deserialization() {
        let json = r#"{"stage": "window", "window_type": "kaiser"}"#;
        let err = serde_json::from_str::<StageSpec>(json).unwrap_err();
        assert!(err.to_string().contains("unsupported window type"));
    }
}
