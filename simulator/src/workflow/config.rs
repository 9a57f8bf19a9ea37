use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use radarcore::processing::{
    OsCfarConfig, PaddingMode, SpectralConfig, SpectralMode, WindowConfig,
};
use radarcore::{PipelineSpec, StageSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default = "default_stages")]
    pub stages: Vec<StageSpec>,
}

/// Offset removal, range window, range-Doppler map, 2-D OS-CFAR.
pub fn default_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::OffsetRemoval,
        StageSpec::Window(WindowConfig::default()),
        StageSpec::Spectral(SpectralConfig::new(SpectralMode::RangeDoppler)),
        StageSpec::OsCfar(OsCfarConfig {
            n_dims: 2,
            window_width: 8,
            n_guard_cells: 4,
            ordered_k: 14,
            alpha: 0.2,
            range_padding: PaddingMode::Zero,
        }),
    ]
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(frames: usize, ramps: usize, samples: usize, seed: u64) -> Self {
        Self {
            generator: GeneratorConfig {
                frames,
                ramps,
                samples,
                seed,
                ..Default::default()
            },
            stages: default_stages(),
        }
    }

    pub fn to_pipeline_spec(&self) -> PipelineSpec {
        PipelineSpec {
            input_shape: self.generator.layout().shape(),
            stages: self.stages.clone(),
        }
    }
}
