use crate::generator::template::beat_tone;
use anyhow::Context;
use radarcore::interface::{CubeLayout, RadarCube};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Point reflector placed in the synthetic scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Beat frequency in range bins per ramp.
    pub range_bin: f32,
    /// Phase progression in Doppler bins per frame; negative is receding.
    #[serde(default)]
    pub doppler_bin: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
}

fn default_amplitude() -> f32 {
    1.0
}

/// Configuration for generating synthetic radar cubes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub frames: usize,
    pub ramps: usize,
    pub samples: usize,
    pub dc_offset: f32,
    pub noise: f32,
    pub seed: u64,
    pub targets: Vec<TargetConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frames: 1,
            ramps: 64,
            samples: 256,
            dc_offset: 0.4,
            noise: 0.02,
            seed: 0,
            targets: vec![
                TargetConfig {
                    range_bin: 24.0,
                    doppler_bin: 5.0,
                    amplitude: 1.0,
                },
                TargetConfig {
                    range_bin: 70.0,
                    doppler_bin: -12.0,
                    amplitude: 0.6,
                },
            ],
        }
    }
}

impl GeneratorConfig {
    /// Single transmit and receive channel, as the processing chain expects.
    pub fn layout(&self) -> CubeLayout {
        CubeLayout {
            frames: self.frames.max(1),
            tx_antennas: 1,
            rx_antennas: 1,
            ramps: self.ramps.max(1),
            samples: self.samples.max(1),
        }
    }
}

fn build_sample_vector(config: &GeneratorConfig, layout: &CubeLayout) -> anyhow::Result<Vec<f32>> {
    let per_frame = layout
        .ramps
        .checked_mul(layout.samples)
        .context("overflow computing samples per frame")?;
    let sample_count = per_frame
        .checked_mul(layout.frames)
        .context("overflow computing sample count for generator")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut samples = Vec::with_capacity(sample_count);

    for frame in 0..layout.frames {
        for ramp in 0..layout.ramps {
            // Targets keep moving from one frame to the next.
            let slow_index = frame * layout.ramps + ramp;
            for sample in 0..layout.samples {
                let echo: f32 = config
                    .targets
                    .iter()
                    .map(|target| {
                        target.amplitude
                            * beat_tone(
                                sample,
                                slow_index,
                                layout.samples,
                                layout.ramps,
                                target.range_bin,
                                target.doppler_bin,
                            )
                    })
                    .sum();
                let jitter = if config.noise > 0.0 {
                    rng.gen_range(-config.noise..config.noise)
                } else {
                    0.0
                };
                samples.push(config.dc_offset + echo + jitter);
            }
        }
    }

    Ok(samples)
}

pub fn build_radar_cube(config: &GeneratorConfig) -> anyhow::Result<RadarCube> {
    let layout = config.layout();
    let samples = build_sample_vector(config, &layout)?;
    RadarCube::new(layout, samples).context("assembling radar cube")
}
