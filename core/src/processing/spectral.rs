//! Range and Doppler spectral transforms.
//!
//! Range processing runs along the last axis and keeps only the positive
//! half of the spectrum; Doppler processing runs along the second-to-last
//! axis and re-centres the zero-frequency bin.

use crate::math::{fft_shift_along, FftHelper};
use crate::prelude::{
    unsupported, Samples, Shape, ShapeContract, StageError, StageResult, Transform,
};
use crate::processing::selector::selector;
use crate::telemetry::LogManager;
use ndarray::{stack, ArrayD, Axis, IxDyn, Slice};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// Lower bound applied to magnitudes before taking the logarithm.
const LOG_FLOOR: f32 = 1e-12;

selector! {
    SpectralMode, "transform type" {
        Range => "range",
        Doppler => "doppler",
        RangeDoppler => "range-doppler",
    }
}

selector! {
    OutputFormat, "output format" {
        Modulus => "modulus",
        Complex => "complex",
        ModulusPhase => "modulus-phase",
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Modulus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    pub mode: SpectralMode,
    #[serde(default)]
    pub out_format: OutputFormat,
    /// Divide by twice the transform length.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    /// Rescale a modulus output to [0, 1].
    #[serde(default)]
    pub unitary: bool,
    /// 20·ln output with the per-frame floor subtracted.
    #[serde(default)]
    pub logarithmic: bool,
    /// Leading range bins to discard.
    #[serde(default)]
    pub off_bins: usize,
}

fn default_normalize() -> bool {
    true
}

impl SpectralConfig {
    pub fn new(mode: SpectralMode) -> Self {
        Self {
            mode,
            out_format: OutputFormat::Modulus,
            normalize: true,
            unitary: false,
            logarithmic: false,
            off_bins: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectralTransform {
    contract: ShapeContract,
    config: SpectralConfig,
    range_fft: Option<FftHelper>,
    doppler_fft: Option<FftHelper>,
    range_bins: usize,
    logger: LogManager,
}

impl SpectralTransform {
    pub fn new(config: SpectralConfig, in_shape: Shape) -> StageResult<Self> {
        if config.logarithmic && config.out_format != OutputFormat::Modulus {
            return Err(StageError::InvalidParameter(format!(
                "logarithmic output requires modulus format, got {}",
                config.out_format
            )));
        }

        let has_range = matches!(
            config.mode,
            SpectralMode::Range | SpectralMode::RangeDoppler
        );
        let has_doppler = matches!(
            config.mode,
            SpectralMode::Doppler | SpectralMode::RangeDoppler
        );

        let mut out_shape = in_shape.clone();
        let mut range_fft = None;
        let mut range_bins = 0;
        if has_range {
            let samples = in_shape.dim_from_end(1).ok_or_else(|| {
                StageError::InvalidParameter("range transform needs at least one axis".into())
            })?;
            range_bins = (samples / 2)
                .checked_sub(config.off_bins)
                .filter(|&bins| bins > 0)
                .ok_or_else(|| {
                    StageError::InvalidParameter(format!(
                        "off_bins {} leaves no positive range bins out of {} samples",
                        config.off_bins, samples
                    ))
                })?;
            range_fft = Some(FftHelper::new(samples));
            out_shape = out_shape.with_last(range_bins);
        }

        let mut doppler_fft = None;
        if has_doppler {
            let ramps = in_shape.dim_from_end(2).ok_or_else(|| {
                StageError::InvalidParameter(format!(
                    "doppler transform needs at least two axes, shape is {}",
                    in_shape
                ))
            })?;
            doppler_fft = Some(FftHelper::new(ramps));
        }

        if config.out_format == OutputFormat::ModulusPhase {
            out_shape = out_shape.push(2);
        }

        Ok(Self {
            contract: ShapeContract::new(in_shape, out_shape),
            config,
            range_fft,
            doppler_fft,
            range_bins,
            logger: LogManager::new("spectral"),
        })
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    fn range_transform(&self, fft: &FftHelper, mut data: ArrayD<Complex32>) -> ArrayD<Complex32> {
        let axis = Axis(data.ndim() - 1);
        fft.forward_along(&mut data, axis);
        if self.config.normalize {
            let scale = 2.0 * fft.size() as f32;
            data.mapv_inplace(|v| v / scale);
        }
        let start = self.config.off_bins;
        data.slice_axis(axis, Slice::from(start..start + self.range_bins))
            .to_owned()
    }

    fn doppler_transform(
        &self,
        fft: &FftHelper,
        mut data: ArrayD<Complex32>,
    ) -> ArrayD<Complex32> {
        let axis = Axis(data.ndim() - 2);
        fft.forward_along(&mut data, axis);
        fft_shift_along(&mut data, axis);
        if self.config.normalize {
            let scale = 2.0 * fft.size() as f32;
            data.mapv_inplace(|v| v / scale);
        }
        data
    }

    fn format(&self, spectrum: ArrayD<Complex32>) -> StageResult<Samples> {
        match self.config.out_format {
            OutputFormat::Complex => Ok(Samples::Complex(spectrum)),
            OutputFormat::ModulusPhase => {
                let modulus = spectrum.mapv(|v| v.norm());
                let phase = spectrum.mapv(|v| v.arg());
                let stacked = stack(Axis(spectrum.ndim()), &[modulus.view(), phase.view()])?;
                Ok(Samples::Real(stacked))
            }
            OutputFormat::Modulus => {
                let mut modulus = spectrum.mapv(|v| v.norm());
                if self.config.unitary {
                    rescale_unit(&mut modulus);
                }
                if self.config.logarithmic {
                    modulus = log_per_frame(modulus)?;
                }
                Ok(Samples::Real(modulus))
            }
        }
    }
}

/// Maps values onto [0, 1]; a flat array becomes all zeros.
fn rescale_unit(data: &mut ArrayD<f32>) {
    let min = data.iter().copied().fold(f32::INFINITY, f32::min);
    if !min.is_finite() {
        return;
    }
    data.mapv_inplace(|v| v - min);
    let max = data.iter().copied().fold(0.0, f32::max);
    if max > 0.0 {
        data.mapv_inplace(|v| v / max);
    }
}

/// 20·ln magnitude with each frame's minimum subtracted so values stay
/// non-negative. A frame spans the last two axes.
fn log_per_frame(data: ArrayD<f32>) -> StageResult<ArrayD<f32>> {
    let shape = data.shape().to_vec();
    let frame_axes = shape.len().min(2);
    let frame_len: usize = shape[shape.len() - frame_axes..].iter().product();
    let frames: usize = shape[..shape.len() - frame_axes].iter().product();

    let logged = data.mapv(|v| 20.0 * v.max(LOG_FLOOR).ln());
    let mut flat = logged
        .as_standard_layout()
        .into_owned()
        .into_shape((frames, frame_len))?;
    for mut frame in flat.outer_iter_mut() {
        let floor = frame.iter().copied().fold(f32::INFINITY, f32::min);
        if floor.is_finite() {
            frame.mapv_inplace(|v| v - floor);
        }
    }
    Ok(flat.into_shape(IxDyn(&shape))?)
}

impl Transform for SpectralTransform {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        let mut spectrum = match input {
            Samples::Real(data) => data.mapv(|v| Complex32::new(v, 0.0)),
            Samples::Complex(data) => data.clone(),
            other => return Err(unsupported(self.name(), "real or complex", other)),
        };

        if let Some(fft) = &self.range_fft {
            spectrum = self.range_transform(fft, spectrum);
        }
        if let Some(fft) = &self.doppler_fft {
            spectrum = self.doppler_transform(fft, spectrum);
        }

        self.logger.detail(&format!(
            "{} transform {} -> {}",
            self.config.mode,
            self.in_shape(),
            self.out_shape()
        ));
        self.format(spectrum)
    }
}
