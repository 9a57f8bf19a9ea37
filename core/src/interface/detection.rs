use crate::prelude::{Samples, StageError, StageResult};
use ndarray::{ArrayD, Dimension};
use serde::{Deserialize, Serialize};

/// Single flagged cell of a detection mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Full index into the mask.
    pub index: Vec<usize>,
    /// Second-to-last index, when the mask has one.
    pub doppler_bin: Option<usize>,
    pub range_bin: usize,
    pub value: f32,
}

impl DetectionRecord {
    pub fn new(index: Vec<usize>, value: f32) -> Self {
        let ndim = index.len();
        let range_bin = index.last().copied().unwrap_or(0);
        let doppler_bin = ndim.checked_sub(2).map(|axis| index[axis]);
        Self {
            index,
            doppler_bin,
            range_bin,
            value,
        }
    }
}

/// Lists the flagged cells of `mask` alongside the values that were tested.
pub fn collect_detections(
    mask: &ArrayD<bool>,
    values: &ArrayD<f32>,
) -> StageResult<Vec<DetectionRecord>> {
    if mask.shape() != values.shape() {
        return Err(StageError::ShapeMismatch {
            stage: "detections".to_string(),
            expected: mask.shape().into(),
            found: values.shape().into(),
        });
    }
    let records = mask
        .indexed_iter()
        .zip(values.iter())
        .filter(|((_, flag), _)| **flag)
        .map(|((index, _), &value)| DetectionRecord::new(index.slice().to_vec(), value))
        .collect();
    Ok(records)
}

/// Pairs the last mask of a pipeline run with the real-valued data that
/// preceded it, falling back to the run input when the detector came first.
pub fn detections_from_run(
    input: &Samples,
    outputs: &[Samples],
) -> StageResult<Vec<DetectionRecord>> {
    let position = outputs
        .iter()
        .rposition(|output| output.as_mask().is_some())
        .ok_or_else(|| StageError::Internal("run produced no detection mask".into()))?;
    let values = outputs[..position]
        .iter()
        .rev()
        .chain(std::iter::once(input))
        .find_map(Samples::as_real)
        .ok_or_else(|| StageError::Internal("no real-valued input precedes the mask".into()))?;
    match &outputs[position] {
        Samples::Mask(mask) => collect_detections(mask, values),
        _ => Err(StageError::Internal("mask position changed".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn records_carry_doppler_and_range_bins() {
        let mask = arr2(&[[false, true], [false, false], [true, false]]).into_dyn();
        let values = arr2(&[[1.0f32, 9.0], [1.0, 1.0], [7.0, 1.0]]).into_dyn();
        let records = collect_detections(&mask, &values).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, vec![0, 1]);
        assert_eq!(records[0].doppler_bin, Some(0));
        assert_eq!(records[0].range_bin, 1);
        assert_eq!(records[0].value, 9.0);
        assert_eq!(records[1].doppler_bin, Some(2));
        assert_eq!(records[1].value, 7.0);
    }

    #[test]
    fn run_without_mask_is_an_error() {
        let input = Samples::Real(arr2(&[[1.0f32]]).into_dyn());
        let outputs = vec![input.clone()];
        assert!(detections_from_run(&input, &outputs).is_err());
    }

    #[test]
    fn run_detections_use_preceding_values() {
        let values = arr2(&[[2.0f32, 5.0]]).into_dyn();
        let mask = arr2(&[[false, true]]).into_dyn();
        let input = Samples::Real(arr2(&[[0.0f32, 0.0]]).into_dyn());
        let outputs = vec![Samples::Real(values), Samples::Mask(mask)];
        let records = detections_from_run(&input, &outputs).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 5.0);
        assert_eq!(records[0].doppler_bin, Some(0));
    }

    #[test]
    fn detector_first_pairs_mask_with_run_input() {
        let input = Samples::Real(arr2(&[[3.0f32, 8.0, 1.0]]).into_dyn());
        let mask = arr2(&[[false, true, false]]).into_dyn();
        let records = detections_from_run(&input, &[Samples::Mask(mask)]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].range_bin, 1);
        assert_eq!(records[0].value, 8.0);
    }

    #[test]
    fn complex_input_without_real_output_is_an_error() {
        let input = Samples::Complex(ndarray::ArrayD::zeros(ndarray::IxDyn(&[1, 2])));
        let mask = arr2(&[[false, true]]).into_dyn();
        assert!(detections_from_run(&input, &[Samples::Mask(mask)]).is_err());
    }
}
