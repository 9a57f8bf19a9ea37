//! Ordered-statistic CFAR detection.
//!
//! Every cell under test is compared against the `ordered_k`-th largest
//! value of its local neighbourhood. The neighbourhood is `W/2` training
//! cells on each side of `G/2` guard cells, so the scan pads each axis by
//! `h = (G + W) / 2`. The range axis is padded with a constant; in 2-D the
//! Doppler axis wraps around since Doppler bins are cyclic.

use crate::math::StatsHelper;
use crate::prelude::{
    unsupported, Samples, Shape, ShapeContract, StageError, StageResult, Transform,
};
use crate::processing::selector::selector;
use crate::telemetry::LogManager;
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, ArrayView2, Axis, IxDyn, Zip};
use serde::{Deserialize, Serialize};

selector! {
    /// Fill policy for the non-cyclic range axis.
    PaddingMode, "padding mode" {
        Zero => "zero",
        /// Mean of the lane or frame being scanned.
        Mean => "mean",
    }
}

impl Default for PaddingMode {
    fn default() -> Self {
        PaddingMode::Zero
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsCfarConfig {
    /// 1 scans the last axis; 2 scans the last two axes (Doppler, range).
    pub n_dims: usize,
    /// Training cells, split evenly fore and aft.
    pub window_width: usize,
    /// Guard cells, split evenly fore and aft.
    pub n_guard_cells: usize,
    /// Rank in the descending-sorted neighbourhood; 0 is the largest.
    pub ordered_k: usize,
    /// Scale applied to the cell under test before comparison.
    pub alpha: f32,
    #[serde(default)]
    pub range_padding: PaddingMode,
}

impl OsCfarConfig {
    pub fn half_window(&self) -> usize {
        self.window_width / 2
    }

    pub fn half_guard(&self) -> usize {
        self.n_guard_cells / 2
    }

    /// Padding per side along each scanned axis.
    pub fn half_width(&self) -> usize {
        (self.n_guard_cells + self.window_width) / 2
    }

    /// Size of the neighbourhood every threshold is ranked from.
    pub fn neighbour_count(&self) -> usize {
        match self.n_dims {
            1 => self.window_width,
            _ => {
                let side = 2 * self.half_width() + 1;
                let inner = 2 * self.half_guard() + 1;
                side * side - inner * inner
            }
        }
    }

    pub fn validate(&self) -> StageResult<()> {
        if !matches!(self.n_dims, 1 | 2) {
            return Err(StageError::InvalidParameter(format!(
                "n_dims must be 1 or 2, got {}",
                self.n_dims
            )));
        }
        if self.window_width == 0 || self.window_width % 2 != 0 {
            return Err(StageError::InvalidParameter(format!(
                "window_width must be even and positive, got {}",
                self.window_width
            )));
        }
        if self.n_guard_cells % 2 != 0 {
            return Err(StageError::InvalidParameter(format!(
                "n_guard_cells must be even, got {}",
                self.n_guard_cells
            )));
        }
        if !self.alpha.is_finite() {
            return Err(StageError::InvalidParameter(format!(
                "alpha must be finite, got {}",
                self.alpha
            )));
        }
        let neighbours = self.neighbour_count();
        if self.ordered_k >= neighbours {
            return Err(StageError::InvalidParameter(format!(
                "ordered_k {} out of range for a neighbourhood of {} cells",
                self.ordered_k, neighbours
            )));
        }
        Ok(())
    }
}

/// OS-CFAR detector producing a boolean mask with the input's shape.
#[derive(Debug, Clone)]
pub struct OsCfar {
    contract: ShapeContract,
    config: OsCfarConfig,
    logger: LogManager,
}

impl OsCfar {
    pub fn new(config: OsCfarConfig, in_shape: Shape) -> StageResult<Self> {
        config.validate()?;
        if in_shape.ndim() < config.n_dims {
            return Err(StageError::InvalidParameter(format!(
                "{}-D OS-CFAR cannot scan shape {}",
                config.n_dims, in_shape
            )));
        }
        Ok(Self {
            contract: ShapeContract::preserving(in_shape),
            config,
            logger: LogManager::new("os-cfar"),
        })
    }

    pub fn config(&self) -> &OsCfarConfig {
        &self.config
    }

    fn fill_value<'a>(&self, values: impl IntoIterator<Item = &'a f32>) -> f32 {
        match self.config.range_padding {
            PaddingMode::Zero => 0.0,
            PaddingMode::Mean => StatsHelper::mean(values),
        }
    }

    fn pad_lane(&self, lane: ArrayView1<f32>) -> Array1<f32> {
        let h = self.config.half_width();
        let fill = self.fill_value(lane.iter());
        let len = lane.len();
        Array1::from_shape_fn(len + 2 * h, |idx| {
            if idx < h || idx >= len + h {
                fill
            } else {
                lane[idx - h]
            }
        })
    }

    /// Pads range with the fill value and wraps Doppler toroidally.
    fn pad_frame(&self, frame: ArrayView2<f32>) -> Array2<f32> {
        let h = self.config.half_width();
        let (doppler_bins, range_bins) = frame.dim();
        let fill = self.fill_value(frame.iter());
        Array2::from_shape_fn(
            (doppler_bins + 2 * h, range_bins + 2 * h),
            |(row, col)| {
                if col < h || col >= range_bins + h {
                    return fill;
                }
                let source = (row as isize - h as isize).rem_euclid(doppler_bins as isize);
                frame[[source as usize, col - h]]
            },
        )
    }

    fn gather_lane(&self, padded: &Array1<f32>, index: usize, out: &mut Vec<f32>) {
        let h = self.config.half_width();
        let guard = self.config.half_guard();
        let centre = index + h;
        out.clear();
        out.extend(padded.slice(ndarray::s![centre - h..centre - guard]).iter());
        out.extend(padded.slice(ndarray::s![centre + guard + 1..=centre + h]).iter());
    }

    fn gather_ring(&self, padded: &Array2<f32>, doppler: usize, range: usize, out: &mut Vec<f32>) {
        let h = self.config.half_width();
        let guard = self.config.half_guard();
        out.clear();
        for row in 0..=2 * h {
            for col in 0..=2 * h {
                if row.abs_diff(h) <= guard && col.abs_diff(h) <= guard {
                    continue;
                }
                out.push(padded[[doppler + row, range + col]]);
            }
        }
    }

    fn rank(&self, neighbours: &mut [f32]) -> StageResult<f32> {
        StatsHelper::kth_largest(neighbours, self.config.ordered_k).ok_or_else(|| {
            StageError::InvalidParameter(format!(
                "ordered_k {} out of range for {} neighbours",
                self.config.ordered_k,
                neighbours.len()
            ))
        })
    }

    /// Training cells around `index` in a 1-D lane, leading side first.
    ///
    /// Returns `None` when `index` lies outside the lane.
    pub fn neighbourhood_1d(&self, lane: ArrayView1<f32>, index: usize) -> Option<Vec<f32>> {
        if index >= lane.len() {
            return None;
        }
        let padded = self.pad_lane(lane);
        let mut out = Vec::with_capacity(self.config.neighbour_count());
        self.gather_lane(&padded, index, &mut out);
        Some(out)
    }

    /// Training ring around `(doppler, range)` in a 2-D frame, row-major.
    ///
    /// Returns `None` when the cell lies outside the frame.
    pub fn neighbourhood_2d(
        &self,
        frame: ArrayView2<f32>,
        doppler: usize,
        range: usize,
    ) -> Option<Vec<f32>> {
        let (rows, cols) = frame.dim();
        if doppler >= rows || range >= cols {
            return None;
        }
        let padded = self.pad_frame(frame);
        let mut out = Vec::with_capacity(self.config.neighbour_count());
        self.gather_ring(&padded, doppler, range, &mut out);
        Some(out)
    }

    /// Per-cell thresholds for one lane.
    pub fn lane_thresholds(&self, lane: ArrayView1<f32>) -> StageResult<Array1<f32>> {
        let padded = self.pad_lane(lane);
        let mut scratch = Vec::with_capacity(self.config.neighbour_count());
        let mut thresholds = Array1::zeros(lane.len());
        for (index, threshold) in thresholds.iter_mut().enumerate() {
            self.gather_lane(&padded, index, &mut scratch);
            *threshold = self.rank(&mut scratch)?;
        }
        Ok(thresholds)
    }

    /// Per-cell thresholds for one (Doppler, range) frame.
    pub fn frame_thresholds(&self, frame: ArrayView2<f32>) -> StageResult<Array2<f32>> {
        let mut thresholds = Array2::zeros(frame.dim());
        if frame.is_empty() {
            return Ok(thresholds);
        }
        let padded = self.pad_frame(frame);
        let mut scratch = Vec::with_capacity(self.config.neighbour_count());
        for ((doppler, range), threshold) in thresholds.indexed_iter_mut() {
            self.gather_ring(&padded, doppler, range, &mut scratch);
            *threshold = self.rank(&mut scratch)?;
        }
        Ok(thresholds)
    }

    fn detect_1d(&self, data: &ArrayD<f32>) -> StageResult<ArrayD<bool>> {
        let alpha = self.config.alpha;
        let axis = Axis(data.ndim() - 1);
        let mut mask = ArrayD::from_elem(data.raw_dim(), false);
        for (mut flags, lane) in mask.lanes_mut(axis).into_iter().zip(data.lanes(axis)) {
            let thresholds = self.lane_thresholds(lane)?;
            Zip::from(&mut flags)
                .and(&lane)
                .and(&thresholds)
                .for_each(|flag, &value, &threshold| *flag = value * alpha > threshold);
        }
        Ok(mask)
    }

    fn detect_2d(&self, data: &ArrayD<f32>) -> StageResult<ArrayD<bool>> {
        let alpha = self.config.alpha;
        let shape = data.shape().to_vec();
        let ndim = shape.len();
        let (doppler_bins, range_bins) = (shape[ndim - 2], shape[ndim - 1]);
        let frames: usize = shape[..ndim - 2].iter().product();

        let standard = data.as_standard_layout();
        let cube = standard
            .view()
            .into_shape((frames, doppler_bins, range_bins))?;
        let mut mask = Array3::from_elem((frames, doppler_bins, range_bins), false);
        for (frame, mut flags) in cube.outer_iter().zip(mask.outer_iter_mut()) {
            let thresholds = self.frame_thresholds(frame)?;
            Zip::from(&mut flags)
                .and(&frame)
                .and(&thresholds)
                .for_each(|flag, &value, &threshold| *flag = value * alpha > threshold);
        }
        Ok(mask.into_shape(IxDyn(&shape))?)
    }
}

impl Transform for OsCfar {
    fn name(&self) -> &'static str {
        "os-cfar"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        let data = match input {
            Samples::Real(data) => data,
            other => return Err(unsupported(self.name(), "real", other)),
        };
        let mask = match self.config.n_dims {
            1 => self.detect_1d(data)?,
            _ => self.detect_2d(data)?,
        };
        let hits = mask.iter().filter(|&&flag| flag).count();
        self.logger.detail(&format!(
            "{}-D scan over {} flagged {} cells",
            self.config.n_dims,
            self.in_shape(),
            hits
        ));
        Ok(Samples::Mask(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn config_1d(
        window_width: usize,
        n_guard_cells: usize,
        ordered_k: usize,
        alpha: f32,
    ) -> OsCfarConfig {
        OsCfarConfig {
            n_dims: 1,
            window_width,
            n_guard_cells,
            ordered_k,
            alpha,
            range_padding: PaddingMode::Zero,
        }
    }

    #[test]
    fn isolated_target_is_the_only_detection() {
        let mut data = Array::from_elem(IxDyn(&[100]), 1.0f32);
        data[[50]] = 100.0;
        let stage = OsCfar::new(config_1d(16, 2, 3, 0.5), Shape::from([100])).unwrap();

        let output = stage.invoke(&Samples::Real(data)).unwrap();
        let mask = output.as_mask().unwrap();
        for (index, &flag) in mask.iter().enumerate() {
            assert_eq!(flag, index == 50, "unexpected flag at {index}");
        }
    }

    #[test]
    fn constant_background_sets_threshold_to_its_level() {
        let level = 2.5f32;
        let lane = Array1::from_elem(64, level);
        let stage = OsCfar::new(config_1d(16, 2, 3, 0.9), Shape::from([64])).unwrap();

        let thresholds = stage.lane_thresholds(lane.view()).unwrap();
        let h = stage.config().half_width();
        for index in h..64 - h {
            assert_eq!(thresholds[index], level);
        }

        let data = Samples::Real(Array::from_elem(IxDyn(&[64]), level));
        let output = stage.invoke(&data).unwrap();
        assert!(output.as_mask().unwrap().iter().all(|&flag| !flag));
    }

    #[test]
    fn neighbourhood_skips_guard_cells_and_cell_under_test() {
        let lane = Array1::from_shape_fn(20, |i| i as f32);
        let stage = OsCfar::new(config_1d(4, 2, 0, 1.0), Shape::from([20])).unwrap();
        let set = stage.neighbourhood_1d(lane.view(), 10).unwrap();
        assert_eq!(set, vec![7.0, 8.0, 12.0, 13.0]);

        // Leading edge falls into zero padding.
        let set = stage.neighbourhood_1d(lane.view(), 0).unwrap();
        assert_eq!(set, vec![0.0, 0.0, 2.0, 3.0]);
    }

    #[test]
    fn neighbourhood_outside_the_data_is_none() {
        let lane = Array1::from_elem(8, 1.0f32);
        let stage = OsCfar::new(config_1d(4, 2, 0, 1.0), Shape::from([8])).unwrap();
        assert!(stage.neighbourhood_1d(lane.view(), 7).is_some());
        assert!(stage.neighbourhood_1d(lane.view(), 8).is_none());

        let config = OsCfarConfig {
            n_dims: 2,
            ..config_1d(4, 2, 0, 1.0)
        };
        let stage = OsCfar::new(config, Shape::from([4, 4])).unwrap();
        let frame = Array2::from_elem((4, 4), 1.0f32);
        assert!(stage.neighbourhood_2d(frame.view(), 4, 0).is_none());
        assert!(stage.neighbourhood_2d(frame.view(), 0, 4).is_none());
        let empty = Array2::<f32>::zeros((0, 4));
        assert!(stage.neighbourhood_2d(empty.view(), 0, 0).is_none());
    }

    #[test]
    fn mean_padding_fills_with_lane_mean() {
        let mut config = config_1d(4, 2, 0, 1.0);
        config.range_padding = PaddingMode::Mean;
        let lane = Array1::from_vec(vec![2.0, 4.0, 6.0, 8.0]);
        let stage = OsCfar::new(config, Shape::from([4])).unwrap();
        let set = stage.neighbourhood_1d(lane.view(), 0).unwrap();
        assert_eq!(set, vec![5.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn doppler_axis_wraps_around() {
        let config = OsCfarConfig {
            n_dims: 2,
            window_width: 4,
            n_guard_cells: 2,
            ordered_k: 0,
            alpha: 1.0,
            range_padding: PaddingMode::Zero,
        };
        let stage = OsCfar::new(config, Shape::from([16, 16])).unwrap();
        let mut frame = Array2::from_elem((16, 16), 1.0f32);
        // Two rows before the top edge, wrapped from the bottom.
        frame[[14, 5]] = 77.0;

        let set = stage.neighbourhood_2d(frame.view(), 0, 5).unwrap();
        assert_eq!(set.len(), stage.config().neighbour_count());
        assert!(set.contains(&77.0));

        // A linear padding would never see the marker from row 0.
        let thresholds = stage.frame_thresholds(frame.view()).unwrap();
        assert_eq!(thresholds[[0, 5]], 77.0);
        assert_eq!(thresholds[[8, 5]], 1.0);
    }

    #[test]
    fn two_dimensional_ring_excludes_guard_square() {
        let config = OsCfarConfig {
            n_dims: 2,
            window_width: 2,
            n_guard_cells: 2,
            ordered_k: 0,
            alpha: 1.0,
            range_padding: PaddingMode::Zero,
        };
        let stage = OsCfar::new(config, Shape::from([9, 9])).unwrap();
        let mut frame = Array2::from_elem((9, 9), 1.0f32);
        frame[[4, 4]] = 50.0;
        frame[[3, 5]] = 40.0;

        let set = stage.neighbourhood_2d(frame.view(), 4, 4).unwrap();
        // 5x5 block minus the 3x3 guard square.
        assert_eq!(set.len(), 16);
        assert!(set.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn two_dimensional_scan_flags_target_over_frames() {
        let config = OsCfarConfig {
            n_dims: 2,
            window_width: 4,
            n_guard_cells: 2,
            ordered_k: 4,
            alpha: 0.5,
            range_padding: PaddingMode::Zero,
        };
        let stage = OsCfar::new(config, Shape::from([2, 16, 16])).unwrap();
        let mut data = Array::from_elem(IxDyn(&[2, 16, 16]), 1.0f32);
        data[[1, 7, 9]] = 30.0;

        let output = stage.invoke(&Samples::Real(data)).unwrap();
        let mask = output.as_mask().unwrap();
        assert_eq!(mask.iter().filter(|&&flag| flag).count(), 1);
        assert!(mask[[1, 7, 9]]);
    }

    #[test]
    fn ordered_k_outside_neighbourhood_is_rejected() {
        let err = OsCfar::new(config_1d(16, 2, 16, 0.5), Shape::from([64])).unwrap_err();
        assert!(matches!(err, StageError::InvalidParameter(_)));
    }

    #[test]
    fn odd_window_or_guard_is_rejected() {
        assert!(OsCfar::new(config_1d(15, 2, 3, 0.5), Shape::from([64])).is_err());
        assert!(OsCfar::new(config_1d(16, 3, 3, 0.5), Shape::from([64])).is_err());
    }

    #[test]
    fn two_dimensional_scan_needs_two_axes() {
        let mut config = config_1d(4, 2, 0, 1.0);
        config.n_dims = 2;
        assert!(OsCfar::new(config.clone(), Shape::from([32])).is_err());
        config.n_dims = 3;
        assert!(OsCfar::new(config, Shape::from([4, 4, 4])).is_err());
    }

    #[test]
    fn complex_input_is_rejected() {
        let stage = OsCfar::new(config_1d(4, 2, 0, 1.0), Shape::from([8])).unwrap();
        let input = Samples::Complex(Array::from_elem(
            IxDyn(&[8]),
            num_complex::Complex32::new(1.0, 0.0),
        ));
        assert!(matches!(
            stage.invoke(&input),
            Err(StageError::UnsupportedSamples { .. })
        ));
    }
}
