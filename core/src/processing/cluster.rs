use crate::prelude::{
    unsupported, Samples, Shape, ShapeContract, StageError, StageResult, Transform,
};
use crate::telemetry::LogManager;
use ndarray::{ArrayD, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Label of a cell without a detection.
pub const UNDETECTED: i32 = -1;
/// Label of a detection that belongs to no cluster.
pub const NOISE: i32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbscanConfig {
    /// Neighbours (excluding the point itself) a core point needs.
    pub min_pts: usize,
    /// Index distance below which two detections are neighbours.
    pub epsilon: f32,
}

/// Labels of one lane together with the number of clusters found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneClusters {
    pub labels: Vec<i32>,
    pub clusters: usize,
}

/// Density clustering of detections along the last axis of a mask.
#[derive(Debug, Clone)]
pub struct Dbscan {
    contract: ShapeContract,
    config: DbscanConfig,
    logger: LogManager,
}

impl Dbscan {
    pub fn new(config: DbscanConfig, in_shape: Shape) -> StageResult<Self> {
        if config.min_pts == 0 {
            return Err(StageError::InvalidParameter("min_pts must be at least 1".into()));
        }
        if !(config.epsilon > 0.0) || !config.epsilon.is_finite() {
            return Err(StageError::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                config.epsilon
            )));
        }
        if in_shape.ndim() == 0 {
            return Err(StageError::InvalidParameter(
                "clustering needs at least one axis".into(),
            ));
        }
        Ok(Self {
            contract: ShapeContract::preserving(in_shape),
            config,
            logger: LogManager::new("dbscan"),
        })
    }

    /// Clusters one lane of detection flags.
    pub fn cluster_lane(&self, flags: ArrayView1<bool>) -> LaneClusters {
        let points: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter_map(|(idx, &flag)| flag.then_some(idx))
            .collect();
        let near = |a: usize, b: usize| (a.abs_diff(b) as f32) < self.config.epsilon;

        // Points are sorted, so each neighbourhood is a contiguous run.
        let mut counts = vec![0usize; points.len()];
        let (mut lo, mut hi) = (0, 0);
        for (i, &p) in points.iter().enumerate() {
            while !near(points[lo], p) {
                lo += 1;
            }
            while hi + 1 < points.len() && near(points[hi + 1], p) {
                hi += 1;
            }
            counts[i] = hi - lo;
        }
        let core: Vec<bool> = counts.iter().map(|&c| c >= self.config.min_pts).collect();

        let mut labels = vec![UNDETECTED; flags.len()];
        let mut cluster_of = vec![NOISE; points.len()];
        let mut clusters = 0usize;
        let mut previous_core: Option<usize> = None;
        for i in (0..points.len()).filter(|&i| core[i]) {
            cluster_of[i] = match previous_core {
                Some(j) if near(points[j], points[i]) => cluster_of[j],
                _ => {
                    clusters += 1;
                    clusters as i32
                }
            };
            previous_core = Some(i);
        }

        // Border points join the closest reachable core, preferring the leading side.
        let mut last_core: Option<usize> = None;
        let mut next_core = vec![None; points.len()];
        let mut upcoming: Option<usize> = None;
        for i in (0..points.len()).rev() {
            next_core[i] = upcoming;
            if core[i] {
                upcoming = Some(i);
            }
        }
        for i in 0..points.len() {
            if core[i] {
                last_core = Some(i);
                continue;
            }
            let reach = [last_core, next_core[i]]
                .into_iter()
                .flatten()
                .find(|&j| near(points[j], points[i]));
            if let Some(j) = reach {
                cluster_of[i] = cluster_of[j];
            }
        }

        for (&p, &label) in points.iter().zip(&cluster_of) {
            labels[p] = label;
        }
        LaneClusters { labels, clusters }
    }
}

impl Transform for Dbscan {
    fn name(&self) -> &'static str {
        "dbscan"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        let mask = match input {
            Samples::Mask(mask) => mask,
            other => return Err(unsupported(self.name(), "mask", other)),
        };
        let axis = Axis(mask.ndim() - 1);
        let mut labels = ArrayD::from_elem(mask.raw_dim(), UNDETECTED);
        let mut total = 0usize;
        for (mut out, flags) in labels.lanes_mut(axis).into_iter().zip(mask.lanes(axis)) {
            let lane = self.cluster_lane(flags);
            for (slot, label) in out.iter_mut().zip(lane.labels) {
                *slot = label;
            }
            total += lane.clusters;
        }
        self.logger
            .detail(&format!("{} clusters over {}", total, self.in_shape()));
        Ok(Samples::Labels(labels))
    }
}
