use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use radarcore::interface::{detections_from_run, DetectionRecord, RadarCube};
use radarcore::telemetry::{Metrics, MetricsRecorder};
use radarcore::{Pipeline, Shape};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct WorkflowResult {
    /// Output shape of every stage, in order.
    pub stage_shapes: Vec<Shape>,
    pub detections: Vec<DetectionRecord>,
    pub metrics: Metrics,
}

pub struct Runner {
    pipeline: Pipeline,
    metrics: MetricsRecorder,
}

impl Runner {
    /// Builds and validates the pipeline before any cube is processed.
    pub fn new(config: &WorkflowConfig) -> anyhow::Result<Self> {
        let pipeline = config
            .to_pipeline_spec()
            .build()
            .context("building processing pipeline")?;
        Ok(Self {
            pipeline,
            metrics: MetricsRecorder::new(),
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn execute(&self, cube: RadarCube) -> anyhow::Result<WorkflowResult> {
        let samples = cube.into_samples().context("shaping radar cube")?;
        let outputs = match self.pipeline.run(&samples) {
            Ok(outputs) => outputs,
            Err(err) => {
                self.metrics.record_error();
                return Err(err).context("running processing pipeline");
            }
        };

        let detections = if outputs.iter().any(|output| output.as_mask().is_some()) {
            match detections_from_run(&samples, &outputs) {
                Ok(detections) => detections,
                Err(err) => {
                    self.metrics.record_error();
                    return Err(err).context("extracting detections");
                }
            }
        } else {
            Vec::new()
        };
        self.metrics.record_run();
        self.metrics.record_detections(detections.len());
        info!(
            "pipeline of {} stages produced {} detections",
            self.pipeline.len(),
            detections.len()
        );

        Ok(WorkflowResult {
            stage_shapes: outputs.iter().map(|output| output.shape()).collect(),
            detections,
            metrics: self.metrics.snapshot(),
        })
    }
}
