//! Ordered, shape-checked composition of stages.
//!
//! Adjacent stages must agree on shape: every append is checked against the
//! current tail so a chain that cannot run is rejected before any data is
//! touched. A run feeds each stage's output to the next and keeps every
//! intermediate result.

use crate::prelude::{Samples, Shape, StageError, StageResult, Transform};
use crate::processing::stage::{Stage, StageSpec};
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};

/// Element of a chain handed to [`Pipeline::add_chain`].
#[derive(Debug, Clone)]
pub enum Link {
    Stage(Stage),
    Pipeline(Pipeline),
}

impl From<Stage> for Link {
    fn from(stage: Stage) -> Self {
        Link::Stage(stage)
    }
}

impl From<Pipeline> for Link {
    fn from(pipeline: Pipeline) -> Self {
        Link::Pipeline(pipeline)
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    input_shape: Option<Shape>,
    stages: Vec<Stage>,
    logger: LogManager,
}

impl Pipeline {
    /// Empty pipeline; the first stage appended fixes the input shape.
    pub fn new() -> Self {
        Self {
            input_shape: None,
            stages: Vec::new(),
            logger: LogManager::new("pipeline"),
        }
    }

    /// Empty pipeline whose first stage must accept `shape`.
    pub fn with_input_shape(shape: Shape) -> Self {
        Self {
            input_shape: Some(shape),
            ..Self::new()
        }
    }

    /// Builds a pipeline from a chain, flattening nested pipelines in place.
    pub fn from_chain<I, L>(chain: I) -> StageResult<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        let mut pipeline = Self::new();
        pipeline.add_chain(chain)?;
        Ok(pipeline)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Shape the next appended stage must accept, if already fixed.
    pub fn tail_shape(&self) -> Option<&Shape> {
        self.stages
            .last()
            .map(|stage| stage.out_shape())
            .or(self.input_shape.as_ref())
    }

    /// Shape `run` accepts, if already fixed.
    pub fn input_shape(&self) -> Option<&Shape> {
        self.stages
            .first()
            .map(|stage| stage.in_shape())
            .or(self.input_shape.as_ref())
    }

    /// Shape of the final output, if any stage is present.
    pub fn output_shape(&self) -> Option<&Shape> {
        self.stages.last().map(|stage| stage.out_shape())
    }

    pub fn add(&mut self, stage: impl Into<Stage>) -> StageResult<()> {
        let stage = stage.into();
        if let Some(expected) = self.tail_shape() {
            if stage.in_shape() != expected {
                return Err(StageError::IncompatibleShape {
                    stage: stage.name().to_string(),
                    expected: expected.clone(),
                    found: stage.in_shape().clone(),
                });
            }
        }
        self.logger.detail(&format!(
            "appended {} {} -> {}",
            stage.name(),
            stage.in_shape(),
            stage.out_shape()
        ));
        self.stages.push(stage);
        Ok(())
    }

    pub fn add_chain<I, L>(&mut self, chain: I) -> StageResult<()>
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        for link in chain {
            match link.into() {
                Link::Stage(stage) => self.add(stage)?,
                Link::Pipeline(nested) => {
                    for stage in nested.stages {
                        self.add(stage)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs every stage in order, returning one output per stage.
    pub fn run(&self, input: &Samples) -> StageResult<Vec<Samples>> {
        if let Some(expected) = self.input_shape() {
            let found = input.shape();
            if &found != expected {
                return Err(StageError::ShapeMismatch {
                    stage: "pipeline".to_string(),
                    expected: expected.clone(),
                    found,
                });
            }
        }

        let mut outputs: Vec<Samples> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let current = outputs.last().unwrap_or(input);
            let output = stage.invoke(current)?;
            outputs.push(output);
        }
        self.logger.record(&format!(
            "ran {} stages on {}",
            self.stages.len(),
            input.shape()
        ));
        Ok(outputs)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable description of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub input_shape: Shape,
    pub stages: Vec<StageSpec>,
}

impl PipelineSpec {
    pub fn from_json(text: &str) -> StageResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| StageError::InvalidParameter(format!("pipeline description: {}", err)))
    }

    /// Builds each stage from the previous one's output shape and appends it.
    pub fn build(&self) -> StageResult<Pipeline> {
        let mut pipeline = Pipeline::with_input_shape(self.input_shape.clone());
        for spec in &self.stages {
            let in_shape = pipeline
                .tail_shape()
                .cloned()
                .unwrap_or_else(|| self.input_shape.clone());
            pipeline.add(spec.build(in_shape)?)?;
        }
        Ok(pipeline)
    }
}
