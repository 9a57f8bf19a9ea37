//! Core signal-processing stages for pulsed-radar front-end data.
//!
//! Stages carry a shape contract fixed at construction and are composed into
//! a [`processing::Pipeline`] that validates every link before any data flows.
//! The OS-CFAR detector in [`processing::cfar`] turns range or range-Doppler
//! maps into boolean detection masks.

pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{Samples, Shape, StageError, StageResult, Transform};
pub use processing::{Pipeline, PipelineSpec, Stage, StageSpec};
