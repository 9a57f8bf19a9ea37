pub mod cube;
pub mod detection;

pub use cube::{CubeLayout, RadarCube};
pub use detection::{collect_detections, detections_from_run, DetectionRecord};
