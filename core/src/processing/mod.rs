pub mod cfar;
pub mod cluster;
pub mod identity;
pub mod offset;
pub mod pipeline;
pub mod scale;
pub(crate) mod selector;
pub mod spectral;
pub mod stage;
pub mod window;

pub use cfar::{OsCfar, OsCfarConfig, PaddingMode};
pub use cluster::{Dbscan, DbscanConfig, LaneClusters};
pub use identity::Identity;
pub use offset::OffsetRemoval;
pub use pipeline::{Link, Pipeline, PipelineSpec};
pub use scale::{Scale, ScaleConfig, ScaleMode};
pub use spectral::{OutputFormat, SpectralConfig, SpectralMode, SpectralTransform};
pub use stage::{Stage, StageSpec};
pub use window::{WindowConfig, WindowStage, WindowType};
