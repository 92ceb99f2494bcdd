pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use config::{LabelConfig, RegionLayout};
pub use detection::{LabelProcessor, Services, build_standard_pipeline};
pub use error::{Aborted, ErrorCategory, LabelError, ServiceError, Stage};
pub use models::{Contour, LabelReport, Rect, RotatedRect};
pub use pipeline::{DebugConfig, LabelData, Pipeline, PipelineContext, PipelineStep};
