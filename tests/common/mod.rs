#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from labelcheck for tests
pub use labelcheck::{
    Aborted, ErrorCategory, LabelConfig, LabelError, LabelProcessor, LabelReport, Pipeline, Rect,
    RotatedRect, ServiceError, Services, Stage,
};
