//! Error types for the label pipeline.
//!
//! `LabelError` covers everything a single stage can report, `ServiceError`
//! covers the OCR and barcode collaborators, and `Aborted` tags a `LabelError`
//! with the stage that produced it.

use thiserror::Error;

use crate::core::resources::ResourceKind;
use crate::models::Rect;

/// Stages of a label run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Working-set acquisition.
    Setup,
    /// Image decode.
    Load,
    Localize,
    ExtractGreenChannel,
    Align,
    ValidateName,
    ReadBarcode,
    ReadPrice,
    ValidateProduct,
    ValidatePrice,
    /// Assembling the final report.
    Report,
}

impl Stage {
    /// Short identifier, also used for debug-output directory names.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Load => "load",
            Stage::Localize => "localize",
            Stage::ExtractGreenChannel => "extract_green_channel",
            Stage::Align => "align",
            Stage::ValidateName => "validate_name",
            Stage::ReadBarcode => "read_barcode",
            Stage::ReadPrice => "read_price",
            Stage::ValidateProduct => "validate_product",
            Stage::ValidatePrice => "validate_price",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse classification of a `LabelError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A buffer or handle could not be acquired.
    Allocation,
    /// A stage could not produce its artifact.
    Stage,
    /// Decoded data is inconsistent.
    Validation,
}

/// Failures reported by the OCR and barcode services.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no text recognized")]
    NothingRecognized,

    #[error("recognized text {0:?} is not in the requested format")]
    Format(String),

    #[error("no symbol decoded: {0}")]
    NoSymbol(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Everything a stage can fail with.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("could not acquire {0}")]
    ResourceAllocation(ResourceKind),

    #[error("could not decode image")]
    ImageLoad(#[from] image::ImageError),

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("label not found: {0}")]
    LabelNotFound(String),

    #[error("could not align label: {0}")]
    AlignFailed(String),

    #[error("region {0:?} lies outside the image")]
    EmptyRegion(Rect),

    #[error("\"{expected}\" not found")]
    NameNotFound {
        expected: String,
        /// Text the OCR service returned, if any.
        read: Option<String>,
    },

    #[error("barcode not found")]
    BarcodeNotFound(#[source] ServiceError),

    #[error("price not found")]
    PriceNotFound(#[source] ServiceError),

    #[error("product doesn't match in barcode (expected {expected}, barcode {barcode})")]
    ProductMismatch { expected: String, barcode: String },

    #[error("price doesn't match in barcode (read {read}, barcode {expected:?})")]
    PriceMismatch {
        read: String,
        /// Price embedded in the barcode; `None` when the barcode is too short.
        expected: Option<String>,
    },

    #[error("{0} has not been produced yet")]
    MissingArtifact(&'static str),
}

impl LabelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LabelError::ResourceAllocation(_) => ErrorCategory::Allocation,
            LabelError::ProductMismatch { .. } | LabelError::PriceMismatch { .. } => {
                ErrorCategory::Validation
            }
            _ => ErrorCategory::Stage,
        }
    }
}

/// A run that stopped at `stage`.
#[derive(Error, Debug)]
#[error("{stage} failed")]
pub struct Aborted {
    pub stage: Stage,
    #[source]
    pub source: LabelError,
}

impl Aborted {
    pub fn new(stage: Stage, source: LabelError) -> Self {
        Self { stage, source }
    }
}
