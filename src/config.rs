//! Calibration values for the supported label layout and service settings.
//!
//! Missing keys fall back to the defaults below, so a JSON file only needs
//! the values it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detection::preprocessing::MAX_MORPHOLOGY_KERNEL;
use crate::models::{Rect, RotatedRect};

/// Parameters of the label localisation filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizeParams {
    pub median_kernel: u32,
    pub mean_kernel: u32,
    /// Binary-inverse threshold applied after the mean blur.
    pub threshold: u8,
    /// Side of the square structuring element used for closing.
    pub closing_kernel: u32,
}

impl Default for LocalizeParams {
    fn default() -> Self {
        Self {
            median_kernel: 7,
            mean_kernel: 21,
            threshold: 2,
            closing_kernel: 100,
        }
    }
}

/// Position of a sub-region relative to the label pose.
///
/// x = cx - x_factor * w / 2, y = cy - y_factor * h / 2,
/// width = width_factor * w, height = height_factor * h.
/// All four factors are required when a layout is given in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionLayout {
    pub x_factor: f32,
    pub y_factor: f32,
    pub width_factor: f32,
    pub height_factor: f32,
}

impl RegionLayout {
    pub const PRODUCT_NAME: RegionLayout = RegionLayout {
        x_factor: 1.05,
        y_factor: 1.47,
        width_factor: 0.5,
        height_factor: 0.20,
    };

    pub const PRICE: RegionLayout = RegionLayout {
        x_factor: 0.33,
        y_factor: 0.64,
        width_factor: 0.225,
        height_factor: 0.15,
    };

    /// Region for `pose`; see `detection::regions::region_for`.
    pub fn region(&self, pose: &RotatedRect) -> Rect {
        crate::detection::regions::region_for(self, pose)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameFilterParams {
    pub erode_radius: u8,
}

impl Default for NameFilterParams {
    fn default() -> Self {
        Self { erode_radius: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFilterParams {
    pub mean_kernel: u32,
    pub closing_radius: u8,
    /// Final hard threshold after the Otsu pass.
    pub binarize_level: u8,
}

impl Default for PriceFilterParams {
    fn default() -> Self {
        Self {
            mean_kernel: 3,
            closing_radius: 1,
            binarize_level: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    #[default]
    Ocrs,
    Tesseract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrParams {
    pub backend: OcrBackend,
    /// Language of the label text (ISO 639-2).
    pub language: String,
    /// Directory holding the ocrs detection/recognition models.
    pub model_dir: Option<PathBuf>,
}

impl Default for OcrParams {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Ocrs,
            language: "spa".to_string(),
            model_dir: None,
        }
    }
}

/// Full configuration of one label layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub localize: LocalizeParams,
    pub name_region: RegionLayout,
    pub price_region: RegionLayout,
    pub name_filter: NameFilterParams,
    pub price_filter: PriceFilterParams,
    /// Text the product-name zone must start with.
    pub expected_name: String,
    /// First seven barcode digits of the expected product.
    pub product_code: String,
    pub currency: String,
    pub ocr: OcrParams,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            localize: LocalizeParams::default(),
            name_region: RegionLayout::PRODUCT_NAME,
            price_region: RegionLayout::PRICE,
            name_filter: NameFilterParams::default(),
            price_filter: PriceFilterParams::default(),
            expected_name: "Cerdo".to_string(),
            product_code: "2301703".to_string(),
            currency: "EUR".to_string(),
            ocr: OcrParams::default(),
        }
    }
}

impl LabelConfig {
    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the image operators cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let kernel = self.localize.closing_kernel;
        if kernel > MAX_MORPHOLOGY_KERNEL {
            anyhow::bail!(
                "localize.closing_kernel {} exceeds the largest supported kernel {}",
                kernel,
                MAX_MORPHOLOGY_KERNEL
            );
        }
        Ok(())
    }
}
