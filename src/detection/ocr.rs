use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use ocrs::{ImageSource, OcrEngine}; // Re-export for use in other modules
use ocrs::OcrEngineParams;
use rten::Model;

use crate::core::PixelData;
use crate::error::ServiceError;

/// What the OCR service is asked to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrMode {
    /// Free text in the given language (ISO 639-2, e.g. "spa").
    Text { language: String },
    /// A price: digits with one decimal separator, printed in `currency`
    /// (ISO 4217 code).
    Price { currency: String },
}

/// OCR service.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, pixels: &PixelData, mode: &OcrMode) -> Result<String, ServiceError>;
}

/// Standard model location (`~/.cache/ocrs`)
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Initialize OCR engine with the models found in `model_dir`
pub fn init_ocr_engine(model_dir: &Path) -> anyhow::Result<OcrEngine> {
    let detection_model_path = model_dir.join("text-detection.rten");
    let recognition_model_path = model_dir.join("text-recognition.rten");

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_model_path)?;
    let recognition_model = Model::load_file(&recognition_model_path)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Printed symbol for an ISO 4217 currency code.
pub fn currency_symbol(currency: &str) -> Option<char> {
    match currency {
        "EUR" => Some('€'),
        "USD" => Some('$'),
        "GBP" => Some('£'),
        "JPY" => Some('¥'),
        _ => None,
    }
}

/// Reduce recognized text to a price such as `12.34`.
///
/// Leading noise is skipped, `,` is accepted as the decimal separator and
/// reading stops at the first character that cannot be part of the number.
/// The symbol of `currency` counts as a separator too (`12€50`).
pub fn normalize_price(text: &str, currency: &str) -> Option<String> {
    let symbol = currency_symbol(currency);
    let mut price = String::new();
    let mut has_separator = false;

    for c in text.chars() {
        let separator = c == '.' || c == ',' || Some(c) == symbol;
        match c {
            '0'..='9' => price.push(c),
            _ if separator && !price.is_empty() && !has_separator => {
                price.push('.');
                has_separator = true;
            }
            _ if price.is_empty() => {}
            _ => break,
        }
    }

    if price.ends_with('.') {
        price.pop();
    }
    if price.is_empty() { None } else { Some(price) }
}

/// Post-process raw engine output according to `mode`.
pub fn finish_text(raw: &str, mode: &OcrMode) -> Result<String, ServiceError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ServiceError::NothingRecognized);
    }
    match mode {
        OcrMode::Text { .. } => Ok(text.to_string()),
        OcrMode::Price { currency } => {
            normalize_price(text, currency).ok_or_else(|| ServiceError::Format(text.to_string()))
        }
    }
}

/// `TextRecognizer` backed by ocrs.
///
/// ocrs reads Latin script without a language switch, so `OcrMode::Text`
/// languages are only logged.
pub struct OcrsRecognizer {
    model_dir: Option<PathBuf>,
    // Lazy-initialized OCR engine, initialized once on first use
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    pub fn new(model_dir: Option<PathBuf>) -> Self {
        Self {
            model_dir,
            engine: Mutex::new(None),
        }
    }

    fn engine(&self) -> Result<Arc<OcrEngine>, ServiceError> {
        let mut guard = self
            .engine
            .lock()
            .map_err(|_| ServiceError::Unavailable("OCR engine lock poisoned".to_string()))?;
        if let Some(engine) = guard.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let model_dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir().map_err(|e| ServiceError::Unavailable(e.to_string()))?,
        };
        log::info!("Initializing OCR engine from {}", model_dir.display());
        let engine = Arc::new(
            init_ocr_engine(&model_dir).map_err(|e| ServiceError::Unavailable(e.to_string()))?,
        );
        *guard = Some(Arc::clone(&engine));
        Ok(engine)
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(&self, pixels: &PixelData, mode: &OcrMode) -> Result<String, ServiceError> {
        let engine = self.engine()?;

        if let OcrMode::Text { language } = mode {
            log::debug!("ocrs: reading {} text", language);
        }

        let img = pixels
            .to_dynamic()
            .ok_or_else(|| {
                ServiceError::Unavailable(format!(
                    "unsupported pixel layout ({} bytes per pixel)",
                    pixels.bytes_per_pixel
                ))
            })?
            .to_rgb8();

        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| ServiceError::Engine(anyhow::anyhow!("{}", e)))?;
        let ocr_input = engine
            .prepare_input(img_source)
            .map_err(|e| ServiceError::Engine(anyhow::anyhow!("{}", e)))?;
        let text = engine
            .get_text(&ocr_input)
            .map_err(|e| ServiceError::Engine(anyhow::anyhow!("{}", e)))?;

        log::debug!("ocrs: raw text {:?}", text);
        finish_text(&text, mode)
    }
}

/// `TextRecognizer` backed by the system tesseract binary.
#[cfg(feature = "tesseract")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TesseractRecognizer;

#[cfg(feature = "tesseract")]
impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, pixels: &PixelData, mode: &OcrMode) -> Result<String, ServiceError> {
        use rusty_tesseract::{Args, Image};
        use std::collections::HashMap;

        let img = pixels.to_dynamic().ok_or_else(|| {
            ServiceError::Unavailable(format!(
                "unsupported pixel layout ({} bytes per pixel)",
                pixels.bytes_per_pixel
            ))
        })?;
        let tess_img = Image::from_dynamic_image(&img)
            .map_err(|e| ServiceError::Engine(anyhow::anyhow!("{}", e)))?;

        let mut config_variables = HashMap::new();
        let lang = match mode {
            OcrMode::Text { language } => language.clone(),
            OcrMode::Price { currency } => {
                let mut whitelist = "0123456789.,".to_string();
                whitelist.extend(currency_symbol(currency));
                config_variables.insert("tessedit_char_whitelist".to_string(), whitelist);
                "eng".to_string()
            }
        };
        let args = Args {
            lang,
            config_variables,
            dpi: Some(300),
            psm: Some(7), // Single text line
            oem: Some(3),
        };

        let text = rusty_tesseract::image_to_string(&tess_img, &args)
            .map_err(|e| ServiceError::Engine(anyhow::anyhow!("{}", e)))?;
        log::debug!("tesseract: raw text {:?}", text);
        finish_text(&text, mode)
    }
}
