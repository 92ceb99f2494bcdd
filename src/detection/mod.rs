pub mod barcode;
pub mod contours;
pub mod ocr;
pub mod preprocessing;
pub mod regions;
pub mod steps;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{LabelConfig, OcrBackend};
use crate::core::ResourceTracker;
use crate::error::Aborted;
use crate::models::LabelReport;
use crate::pipeline::Pipeline;
use barcode::{BarcodeDecoder, RxingDecoder};
use ocr::{OcrsRecognizer, TextRecognizer};
use preprocessing::{ImageOps, Imageproc};

/// External services the pipeline delegates to.
#[derive(Clone)]
pub struct Services {
    pub ops: Arc<dyn ImageOps>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub barcode: Arc<dyn BarcodeDecoder>,
}

impl Services {
    pub fn new(
        ops: Arc<dyn ImageOps>,
        ocr: Arc<dyn TextRecognizer>,
        barcode: Arc<dyn BarcodeDecoder>,
    ) -> Self {
        Self { ops, ocr, barcode }
    }

    /// imageproc, the configured OCR backend and rxing.
    pub fn from_config(config: &LabelConfig) -> anyhow::Result<Self> {
        let ocr: Arc<dyn TextRecognizer> = match config.ocr.backend {
            OcrBackend::Ocrs => Arc::new(OcrsRecognizer::new(config.ocr.model_dir.clone())),
            #[cfg(feature = "tesseract")]
            OcrBackend::Tesseract => Arc::new(ocr::TesseractRecognizer),
            #[cfg(not(feature = "tesseract"))]
            OcrBackend::Tesseract => {
                anyhow::bail!("the tesseract OCR backend requires the `tesseract` feature")
            }
        };
        Ok(Self::new(Arc::new(Imageproc), ocr, Arc::new(RxingDecoder)))
    }
}

/// Build the standard label pipeline:
/// localize, green channel, align, name, barcode, price, product check, price check.
pub fn build_standard_pipeline(config: &LabelConfig, services: &Services) -> Pipeline {
    use steps::*;

    Pipeline::new()
        .with_currency(config.currency.clone())
        .add_step(Arc::new(LocalizeStep {
            ops: services.ops.clone(),
            params: config.localize.clone(),
        }))
        .add_step(Arc::new(GreenChannelStep {
            ops: services.ops.clone(),
        }))
        .add_step(Arc::new(AlignStep {
            ops: services.ops.clone(),
        }))
        .add_step(Arc::new(NameCheckStep {
            ops: services.ops.clone(),
            ocr: services.ocr.clone(),
            layout: config.name_region,
            filter: config.name_filter.clone(),
            expected: config.expected_name.clone(),
            language: config.ocr.language.clone(),
        }))
        .add_step(Arc::new(BarcodeStep {
            decoder: services.barcode.clone(),
        }))
        .add_step(Arc::new(PriceReadStep {
            ops: services.ops.clone(),
            ocr: services.ocr.clone(),
            layout: config.price_region,
            filter: config.price_filter.clone(),
            currency: config.currency.clone(),
        }))
        .add_step(Arc::new(ProductCheckStep {
            product_code: config.product_code.clone(),
        }))
        .add_step(Arc::new(PriceCheckStep))
}

/// Entry point for checking label photographs.
pub struct LabelProcessor {
    pipeline: Pipeline,
}

impl LabelProcessor {
    pub fn new(config: &LabelConfig, services: &Services) -> Self {
        Self {
            pipeline: build_standard_pipeline(config, services),
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn ResourceTracker>) -> Self {
        self.pipeline = self.pipeline.with_tracker(tracker);
        self
    }

    /// Save intermediate images of every stage to `output_dir`
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Process one label photograph.
    pub fn process_label(&self, image_path: &Path) -> Result<LabelReport, Aborted> {
        self.pipeline.run(image_path)
    }
}

impl Default for LabelProcessor {
    fn default() -> Self {
        let config = LabelConfig::default();
        let services = Services::new(
            Arc::new(Imageproc),
            Arc::new(OcrsRecognizer::new(None)),
            Arc::new(RxingDecoder),
        );
        Self::new(&config, &services)
    }
}
