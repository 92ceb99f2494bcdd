use std::sync::Arc;

use image::DynamicImage;

use crate::config::{LocalizeParams, NameFilterParams, PriceFilterParams, RegionLayout};
use crate::core::{ContourSet, LabelImage, RectHandle};
use crate::detection::barcode::{BarcodeDecoder, Symbology};
use crate::detection::ocr::{OcrMode, TextRecognizer};
use crate::detection::preprocessing::{Channel, ImageOps, ThresholdLevel, kernel_radius};
use crate::detection::{regions, validate};
use crate::error::{LabelError, Stage};
use crate::models::Rect;
use crate::pipeline::{LabelData, PipelineContext, PipelineStep};

/// Find the label's rotated bounding rectangle in the photograph
pub struct LocalizeStep {
    pub ops: Arc<dyn ImageOps>,
    pub params: LocalizeParams,
}

impl PipelineStep for LocalizeStep {
    fn process(&self, data: &mut LabelData, context: &PipelineContext) -> Result<(), LabelError> {
        let mut work = LabelImage::acquire(&context.tracker)?;
        let mut contours = ContourSet::acquire_contours(&context.tracker)?;

        let ops = self.ops.as_ref();
        let p = &self.params;

        work.copy_from(&data.image);
        let blue = ops.channel(&work.to_rgb(), Channel::Blue);
        work.replace(DynamicImage::ImageLuma8(blue));
        work.apply(|img| ops.median_blur(img, p.median_kernel));
        work.apply(|img| ops.invert(img));
        work.apply(|img| ops.mean_blur(img, p.mean_kernel));
        work.apply(|img| ops.threshold(img, ThresholdLevel::Fixed(p.threshold), true));
        work.apply(|img| ops.dilate_erode(img, kernel_radius(p.closing_kernel)));

        contours.set(ops.external_contours(&work.to_luma()));
        let found = contours.count();
        log::debug!("Localize: {} external contours", found);

        let outline = match contours.get().map(Vec::as_slice) {
            Some([single]) => single,
            _ => {
                return Err(LabelError::LabelNotFound(format!(
                    "expected exactly one label blob, found {}",
                    found
                )));
            }
        };

        let pose = ops
            .min_area_rect(outline)
            .ok_or_else(|| LabelError::LabelNotFound("degenerate label outline".to_string()))?;
        log::debug!(
            "Label at ({:.1}, {:.1}), {:.1}x{:.1}, {:.1} deg",
            pose.center_x,
            pose.center_y,
            pose.width,
            pose.height,
            pose.angle
        );
        data.pose.set(pose);
        Ok(())
    }

    fn stage(&self) -> Stage {
        Stage::Localize
    }
}

/// Reduce the photograph to its green channel
pub struct GreenChannelStep {
    pub ops: Arc<dyn ImageOps>,
}

impl PipelineStep for GreenChannelStep {
    fn process(&self, data: &mut LabelData, _context: &PipelineContext) -> Result<(), LabelError> {
        let green = self.ops.channel(&data.image.to_rgb(), Channel::Green);
        data.image.replace(DynamicImage::ImageLuma8(green));
        Ok(())
    }

    fn stage(&self) -> Stage {
        Stage::ExtractGreenChannel
    }
}

/// Produce the upright copy of the label in `data.aligned`
pub struct AlignStep {
    pub ops: Arc<dyn ImageOps>,
}

impl PipelineStep for AlignStep {
    fn process(&self, data: &mut LabelData, _context: &PipelineContext) -> Result<(), LabelError> {
        let pose = data
            .pose()
            .map_err(|_| LabelError::AlignFailed("label has not been localized".to_string()))?;
        if pose.width < 1.0 || pose.height < 1.0 {
            return Err(LabelError::AlignFailed(format!(
                "label is {:.1}x{:.1}",
                pose.width, pose.height
            )));
        }

        data.aligned.copy_from(&data.image);
        let ops = self.ops.as_ref();
        data.aligned.apply(|img| ops.rotate_upright(img, &pose));
        Ok(())
    }

    fn stage(&self) -> Stage {
        Stage::Align
    }
}

/// Scratch copy of an image restricted to one sub-region.
///
/// `rect` is declared first so it is released before `image`.
struct RegionScratch {
    rect: RectHandle,
    image: LabelImage,
}

impl RegionScratch {
    fn acquire(source: &LabelImage, region: Rect, context: &PipelineContext) -> Result<Self, LabelError> {
        let mut image = LabelImage::acquire(&context.tracker)?;
        let mut rect = RectHandle::acquire_rect(&context.tracker)?;

        image.copy_from(source);
        let installed = image.set_roi(region)?;
        rect.set(installed);
        Ok(Self { rect, image })
    }
}

/// Read the product-name zone and check it against the expected text
pub struct NameCheckStep {
    pub ops: Arc<dyn ImageOps>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub layout: RegionLayout,
    pub filter: NameFilterParams,
    pub expected: String,
    pub language: String,
}

impl PipelineStep for NameCheckStep {
    fn process(&self, data: &mut LabelData, context: &PipelineContext) -> Result<(), LabelError> {
        let region = regions::region_for(&self.layout, &data.pose()?);
        let mut scratch = RegionScratch::acquire(&data.aligned, region, context)?;
        log::debug!("Product name zone {:?}", scratch.rect.get());

        let ops = self.ops.as_ref();
        scratch.image.apply(|img| ops.threshold(img, ThresholdLevel::Otsu, false));
        scratch.image.apply(|img| ops.erode(img, self.filter.erode_radius));

        let mode = OcrMode::Text {
            language: self.language.clone(),
        };
        let text = self.ocr.recognize(&scratch.image.pixels(), &mode).map_err(|e| {
            log::debug!("Product name OCR failed: {}", e);
            LabelError::NameNotFound {
                expected: self.expected.clone(),
                read: None,
            }
        })?;
        log::debug!("Product name reads {:?}", text);

        validate::validate_name(&text, &self.expected)
    }

    fn stage(&self) -> Stage {
        Stage::ValidateName
    }
}

/// Decode the EAN-13 barcode from the full green-channel image
pub struct BarcodeStep {
    pub decoder: Arc<dyn BarcodeDecoder>,
}

impl PipelineStep for BarcodeStep {
    fn process(&self, data: &mut LabelData, context: &PipelineContext) -> Result<(), LabelError> {
        let mut scratch = LabelImage::acquire(&context.tracker)?;
        scratch.copy_from(&data.image);

        let code = self
            .decoder
            .decode(&scratch.pixels(), Symbology::Ean13)
            .map_err(LabelError::BarcodeNotFound)?;
        log::debug!("Barcode {}", code);
        data.barcode = Some(code);
        Ok(())
    }

    fn stage(&self) -> Stage {
        Stage::ReadBarcode
    }
}

/// Read the price zone
pub struct PriceReadStep {
    pub ops: Arc<dyn ImageOps>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub layout: RegionLayout,
    pub filter: PriceFilterParams,
    pub currency: String,
}

impl PipelineStep for PriceReadStep {
    fn process(&self, data: &mut LabelData, context: &PipelineContext) -> Result<(), LabelError> {
        let region = regions::region_for(&self.layout, &data.pose()?);
        let mut scratch = RegionScratch::acquire(&data.aligned, region, context)?;
        log::debug!("Price zone {:?}", scratch.rect.get());

        let ops = self.ops.as_ref();
        let f = &self.filter;
        scratch.image.apply(|img| ops.mean_blur(img, f.mean_kernel));
        scratch.image.apply(|img| ops.threshold(img, ThresholdLevel::Otsu, false));
        scratch.image.apply(|img| ops.dilate_erode(img, f.closing_radius));
        scratch
            .image
            .apply(|img| ops.threshold(img, ThresholdLevel::Fixed(f.binarize_level), false));

        let mode = OcrMode::Price {
            currency: self.currency.clone(),
        };
        let price = self
            .ocr
            .recognize(&scratch.image.pixels(), &mode)
            .map_err(LabelError::PriceNotFound)?;
        log::debug!("Price reads {:?}", price);
        data.price = Some(price);
        Ok(())
    }

    fn stage(&self) -> Stage {
        Stage::ReadPrice
    }
}

/// Check the product code embedded in the barcode
pub struct ProductCheckStep {
    pub product_code: String,
}

impl PipelineStep for ProductCheckStep {
    fn process(&self, data: &mut LabelData, _context: &PipelineContext) -> Result<(), LabelError> {
        validate::validate_product(data.barcode()?, &self.product_code)
    }

    fn stage(&self) -> Stage {
        Stage::ValidateProduct
    }
}

/// Check the printed price against the price embedded in the barcode
pub struct PriceCheckStep;

impl PipelineStep for PriceCheckStep {
    fn process(&self, data: &mut LabelData, _context: &PipelineContext) -> Result<(), LabelError> {
        validate::validate_price(data.barcode()?, data.price()?)
    }

    fn stage(&self) -> Stage {
        Stage::ValidatePrice
    }
}
