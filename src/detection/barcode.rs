//! Barcode decoding service.

use rxing::BarcodeFormat;

use crate::core::PixelData;
use crate::error::ServiceError;

/// Symbologies the pipeline can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    /// 13-digit retail barcode
    Ean13,
}

impl Symbology {
    pub fn digits(&self) -> usize {
        match self {
            Symbology::Ean13 => 13,
        }
    }

    fn format(&self) -> BarcodeFormat {
        match self {
            Symbology::Ean13 => BarcodeFormat::EAN_13,
        }
    }
}

pub trait BarcodeDecoder: Send + Sync {
    /// Decode the first symbol of `symbology` found in the image.
    fn decode(&self, pixels: &PixelData, symbology: Symbology) -> Result<String, ServiceError>;
}

/// `BarcodeDecoder` backed by rxing.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl BarcodeDecoder for RxingDecoder {
    fn decode(&self, pixels: &PixelData, symbology: Symbology) -> Result<String, ServiceError> {
        let luma = pixels.to_luma().ok_or_else(|| {
            ServiceError::Unavailable(format!(
                "unsupported pixel layout ({} bytes per pixel)",
                pixels.bytes_per_pixel
            ))
        })?;
        let (width, height) = luma.dimensions();

        let result = rxing::helpers::detect_in_luma(
            luma.into_raw(),
            width,
            height,
            Some(symbology.format()),
        )
        .map_err(|e| ServiceError::NoSymbol(e.to_string()))?;

        let text = result.getText().to_string();
        if text.len() != symbology.digits() {
            return Err(ServiceError::NoSymbol(format!(
                "decoded {:?} has {} characters, expected {}",
                text,
                text.len(),
                symbology.digits()
            )));
        }
        Ok(text)
    }
}
