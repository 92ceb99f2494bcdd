use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageReader, RgbImage, RgbaImage, imageops};

use crate::core::resources::{Lease, ResourceKind, ResourceTracker};
use crate::error::LabelError;
use crate::models::{Contour, Rect, RotatedRect};

/// Owned pixel buffer with an optional region of interest.
///
/// Processing through `apply` only touches the ROI; `pixels` hands out the
/// ROI contents. The ROI is always clipped to the buffer.
pub struct LabelImage {
    pixels: DynamicImage,
    roi: Option<Rect>,
    _lease: Lease,
}

impl LabelImage {
    /// Acquire a fresh 1x1 grayscale buffer.
    pub fn acquire(tracker: &Arc<dyn ResourceTracker>) -> Result<Self, LabelError> {
        let lease = Lease::acquire(tracker, ResourceKind::Image)?;
        Ok(Self {
            pixels: DynamicImage::ImageLuma8(GrayImage::new(1, 1)),
            roi: None,
            _lease: lease,
        })
    }

    /// Decode an image file into this buffer.
    pub fn load(&mut self, path: &Path) -> Result<(), LabelError> {
        let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        self.replace(decoded);
        Ok(())
    }

    /// Copy the full contents of another buffer. The ROI is not carried over.
    pub fn copy_from(&mut self, other: &LabelImage) {
        self.replace(other.pixels.clone());
    }

    /// Swap in new contents and drop the ROI.
    pub fn replace(&mut self, pixels: DynamicImage) {
        self.pixels = pixels;
        self.roi = None;
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        self.pixels.color().channel_count()
    }

    pub fn to_rgb(&self) -> RgbImage {
        self.pixels.to_rgb8()
    }

    /// Luma copy of the whole buffer, ignoring the ROI.
    pub fn to_luma(&self) -> GrayImage {
        self.pixels.to_luma8()
    }

    pub fn roi(&self) -> Option<Rect> {
        self.roi
    }

    /// Restrict processing to `rect`, clipped to the buffer. Returns the
    /// rect actually installed.
    pub fn set_roi(&mut self, rect: Rect) -> Result<Rect, LabelError> {
        let clipped = rect
            .intersect_bounds(self.width(), self.height())
            .ok_or(LabelError::EmptyRegion(rect))?;
        self.roi = Some(clipped);
        Ok(clipped)
    }

    pub fn reset_roi(&mut self) {
        self.roi = None;
    }

    fn active_region(&self) -> Rect {
        self.roi
            .unwrap_or_else(|| Rect::new(0, 0, self.width(), self.height()))
    }

    fn take_luma(&mut self) -> GrayImage {
        match std::mem::replace(&mut self.pixels, DynamicImage::ImageLuma8(GrayImage::new(0, 0))) {
            DynamicImage::ImageLuma8(gray) => gray,
            other => other.to_luma8(),
        }
    }

    /// Run a grayscale operation over the ROI (or the whole buffer when no ROI
    /// is set). Color buffers are converted to luma first.
    ///
    /// Without a ROI the result replaces the buffer and may change its size;
    /// with a ROI it is pasted back at the ROI origin.
    pub fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&GrayImage) -> GrayImage,
    {
        let mut gray = self.take_luma();
        match self.roi {
            None => {
                self.pixels = DynamicImage::ImageLuma8(op(&gray));
            }
            Some(region) => {
                let view =
                    imageops::crop_imm(&gray, region.x, region.y, region.width, region.height)
                        .to_image();
                let processed = op(&view);
                imageops::replace(&mut gray, &processed, region.x as i64, region.y as i64);
                self.pixels = DynamicImage::ImageLuma8(gray);
            }
        }
    }

    /// Contiguous copy of the ROI for handing to external services.
    pub fn pixels(&self) -> PixelData {
        let region = self.active_region();
        let view = self
            .pixels
            .crop_imm(region.x, region.y, region.width, region.height);
        let bytes_per_pixel = view.color().bytes_per_pixel() as u32;
        PixelData {
            data: view.as_bytes().to_vec(),
            width: view.width(),
            height: view.height(),
            bytes_per_pixel,
            stride: view.width() * bytes_per_pixel,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), LabelError> {
        self.pixels
            .save(path)
            .map_err(|e| LabelError::Io(std::io::Error::other(e)))
    }
}

impl std::fmt::Debug for LabelImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("channels", &self.channels())
            .field("roi", &self.roi)
            .finish()
    }
}

/// Raw 8-bit pixel rows as handed to OCR and barcode services.
#[derive(Debug, Clone)]
pub struct PixelData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    /// Bytes from the start of one row to the next.
    pub stride: u32,
}

impl PixelData {
    fn packed_rows(&self) -> Option<Vec<u8>> {
        let row = (self.width * self.bytes_per_pixel) as usize;
        let stride = self.stride as usize;
        if stride < row {
            return None;
        }
        let mut packed = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * stride;
            packed.extend_from_slice(self.data.get(start..start + row)?);
        }
        Some(packed)
    }

    /// Rebuild an image from the rows. `None` for unsupported layouts.
    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        let packed = self.packed_rows()?;
        match self.bytes_per_pixel {
            1 => GrayImage::from_raw(self.width, self.height, packed).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, packed).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(self.width, self.height, packed).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }

    pub fn to_luma(&self) -> Option<GrayImage> {
        self.to_dynamic().map(|img| img.to_luma8())
    }
}

/// A tracked handle holding at most one value.
pub struct Handle<T> {
    value: Option<T>,
    _lease: Lease,
}

impl<T> Handle<T> {
    pub fn acquire(tracker: &Arc<dyn ResourceTracker>, kind: ResourceKind) -> Result<Self, LabelError> {
        Ok(Self {
            value: None,
            _lease: Lease::acquire(tracker, kind)?,
        })
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(&self.value).finish()
    }
}

/// Slot for the label pose of one run.
pub type PoseSlot = Handle<RotatedRect>;

/// Slot for a sub-region rectangle.
pub type RectHandle = Handle<Rect>;

/// Contours found during localisation.
pub type ContourSet = Handle<Vec<Contour>>;

impl PoseSlot {
    pub fn acquire_pose(tracker: &Arc<dyn ResourceTracker>) -> Result<Self, LabelError> {
        Self::acquire(tracker, ResourceKind::RotatedRect)
    }
}

impl RectHandle {
    pub fn acquire_rect(tracker: &Arc<dyn ResourceTracker>) -> Result<Self, LabelError> {
        Self::acquire(tracker, ResourceKind::Rect)
    }
}

impl ContourSet {
    pub fn acquire_contours(tracker: &Arc<dyn ResourceTracker>) -> Result<Self, LabelError> {
        Self::acquire(tracker, ResourceKind::ContourSet)
    }

    pub fn count(&self) -> usize {
        self.get().map_or(0, Vec::len)
    }
}
