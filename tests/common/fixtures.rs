use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect as DrawRect;
use tempfile::NamedTempFile;

use labelcheck::core::{PixelData, ResourceKind, ResourceTracker};
use labelcheck::detection::barcode::{BarcodeDecoder, Symbology};
use labelcheck::detection::ocr::{OcrMode, TextRecognizer};
use labelcheck::detection::preprocessing::Imageproc;
use labelcheck::{LabelConfig, LabelError, LabelProcessor, ServiceError, Services};

/// Package background behind the label
pub const BACKGROUND: Rgb<u8> = Rgb([120, 60, 40]);
pub const LABEL_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Barcode whose product code and embedded price match the defaults
pub const GOOD_BARCODE: &str = "2301703X5045Y";
pub const GOOD_PRICE: &str = "50.45";

/// Saves the image as a temporary PNG.
/// The file will be automatically cleaned up when dropped.
pub fn save_temp_png(img: &RgbImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// 800x600 photograph with a 400x200 white label centred at (399.5, 299.5).
pub fn upright_label_image() -> RgbImage {
    let mut img = RgbImage::from_pixel(800, 600, BACKGROUND);
    draw_filled_rect_mut(&mut img, DrawRect::at(200, 200).of_size(400, 200), LABEL_WHITE);
    img
}

/// Same label as `upright_label_image`, rotated clockwise by `degrees`.
pub fn rotated_label_image(degrees: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(800, 600, BACKGROUND);
    let (cx, cy) = (400.0f32, 300.0f32);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let corners: Vec<Point<i32>> = [(-200.0f32, -100.0f32), (200.0, -100.0), (200.0, 100.0), (-200.0, 100.0)]
        .iter()
        .map(|&(dx, dy)| {
            Point::new(
                (cx + dx * cos - dy * sin).round() as i32,
                (cy + dx * sin + dy * cos).round() as i32,
            )
        })
        .collect();
    draw_polygon_mut(&mut img, &corners, LABEL_WHITE);
    img
}

/// Background only.
pub fn empty_image() -> RgbImage {
    RgbImage::from_pixel(800, 600, BACKGROUND)
}

/// Two separate labels far enough apart that closing cannot merge them.
pub fn two_labels_image() -> RgbImage {
    let mut img = RgbImage::from_pixel(1000, 500, BACKGROUND);
    draw_filled_rect_mut(&mut img, DrawRect::at(100, 175).of_size(200, 150), LABEL_WHITE);
    draw_filled_rect_mut(&mut img, DrawRect::at(700, 175).of_size(200, 150), LABEL_WHITE);
    img
}

/// OCR double with one canned answer per mode. Records every buffer it was
/// handed.
pub struct FakeOcr {
    pub name: Result<String, String>,
    pub price: Result<String, String>,
    pub calls: Mutex<Vec<(OcrMode, u32, u32)>>,
    pub buffers: Mutex<Vec<PixelData>>,
}

impl FakeOcr {
    pub fn new(name: &str, price: &str) -> Self {
        Self {
            name: Ok(name.to_string()),
            price: Ok(price.to_string()),
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_price(name: &str) -> Self {
        Self {
            name: Ok(name.to_string()),
            price: Err("no digits".to_string()),
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(OcrMode, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn buffers(&self) -> Vec<PixelData> {
        self.buffers.lock().unwrap().clone()
    }
}

impl TextRecognizer for FakeOcr {
    fn recognize(&self, pixels: &PixelData, mode: &OcrMode) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((mode.clone(), pixels.width, pixels.height));
        self.buffers.lock().unwrap().push(pixels.clone());
        let answer = match mode {
            OcrMode::Text { .. } => &self.name,
            OcrMode::Price { .. } => &self.price,
        };
        answer.clone().map_err(ServiceError::Format)
    }
}

/// Barcode double returning a fixed decode result.
pub struct FakeBarcode {
    pub code: Option<String>,
}

impl FakeBarcode {
    pub fn new(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
        }
    }

    pub fn unreadable() -> Self {
        Self { code: None }
    }
}

impl BarcodeDecoder for FakeBarcode {
    fn decode(&self, _pixels: &PixelData, _symbology: Symbology) -> Result<String, ServiceError> {
        self.code
            .clone()
            .ok_or_else(|| ServiceError::NoSymbol("fake decoder".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Acquire(ResourceKind),
    Release(ResourceKind),
}

#[derive(Default)]
struct TrackerState {
    attempts: usize,
    live: i64,
    events: Vec<Event>,
}

/// Tracker that counts live resources and can refuse the N-th acquisition
/// (1-based).
#[derive(Default)]
pub struct CountingTracker {
    fail_at: Option<usize>,
    state: Mutex<TrackerState>,
}

impl CountingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(n: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_at: Some(n),
            state: Mutex::default(),
        })
    }

    pub fn live(&self) -> i64 {
        self.state.lock().unwrap().live
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }
}

impl ResourceTracker for CountingTracker {
    fn acquire(&self, kind: ResourceKind) -> Result<(), LabelError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if self.fail_at == Some(state.attempts) {
            return Err(LabelError::ResourceAllocation(kind));
        }
        state.live += 1;
        state.events.push(Event::Acquire(kind));
        Ok(())
    }

    fn release(&self, kind: ResourceKind) {
        let mut state = self.state.lock().unwrap();
        state.live -= 1;
        state.events.push(Event::Release(kind));
    }
}

/// Real image processing with fake OCR and barcode services.
pub fn fake_services(ocr: Arc<FakeOcr>, barcode: Arc<FakeBarcode>) -> Services {
    Services::new(Arc::new(Imageproc), ocr, barcode)
}

/// Processor over the default configuration with fake services that make
/// every check pass.
pub fn passing_processor() -> (LabelProcessor, Arc<FakeOcr>) {
    let ocr = Arc::new(FakeOcr::new("Cerdo adobado", GOOD_PRICE));
    let services = fake_services(ocr.clone(), Arc::new(FakeBarcode::new(GOOD_BARCODE)));
    (LabelProcessor::new(&LabelConfig::default(), &services), ocr)
}
