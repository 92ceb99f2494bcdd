use imageproc::point::Point;
use serde::Serialize;

/// Axis-aligned region. Coordinates are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rect from possibly negative coordinates, clamping the origin to 0.
    pub fn clamped(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x: x.clamp(0, u32::MAX as i64) as u32,
            y: y.clamp(0, u32::MAX as i64) as u32,
            width: width.clamp(0, u32::MAX as i64) as u32,
            height: height.clamp(0, u32::MAX as i64) as u32,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Part of this rect that fits inside a `width` x `height` buffer.
    pub fn intersect_bounds(&self, width: u32, height: u32) -> Option<Rect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        let rect = Rect::new(self.x, self.y, w, h);
        if rect.is_empty() { None } else { Some(rect) }
    }
}

/// Rotated rectangle describing the label pose in the source image.
///
/// `angle` is in degrees, normalised to (-45, 45], and `width` is measured
/// along the rotated x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotatedRect {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl RotatedRect {
    /// Build the pose from the four corners of a minimum-area rectangle,
    /// given in traversal order.
    pub fn from_corners(corners: [Point<f32>; 4]) -> Self {
        let center_x = corners.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let center_y = corners.iter().map(|p| p.y).sum::<f32>() / 4.0;

        let (e1x, e1y) = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
        let (e2x, e2y) = (corners[2].x - corners[1].x, corners[2].y - corners[1].y);

        let mut width = e1x.hypot(e1y);
        let mut height = e2x.hypot(e2y);
        let mut angle = e1y.atan2(e1x).to_degrees();

        // An edge direction is only defined modulo 180 degrees.
        if angle > 90.0 {
            angle -= 180.0;
        } else if angle <= -90.0 {
            angle += 180.0;
        }
        if angle > 45.0 {
            angle -= 90.0;
            std::mem::swap(&mut width, &mut height);
        } else if angle <= -45.0 {
            angle += 90.0;
            std::mem::swap(&mut width, &mut height);
        }

        Self {
            center_x,
            center_y,
            width,
            height,
            angle,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Outline of one connected blob.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inclusive bounding box as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }

    pub fn width(&self) -> u32 {
        self.bounds()
            .map(|(min_x, _, max_x, _)| (max_x - min_x + 1) as u32)
            .unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.bounds()
            .map(|(_, min_y, _, max_y)| (max_y - min_y + 1) as u32)
            .unwrap_or(0)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelReport {
    pub barcode: String,
    pub price: String,
    pub currency: String,
}

impl std::fmt::Display for LabelReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Code:\t{}", self.barcode)?;
        write!(f, "Price:\t{:>5} {}", self.price, self.currency)
    }
}
