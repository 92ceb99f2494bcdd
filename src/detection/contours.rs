use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry;
use imageproc::point::Point;

use crate::models::{Contour, RotatedRect};

/// Outer borders of the top-level blobs in a binary image (non-zero = foreground)
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// True when all points lie on one line, which leaves no rectangle to fit.
fn is_degenerate(points: &[Point<i32>]) -> bool {
    let Some(first) = points.first() else {
        return true;
    };
    let Some(second) = points.iter().find(|p| *p != first) else {
        return true;
    };
    let (dx, dy) = ((second.x - first.x) as i64, (second.y - first.y) as i64);
    points.iter().all(|p| {
        let (px, py) = ((p.x - first.x) as i64, (p.y - first.y) as i64);
        dx * py - dy * px == 0
    })
}

/// Minimum-area rotated rectangle enclosing the contour
pub fn min_area_rect(contour: &Contour) -> Option<RotatedRect> {
    if is_degenerate(&contour.points) {
        return None;
    }
    let corners = geometry::min_area_rect(&contour.points);
    Some(RotatedRect::from_corners(
        corners.map(|p| Point::new(p.x as f32, p.y as f32)),
    ))
}
