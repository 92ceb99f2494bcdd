//! Sub-regions of the label, placed relative to the localized pose.

use crate::config::RegionLayout;
use crate::models::{Rect, RotatedRect};

/// Rect for `layout` relative to `pose`.
///
/// Coordinates are truncated toward zero and a negative origin is clamped to 0.
/// The angle does not take part: regions are taken in the aligned frame,
/// where the label is upright around the same centre.
pub fn region_for(layout: &RegionLayout, pose: &RotatedRect) -> Rect {
    let x = pose.center_x - layout.x_factor * pose.width / 2.0;
    let y = pose.center_y - layout.y_factor * pose.height / 2.0;
    let width = layout.width_factor * pose.width;
    let height = layout.height_factor * pose.height;
    Rect::clamped(x as i64, y as i64, width as i64, height as i64)
}

/// Product-name zone with the default layout
pub fn product_name_region(pose: &RotatedRect) -> Rect {
    region_for(&RegionLayout::PRODUCT_NAME, pose)
}

/// Price zone with the default layout
pub fn price_region(pose: &RotatedRect) -> Rect {
    region_for(&RegionLayout::PRICE, pose)
}
