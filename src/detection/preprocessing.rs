use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, median_filter};
use imageproc::geometric_transformations::{Interpolation, rotate};
use imageproc::morphology::{close, erode};

use crate::detection::contours;
use crate::models::{Contour, RotatedRect};

/// Color channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Threshold level: fixed or chosen by Otsu's method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdLevel {
    Fixed(u8),
    Otsu,
}

/// Extract one channel as a grayscale image
pub fn extract_channel(img: &RgbImage, channel: Channel) -> GrayImage {
    let idx = channel.index();
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([img.get_pixel(x, y)[idx]])
    })
}

/// Median smoothing with a square `kernel` x `kernel` window
pub fn median_blur(img: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    median_filter(img, radius, radius)
}

/// Mean (box) smoothing with a square `kernel` x `kernel` window
pub fn mean_blur(img: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    box_filter(img, radius, radius)
}

pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    image::imageops::invert(&mut out);
    out
}

/// Binarize to 0/255. With `inverted`, pixels above the level become 0.
pub fn binarize(img: &GrayImage, level: ThresholdLevel, inverted: bool) -> GrayImage {
    let level = match level {
        ThresholdLevel::Fixed(level) => level,
        ThresholdLevel::Otsu => otsu_level(img),
    };
    let kind = if inverted {
        ThresholdType::BinaryInverted
    } else {
        ThresholdType::Binary
    };
    threshold(img, level, kind)
}

/// Dilate then erode with a square structuring element of the given radius
pub fn dilate_erode(img: &GrayImage, radius: u8) -> GrayImage {
    close(img, Norm::LInf, radius)
}

pub fn erode_square(img: &GrayImage, radius: u8) -> GrayImage {
    erode(img, Norm::LInf, radius)
}

/// Rotate about the pose centre so the label edges become axis-aligned.
/// The canvas keeps its size; uncovered pixels are black.
pub fn rotate_upright(img: &GrayImage, pose: &RotatedRect) -> GrayImage {
    rotate(
        img,
        (pose.center_x, pose.center_y),
        -pose.angle.to_radians(),
        Interpolation::Bilinear,
        Luma([0u8]),
    )
}

/// Largest square kernel side the morphology operators accept.
pub const MAX_MORPHOLOGY_KERNEL: u32 = 2 * u8::MAX as u32 + 1;

/// Radius for a square kernel side, saturated to what the morphology
/// operators accept.
pub fn kernel_radius(kernel: u32) -> u8 {
    let radius = kernel / 2;
    if radius > u8::MAX as u32 {
        log::warn!(
            "kernel {} exceeds the largest supported ({}), using radius {}",
            kernel,
            MAX_MORPHOLOGY_KERNEL,
            u8::MAX
        );
    }
    radius.min(u8::MAX as u32) as u8
}

/// Image-processing primitives used by the pipeline.
///
/// Every method defaults to the imageproc implementation, so test doubles
/// only override what they need to fake.
pub trait ImageOps: Send + Sync {
    fn channel(&self, img: &RgbImage, channel: Channel) -> GrayImage {
        extract_channel(img, channel)
    }

    fn median_blur(&self, img: &GrayImage, kernel: u32) -> GrayImage {
        median_blur(img, kernel)
    }

    fn mean_blur(&self, img: &GrayImage, kernel: u32) -> GrayImage {
        mean_blur(img, kernel)
    }

    fn invert(&self, img: &GrayImage) -> GrayImage {
        invert(img)
    }

    fn threshold(&self, img: &GrayImage, level: ThresholdLevel, inverted: bool) -> GrayImage {
        binarize(img, level, inverted)
    }

    fn dilate_erode(&self, img: &GrayImage, radius: u8) -> GrayImage {
        dilate_erode(img, radius)
    }

    fn erode(&self, img: &GrayImage, radius: u8) -> GrayImage {
        erode_square(img, radius)
    }

    fn external_contours(&self, img: &GrayImage) -> Vec<Contour> {
        contours::external_contours(img)
    }

    fn min_area_rect(&self, contour: &Contour) -> Option<RotatedRect> {
        contours::min_area_rect(contour)
    }

    fn rotate_upright(&self, img: &GrayImage, pose: &RotatedRect) -> GrayImage {
        rotate_upright(img, pose)
    }
}

/// `ImageOps` backed by imageproc.
#[derive(Debug, Default, Clone, Copy)]
pub struct Imageproc;

impl ImageOps for Imageproc {}
