//! Image resizing transform

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pure resize transform: `(image, width, height) -> image`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResizer {
    filter: FilterType,
}

/// Available resize filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Gaussian blur
    Gaussian,
    /// Lanczos with radius 3 (high quality, recommended)
    #[default]
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Gaussian => image::imageops::FilterType::Gaussian,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl ImageResizer {
    /// Create a resizer with the given filter
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Resize `image` to `width` x `height`.
    ///
    /// A zero dimension is derived from the source aspect ratio; when both are
    /// zero the image is returned at its source size.
    pub fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let Some((target_width, target_height)) =
            target_dimensions(image.width(), image.height(), width, height)
        else {
            return image.clone();
        };

        debug!(
            "Resizing {}x{} -> {}x{} using {:?}",
            image.width(),
            image.height(),
            target_width,
            target_height,
            self.filter
        );

        image.resize_exact(target_width, target_height, self.filter.into())
    }
}

/// Calculate final dimensions for a requested `width` x `height`.
///
/// Returns `None` when both requested dimensions are zero.
pub fn target_dimensions(
    original_width: u32,
    original_height: u32,
    width: u32,
    height: u32,
) -> Option<(u32, u32)> {
    match (width, height) {
        (0, 0) => None,
        (0, height) => {
            let aspect_ratio = original_width as f64 / original_height.max(1) as f64;
            let width = (height as f64 * aspect_ratio).round() as u32;
            Some((width.max(1), height))
        }
        (width, 0) => {
            let aspect_ratio = original_height as f64 / original_width.max(1) as f64;
            let height = (width as f64 * aspect_ratio).round() as u32;
            Some((width, height.max(1)))
        }
        (width, height) => Some((width, height)),
    }
}
