//! Pure region cropping logic: functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data out.

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pixel-space rectangle on the captured screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersects the rectangle with an image of the given size.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn intersect(&self, img_width: u32, img_height: u32) -> Option<CropRect> {
        if self.x >= img_width || self.y >= img_height {
            return None;
        }
        let width = self.width.min(img_width - self.x);
        let height = self.height.min(img_height - self.y);
        let rect = CropRect::new(self.x, self.y, width, height);
        (!rect.is_empty()).then_some(rect)
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.width, self.height)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for CropRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid rectangle '{}': {}", s, e))?;

        match parts.as_slice() {
            [x, y, w, h] => Ok(CropRect::new(*x, *y, *w, *h)),
            _ => Err(format!(
                "Invalid rectangle '{}': expected x,y,width,height",
                s
            )),
        }
    }
}

/// Crops a page screenshot to `rect` and flattens it to RGB.
///
/// The rectangle is intersected with the image's own bounds first, so a
/// selection that runs past the right or bottom edge is trimmed rather than
/// rejected. The result has no alpha channel, ready for page embedding.
pub fn crop_page(image: &DynamicImage, rect: CropRect) -> Result<RgbImage, CropError> {
    if rect.is_empty() {
        return Err(CropError::ZeroDimension);
    }

    let (img_width, img_height) = (image.width(), image.height());

    let visible = rect
        .intersect(img_width, img_height)
        .ok_or(CropError::OutOfBounds {
            requested: rect,
            image_size: (img_width, img_height),
        })?;

    let cropped = image.crop_imm(visible.x, visible.y, visible.width, visible.height);

    Ok(cropped.to_rgb8())
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle {} lies outside image bounds ({}x{})",
        requested, image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: CropRect,
        image_size: (u32, u32),
    },
}
