//! Screen capture domain: public API.
//!
//! This module owns screenshot acquisition and page cropping.
//! External code should only use the items exported here.

mod region;
mod screenshot;

pub use region::{crop_page, CropError, CropRect};
pub use screenshot::{capture_primary_monitor, CaptureError, PrimaryMonitor};

use image::DynamicImage;

/// Source of full-screen screenshots.
///
/// The pipeline only ever talks to this trait; `PrimaryMonitor` is the real
/// implementation and tests substitute an in-memory one.
pub trait ScreenSource {
    fn capture(&mut self) -> Result<DynamicImage, CaptureError>;
}

impl<S: ScreenSource + ?Sized> ScreenSource for Box<S> {
    fn capture(&mut self) -> Result<DynamicImage, CaptureError> {
        (**self).capture()
    }
}
