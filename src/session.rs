//! Capture session: everything fixed for the duration of one run.
//!
//! A session can only be built once the region selector has produced a
//! non-empty rectangle, so the crop stage never sees a missing selection.

use crate::capture::CropRect;
use crate::keyboard::PageKey;
use std::path::{Path, PathBuf};

/// Prefix of the final PDF file name.
pub const PRODUCT_NAME: &str = "SUPER_CAPT";

/// Minimum zero-padding of page file names.
const MIN_PAGE_DIGITS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    total_pages: u32,
    page_key: PageKey,
    output_root: PathBuf,
    crop_rect: CropRect,
    timestamp: String,
}

impl CaptureSession {
    /// Builds a session stamped with the current local time.
    pub fn new(
        total_pages: u32,
        page_key: PageKey,
        output_root: impl Into<PathBuf>,
        crop_rect: CropRect,
    ) -> Result<Self, SessionError> {
        Self::with_timestamp(total_pages, page_key, output_root, crop_rect, new_timestamp())
    }

    pub fn with_timestamp(
        total_pages: u32,
        page_key: PageKey,
        output_root: impl Into<PathBuf>,
        crop_rect: CropRect,
        timestamp: impl Into<String>,
    ) -> Result<Self, SessionError> {
        if total_pages == 0 {
            return Err(SessionError::NoPages);
        }
        if crop_rect.is_empty() {
            return Err(SessionError::EmptyRegion(crop_rect));
        }
        Ok(Self {
            total_pages,
            page_key,
            output_root: output_root.into(),
            crop_rect,
            timestamp: timestamp.into(),
        })
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn page_key(&self) -> PageKey {
        self.page_key
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn crop_rect(&self) -> CropRect {
        self.crop_rect
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.output_root
            .join(format!("captured_pages_{}", self.timestamp))
    }

    pub fn cropped_dir(&self) -> PathBuf {
        self.output_root
            .join(format!("cropped_pages_{}", self.timestamp))
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.output_root
            .join(format!("{}_{}.pdf", PRODUCT_NAME, self.timestamp))
    }

    /// `page_0001.png`, widened when the total needs more digits.
    pub fn page_file_name(&self, page: u32) -> String {
        let width = page_digits(self.total_pages);
        format!("page_{:0width$}.png", page, width = width)
    }

    pub fn page_path(&self, page: u32) -> PathBuf {
        self.capture_dir().join(self.page_file_name(page))
    }
}

/// Session timestamp: local time, `YYYYmmdd_HHMMSS_mmm`.
///
/// Milliseconds keep back-to-back runs in separate folders.
pub fn new_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

fn page_digits(total: u32) -> usize {
    total.to_string().len().max(MIN_PAGE_DIGITS)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Total page count must be at least 1")]
    NoPages,

    #[error("Crop area {0} is empty")]
    EmptyRegion(CropRect),
}
