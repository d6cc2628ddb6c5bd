//! Crop & assemble: cut every captured page down to the selection, then
//! stitch the results into one PDF.

use super::{pdf, EventSender, PipelineError, RunControl};
use crate::capture::crop_page;
use crate::session::CaptureSession;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropOutcome {
    /// Cropped images in page order.
    Cropped(Vec<PathBuf>),
    /// The operator stopped the run after `cropped` images.
    Stopped { cropped: usize },
}

/// Cropping owns the 50-90% band of the progress bar.
pub fn crop_progress(done: usize, total: usize) -> u8 {
    (50 + done * 40 / total.max(1)) as u8
}

/// Crops pages `1..=total` of `session` into its cropped directory,
/// keeping file names.
///
/// Only the session's own page files are read, in page order. Cancellation
/// and pause are honoured before each image. An empty result is fatal.
pub fn crop_pages(
    session: &CaptureSession,
    control: &RunControl,
    events: &EventSender,
    pause_poll: Duration,
) -> Result<CropOutcome, PipelineError> {
    let cropped_dir = session.cropped_dir();
    fs::create_dir_all(&cropped_dir).map_err(|source| PipelineError::CreateDir {
        path: cropped_dir.clone(),
        source,
    })?;

    let total = session.total_pages() as usize;
    let rect = session.crop_rect();
    log::info!("Cropping {} pages to {}", total, rect);

    let mut cropped = Vec::with_capacity(total);
    for page in 1..=session.total_pages() {
        let done = cropped.len();
        if !control.is_capturing() || !control.wait_while_paused(pause_poll) {
            events.log("Process stopped during cropping.");
            log::info!("Cropping stopped after {} of {} pages", done, total);
            return Ok(CropOutcome::Stopped { cropped: done });
        }

        let source = session.page_path(page);
        let image = image::open(&source).map_err(|e| PipelineError::OpenImage {
            path: source.clone(),
            source: e,
        })?;
        let page_image = crop_page(&image, rect).map_err(|e| PipelineError::Crop {
            path: source.clone(),
            source: e,
        })?;

        let target = cropped_dir.join(session.page_file_name(page));
        page_image.save(&target).map_err(|e| PipelineError::SaveImage {
            path: target.clone(),
            source: e,
        })?;
        cropped.push(target);

        let done = cropped.len();
        events.progress(
            crop_progress(done, total),
            format!("Cropping: {}/{}", done, total),
        );
    }

    if cropped.is_empty() {
        return Err(PipelineError::NoImages);
    }
    Ok(CropOutcome::Cropped(cropped))
}

/// Writes the session PDF from `cropped`, in the given order.
pub fn assemble_pdf(
    session: &CaptureSession,
    cropped: &[PathBuf],
    events: &EventSender,
    dpi: f32,
) -> Result<PathBuf, PipelineError> {
    events.progress(95, "Creating PDF...");

    let pdf_path = session.pdf_path();
    pdf::write_pdf(cropped, &pdf_path, dpi)?;

    events.log(format!("PDF created successfully: {}", pdf_path.display()));
    events.progress(100, "Complete!");
    Ok(pdf_path)
}
