//! Capture pipeline: public API.
//!
//! One run is: capture every page, crop every capture, write the PDF.
//! It executes on a single background worker and talks to the UI only
//! through `EventSender` and `RunControl`.

mod assemble;
mod capture_loop;
mod control;
pub mod events;
mod pdf;
mod worker;

pub use assemble::{assemble_pdf, crop_pages, crop_progress, CropOutcome};
pub use capture_loop::{capture_pages, capture_progress, CaptureOutcome};
pub use control::RunControl;
pub use events::{Event, EventSender, Stage, StageStatus};
pub use pdf::{page_size_points, write_pdf, PdfError};
pub use worker::{spawn_run, RunHandle};

use crate::capture::{CaptureError, CropError, ScreenSource};
use crate::keyboard::{KeyError, KeyInjector};
use crate::session::CaptureSession;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed delays and output resolution for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Wait before the first capture.
    pub countdown: Duration,
    /// Wait after each page-advance keystroke. Not adaptive.
    pub settle_delay: Duration,
    /// How often a paused worker checks whether it may continue.
    pub pause_poll: Duration,
    pub dpi: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(3),
            settle_delay: Duration::from_millis(1500),
            pause_poll: Duration::from_millis(100),
            dpi: 150.0,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished { pdf_path: PathBuf },
    Stopped,
    Failed { message: String },
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Capture,
    Assemble,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Capture => f.write_str("capture"),
            Phase::Assemble => f.write_str("PDF creation"),
        }
    }
}

/// Runs capture then crop & assemble, reporting everything through
/// `events` and finishing with exactly one terminal event.
///
/// The flags in `control` are cleared on the way out, whatever the outcome.
pub fn run_pipeline<S, K>(
    session: &CaptureSession,
    screen: &mut S,
    keys: &mut K,
    control: &RunControl,
    events: &EventSender,
    options: &PipelineOptions,
) -> RunOutcome
where
    S: ScreenSource + ?Sized,
    K: KeyInjector + ?Sized,
{
    let outcome = match execute(session, screen, keys, control, events, options) {
        Ok(Some(pdf_path)) => {
            events.stage(Stage::Complete, StageStatus::Completed);
            events.send(Event::Finished {
                pdf_path: pdf_path.clone(),
            });
            RunOutcome::Finished { pdf_path }
        }
        Ok(None) => {
            events.send(Event::Stopped);
            RunOutcome::Stopped
        }
        Err((phase, e)) => {
            log::error!("Error during {}: {}", phase, e);
            events.log(format!("Error during {}: {}", phase, e));
            let message = e.to_string();
            events.send(Event::Failed {
                message: message.clone(),
            });
            RunOutcome::Failed { message }
        }
    };

    control.finish();
    outcome
}

/// `Ok(None)` means the operator stopped the run.
fn execute<S, K>(
    session: &CaptureSession,
    screen: &mut S,
    keys: &mut K,
    control: &RunControl,
    events: &EventSender,
    options: &PipelineOptions,
) -> Result<Option<PathBuf>, (Phase, PipelineError)>
where
    S: ScreenSource + ?Sized,
    K: KeyInjector + ?Sized,
{
    events.stage(Stage::Capture, StageStatus::Active);
    let captured = capture_pages(session, screen, keys, control, events, options)
        .map_err(|e| (Phase::Capture, e))?;
    if captured != CaptureOutcome::Completed || !control.is_capturing() {
        return Ok(None);
    }
    events.stage(Stage::Capture, StageStatus::Completed);

    events.log("Cropping and creating PDF...");
    events.stage(Stage::CreatePdf, StageStatus::Active);
    let cropped = match crop_pages(session, control, events, options.pause_poll)
        .map_err(|e| (Phase::Assemble, e))?
    {
        CropOutcome::Cropped(paths) => paths,
        CropOutcome::Stopped { .. } => return Ok(None),
    };

    events.log("Cropping complete. Creating PDF...");
    let pdf_path = assemble_pdf(session, &cropped, events, options.dpi)
        .map_err(|e| (Phase::Assemble, e))?;
    events.stage(Stage::CreatePdf, StageStatus::Completed);

    Ok(Some(pdf_path))
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Failed to create folder {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open {}: {source}", path.display())]
    OpenImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to save {}: {source}", path.display())]
    SaveImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to crop {}: {source}", path.display())]
    Crop { path: PathBuf, source: CropError },

    #[error("No cropped images found to create PDF")]
    NoImages,

    #[error(transparent)]
    Pdf(#[from] PdfError),
}
