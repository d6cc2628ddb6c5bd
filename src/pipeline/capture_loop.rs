//! Page capture loop: screenshot, persist, advance and settle, once per page.

use super::{EventSender, PipelineError, PipelineOptions, RunControl};
use crate::capture::ScreenSource;
use crate::keyboard::KeyInjector;
use crate::session::CaptureSession;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Every page was captured.
    Completed,
    /// The operator stopped the run after `captured` pages.
    Stopped { captured: u32 },
}

/// Capture owns the 0-50% band of the progress bar.
pub fn capture_progress(page: u32, total: u32) -> u8 {
    (u64::from(page) * 50 / u64::from(total.max(1))) as u8
}

/// Captures every page of `session` into its capture directory.
///
/// Cancellation is checked once per page, before the pause wait. A
/// cancelled run returns `Stopped` with exactly the pages written so far.
/// Any capture, keystroke or write failure aborts the loop.
pub fn capture_pages<S, K>(
    session: &CaptureSession,
    screen: &mut S,
    keys: &mut K,
    control: &RunControl,
    events: &EventSender,
    options: &PipelineOptions,
) -> Result<CaptureOutcome, PipelineError>
where
    S: ScreenSource + ?Sized,
    K: KeyInjector + ?Sized,
{
    let capture_dir = session.capture_dir();
    create_fresh_dir(&capture_dir)?;
    events.log(format!("Capture folder created: {}", capture_dir.display()));
    log::info!("Capture folder: {}", capture_dir.display());

    if !options.countdown.is_zero() {
        events.log(format!(
            "Please click on the document window to focus it. Capture will start in {} seconds...",
            options.countdown.as_secs()
        ));
        if !countdown(control, options.countdown, options.pause_poll) {
            events.log("Capture stopped by user.");
            log::info!("Capture stopped during countdown");
            return Ok(CaptureOutcome::Stopped { captured: 0 });
        }
    }

    let total = session.total_pages();

    for page in 1..=total {
        if !control.is_capturing() || !control.wait_while_paused(options.pause_poll) {
            events.log("Capture stopped by user.");
            log::info!("Capture stopped after {} of {} pages", page - 1, total);
            return Ok(CaptureOutcome::Stopped { captured: page - 1 });
        }

        events.log(format!("Capturing page {}/{}...", page, total));

        let screenshot = screen.capture()?;
        let path = session.page_path(page);
        screenshot
            .save(&path)
            .map_err(|source| PipelineError::SaveImage {
                path: path.clone(),
                source,
            })?;
        log::debug!("Saved {}", path.display());

        events.page_captured(page, total);
        events.progress(
            capture_progress(page, total),
            format!("Captured: {}/{}", page, total),
        );

        if page < total {
            keys.press(session.page_key())?;
            thread::sleep(options.settle_delay);
        }
    }

    events.log("Capture phase complete.");
    log::info!("Captured {} pages", total);
    Ok(CaptureOutcome::Completed)
}

/// Creates `dir`, refusing one that already exists so two runs never
/// share a capture folder.
fn create_fresh_dir(dir: &Path) -> Result<(), PipelineError> {
    let create_err = |source| PipelineError::CreateDir {
        path: dir.to_path_buf(),
        source,
    };
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(create_err)?;
    }
    fs::create_dir(dir).map_err(create_err)
}

/// Sleeps `total` in `slice` steps. Returns false as soon as the run is
/// cancelled.
fn countdown(control: &RunControl, total: Duration, slice: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !control.is_capturing() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, CropRect};
    use crate::keyboard::{KeyError, PageKey};
    use crate::pipeline::events;
    use image::{DynamicImage, RgbaImage};

    struct Blank;

    impl ScreenSource for Blank {
        fn capture(&mut self) -> Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(16, 16)))
        }
    }

    struct NoKeys;

    impl KeyInjector for NoKeys {
        fn press(&mut self, _key: PageKey) -> Result<(), KeyError> {
            Ok(())
        }
    }

    fn session_in(root: &Path) -> CaptureSession {
        CaptureSession::with_timestamp(
            3,
            PageKey::PageDown,
            root,
            CropRect::new(0, 0, 8, 8),
            "20240101_000000_000",
        )
        .unwrap()
    }

    fn options(countdown: Duration) -> PipelineOptions {
        PipelineOptions {
            countdown,
            settle_delay: Duration::from_millis(1),
            pause_poll: Duration::from_millis(5),
            dpi: 72.0,
        }
    }

    #[test]
    fn stop_during_countdown_returns_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let control = RunControl::new();
        control.begin();
        let (tx, _rx) = events::channel();

        let stopper = control.clone();
        let stop_thread = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.request_stop();
        });

        let start = Instant::now();
        let outcome = capture_pages(
            &session,
            &mut Blank,
            &mut NoKeys,
            &control,
            &tx,
            &options(Duration::from_secs(5)),
        )
        .unwrap();
        stop_thread.join().unwrap();

        assert_eq!(outcome, CaptureOutcome::Stopped { captured: 0 });
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(fs::read_dir(session.capture_dir()).unwrap().count(), 0);
    }

    #[test]
    fn existing_capture_folder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        fs::create_dir_all(session.capture_dir()).unwrap();
        let control = RunControl::new();
        control.begin();
        let (tx, _rx) = events::channel();

        let err = capture_pages(
            &session,
            &mut Blank,
            &mut NoKeys,
            &control,
            &tx,
            &options(Duration::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::CreateDir { ref path, .. } if *path == session.capture_dir()));
    }

    #[test]
    fn progress_fills_first_half() {
        assert_eq!(capture_progress(1, 3), 16);
        assert_eq!(capture_progress(2, 3), 33);
        assert_eq!(capture_progress(3, 3), 50);
        assert_eq!(capture_progress(1, 200), 0);
        assert_eq!(capture_progress(9999, 9999), 50);
    }
}
