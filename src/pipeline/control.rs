//! The capturing/paused flag pair shared between the UI and the worker.
//!
//! This is the only mutable state that crosses the thread boundary. The UI
//! writes it to request transitions; the worker reads it at its
//! cancellation points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RunControl {
    capturing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the flags for a new run.
    pub fn begin(&self) {
        self.paused.store(false, Ordering::Relaxed);
        self.capturing.store(true, Ordering::Relaxed);
    }

    /// Requests cooperative cancellation. Takes effect at the worker's next
    /// check, never mid-capture or mid-write.
    pub fn request_stop(&self) {
        self.capturing.store(false, Ordering::Relaxed);
    }

    /// Clears both flags once the worker is done.
    pub fn finish(&self) {
        self.capturing.store(false, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }

    /// Blocks while paused, polling every `poll`.
    ///
    /// Returns false if the run was cancelled, either before or during the
    /// pause.
    pub fn wait_while_paused(&self, poll: Duration) -> bool {
        while self.is_paused() {
            if !self.is_capturing() {
                return false;
            }
            thread::sleep(poll);
        }
        self.is_capturing()
    }
}
