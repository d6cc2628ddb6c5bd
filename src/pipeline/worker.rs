//! Background worker thread for one run.

use super::{run_pipeline, EventSender, PipelineOptions, RunControl, RunOutcome};
use crate::capture::ScreenSource;
use crate::keyboard::KeyInjector;
use crate::session::CaptureSession;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL: Duration = Duration::from_millis(10);

/// Spawns the worker. `control` must already be armed with `begin()`.
pub fn spawn_run<S, K>(
    session: CaptureSession,
    mut screen: S,
    mut keys: K,
    control: RunControl,
    events: EventSender,
    options: PipelineOptions,
) -> std::io::Result<RunHandle>
where
    S: ScreenSource + Send + 'static,
    K: KeyInjector + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("super-capt-worker".into())
        .spawn(move || {
            log::info!(
                "Worker started: {} pages, key {}, area {}",
                session.total_pages(),
                session.page_key(),
                session.crop_rect()
            );
            let outcome = run_pipeline(&session, &mut screen, &mut keys, &control, &events, &options);
            log::info!("Worker finished: {:?}", outcome);
            outcome
        })?;

    Ok(RunHandle { handle })
}

/// Owner's handle on the running worker.
#[derive(Debug)]
pub struct RunHandle {
    handle: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker. `None` if it panicked.
    pub fn join(self) -> Option<RunOutcome> {
        match self.handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                log::error!("Worker thread panicked");
                None
            }
        }
    }

    /// Polls until the worker has exited or `timeout` passes. Returns
    /// whether it exited.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        true
    }

    /// Waits at most `timeout` for the worker to exit.
    ///
    /// A worker still running at the deadline is detached and `None` is
    /// returned; it will exit at its next cancellation point.
    pub fn join_timeout(self, timeout: Duration) -> Option<RunOutcome> {
        if !self.wait_timeout(timeout) {
            log::warn!(
                "Worker did not exit within {}ms, detaching",
                timeout.as_millis()
            );
            return None;
        }
        self.join()
    }
}
