//! Run controller: the command side of the progress/control surface.
//!
//! Lives on the UI thread. It validates operator commands against the
//! current run state, owns the worker handle, and flips the shared flags.
//! It learns about the worker's progress only from the events the UI
//! drains and passes to `observe`.

use crate::capture::ScreenSource;
use crate::config::AppConfig;
use crate::keyboard::{KeyInjector, PageKey};
use crate::pipeline::{
    spawn_run, Event, EventSender, PipelineOptions, RunControl, RunHandle, Stage, StageStatus,
};
use crate::privilege;
use crate::selector::{RegionSelector, SelectionError};
use crate::session::{CaptureSession, SessionError};
use std::path::PathBuf;
use std::time::Duration;

/// How long `stop` waits for the worker before giving up on it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingRegion,
    Capturing,
    Paused,
    Assembling,
    Completed,
    Cancelled,
}

impl RunState {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            RunState::AwaitingRegion | RunState::Capturing | RunState::Paused | RunState::Assembling
        )
    }
}

/// What the operator configured for the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub total_pages: u32,
    pub page_key: PageKey,
    pub output_root: PathBuf,
}

impl From<&AppConfig> for RunRequest {
    fn from(config: &AppConfig) -> Self {
        Self {
            total_pages: config.total_pages,
            page_key: config.page_key,
            output_root: config.output_root.clone(),
        }
    }
}

pub struct Controller {
    state: RunState,
    /// State a paused run returns to on resume.
    resume_to: RunState,
    control: RunControl,
    events: EventSender,
    options: PipelineOptions,
    worker: Option<RunHandle>,
    /// Terminal events still in flight from runs already stopped or
    /// abandoned. They are skipped by `observe`.
    stale_terminals: usize,
    stop_timeout: Duration,
    privilege_check: fn() -> bool,
}

impl Controller {
    pub fn new(events: EventSender, options: PipelineOptions) -> Self {
        Self {
            state: RunState::Idle,
            resume_to: RunState::Capturing,
            control: RunControl::new(),
            events,
            options,
            worker: None,
            stale_terminals: 0,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            privilege_check: privilege::is_elevated,
        }
    }

    /// Replaces the elevated-privilege check.
    pub fn with_privilege_check(mut self, check: fn() -> bool) -> Self {
        self.privilege_check = check;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Read-only view of the current run's flags, for rendering.
    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Starts a run: privilege check, region selection, then the worker.
    ///
    /// Selection happens synchronously on the calling thread. Every failure
    /// before the worker is spawned leaves the controller idle. A worker
    /// that outlived its `stop` blocks new runs until it has exited.
    pub fn start<R, S, K>(
        &mut self,
        request: &RunRequest,
        selector: &mut R,
        screen: S,
        keys: K,
    ) -> Result<(), ControlError>
    where
        R: RegionSelector + ?Sized,
        S: ScreenSource + Send + 'static,
        K: KeyInjector + Send + 'static,
    {
        if self.state.is_running() {
            log::warn!("Start ignored: run already in progress ({:?})", self.state);
            return Err(ControlError::AlreadyRunning);
        }
        if !self.previous_worker_exited() {
            log::warn!("Start refused: previous worker has not exited yet");
            return Err(ControlError::StillStopping);
        }

        if !(self.privilege_check)() {
            log::warn!("Start refused: process is not elevated");
            self.events.log(privilege::ELEVATION_REQUIRED);
            return Err(ControlError::NotElevated);
        }

        self.events.log("Starting process...");
        self.events.stage(Stage::Settings, StageStatus::Completed);

        self.state = RunState::AwaitingRegion;
        self.events.log("Selecting crop area...");
        self.events.stage(Stage::SelectArea, StageStatus::Active);

        let rect = match selector.select() {
            Ok(Some(rect)) => rect,
            Ok(None) => {
                self.events.log("Crop area selection cancelled.");
                self.abandon(Event::Stopped);
                return Err(ControlError::NoSelection);
            }
            Err(e) => {
                log::error!("{}", e);
                self.events.log(e.to_string());
                self.abandon(Event::Failed {
                    message: e.to_string(),
                });
                return Err(ControlError::Selection(e));
            }
        };

        self.events.log(format!("Crop area selected: {}", rect));
        self.events.stage(Stage::SelectArea, StageStatus::Completed);

        let session = match CaptureSession::new(
            request.total_pages,
            request.page_key,
            request.output_root.clone(),
            rect,
        ) {
            Ok(session) => session,
            Err(e) => {
                self.events.log(e.to_string());
                self.abandon(Event::Failed {
                    message: e.to_string(),
                });
                return Err(ControlError::Session(e));
            }
        };

        self.events.log("Starting automatic capture...");
        // Each run gets its own flags, out of reach of earlier workers.
        self.control = RunControl::new();
        self.control.begin();
        match spawn_run(
            session,
            screen,
            keys,
            self.control.clone(),
            self.events.clone(),
            self.options.clone(),
        ) {
            Ok(handle) => {
                self.worker = Some(handle);
                self.state = RunState::Capturing;
                self.resume_to = RunState::Capturing;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to spawn worker: {}", e);
                self.abandon(Event::Failed {
                    message: e.to_string(),
                });
                Err(ControlError::Spawn(e))
            }
        }
    }

    /// Toggles pause. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> Result<bool, ControlError> {
        let paused = self.state != RunState::Paused;
        self.set_paused(paused, "pause")?;
        Ok(paused)
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        self.set_paused(true, "pause")
    }

    pub fn resume(&mut self) -> Result<(), ControlError> {
        self.set_paused(false, "resume")
    }

    fn set_paused(&mut self, paused: bool, command: &'static str) -> Result<(), ControlError> {
        let active = matches!(
            self.state,
            RunState::Capturing | RunState::Assembling | RunState::Paused
        );
        if !active || !self.control.is_capturing() {
            return Err(ControlError::InvalidCommand {
                command,
                state: self.state,
            });
        }

        self.control.set_paused(paused);
        if paused && self.state != RunState::Paused {
            self.resume_to = self.state;
            self.state = RunState::Paused;
        } else if !paused && self.state == RunState::Paused {
            self.state = self.resume_to;
        }
        self.events.send(Event::Paused(paused));
        self.events.log(if paused {
            "Process paused."
        } else {
            "Process resumed."
        });
        Ok(())
    }

    /// Requests cancellation and waits up to the stop timeout for the
    /// worker to exit. The controller is no longer running afterwards,
    /// whether or not the worker made the deadline; a late worker keeps
    /// its handle here until it exits.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        if !self.state.is_running() {
            return Err(ControlError::InvalidCommand {
                command: "stop",
                state: self.state,
            });
        }

        self.events.log("Process stopping...");
        self.cancel_run();
        Ok(())
    }

    /// Called before the host exits. Stops an active run and reports
    /// whether the worker exited within the timeout.
    pub fn shutdown(&mut self) -> bool {
        if self.state.is_running() {
            self.cancel_run();
        }
        self.previous_worker_exited()
    }

    /// Feeds a drained event back into the run state.
    pub fn observe(&mut self, event: &Event) {
        if self.stale_terminals > 0 {
            if event.is_terminal() {
                self.stale_terminals -= 1;
            }
            return;
        }

        match event {
            Event::Stage {
                stage: Stage::CreatePdf,
                status: StageStatus::Active,
            } => match self.state {
                RunState::Capturing => self.state = RunState::Assembling,
                RunState::Paused => self.resume_to = RunState::Assembling,
                _ => {}
            },
            Event::Finished { .. } => {
                self.state = RunState::Completed;
                self.reap_worker();
            }
            Event::Stopped => {
                if self.state.is_running() {
                    self.state = RunState::Cancelled;
                }
                self.reap_worker();
            }
            Event::Failed { .. } => {
                self.state = RunState::Idle;
                self.reap_worker();
            }
            _ => {}
        }
    }

    fn cancel_run(&mut self) {
        self.control.request_stop();
        if let Some(worker) = &self.worker {
            if !worker.wait_timeout(self.stop_timeout) {
                log::warn!(
                    "Worker did not exit within {}ms; new runs wait for it",
                    self.stop_timeout.as_millis()
                );
            }
        }
        self.previous_worker_exited();
        self.control.finish();
        // The worker always reports one terminal event; it belongs to
        // this cancelled run.
        self.stale_terminals += 1;
        self.state = RunState::Cancelled;
    }

    fn abandon(&mut self, terminal: Event) {
        self.control.finish();
        self.state = RunState::Idle;
        self.stale_terminals += 1;
        self.events.send(terminal);
    }

    /// Joins the worker if it has exited. False while it is still running.
    fn previous_worker_exited(&mut self) -> bool {
        match &self.worker {
            Some(worker) if !worker.is_finished() => false,
            Some(_) => {
                if let Some(worker) = self.worker.take() {
                    worker.join();
                }
                true
            }
            None => true,
        }
    }

    fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join_timeout(self.stop_timeout);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{}", privilege::ELEVATION_REQUIRED)]
    NotElevated,

    #[error("A capture process is already running")]
    AlreadyRunning,

    #[error("The previous capture is still stopping, try again shortly")]
    StillStopping,

    #[error("'{command}' is not available while {state:?}")]
    InvalidCommand {
        command: &'static str,
        state: RunState,
    },

    #[error("Crop area selection cancelled")]
    NoSelection,

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to start capture worker: {0}")]
    Spawn(std::io::Error),
}
