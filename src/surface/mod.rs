//! Progress/control surface: what a front-end needs to drive a run.
//!
//! `Controller` takes operator commands, `Snapshot` turns the worker's
//! events into something to render. Neither knows how it is displayed.

mod controller;
mod snapshot;

pub use controller::{ControlError, Controller, RunRequest, RunState, DEFAULT_STOP_TIMEOUT};
pub use snapshot::{Snapshot, Status, MAX_LOG_LINES};
