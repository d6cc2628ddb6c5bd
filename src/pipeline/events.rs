//! Worker → UI event stream.
//!
//! The worker never touches UI state. Everything the front-end renders
//! arrives here, in order, over a single channel.

use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;

/// The five operator-visible steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Settings,
    SelectArea,
    Capture,
    CreatePdf,
    Complete,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Settings,
        Stage::SelectArea,
        Stage::Capture,
        Stage::CreatePdf,
        Stage::Complete,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Settings => "1. Settings",
            Stage::SelectArea => "2. Select Area",
            Stage::Capture => "3. Capture",
            Stage::CreatePdf => "4. Create PDF",
            Stage::Complete => "5. Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Log(String),
    Progress { percent: u8, label: String },
    Stage { stage: Stage, status: StageStatus },
    PageCaptured { page: u32, total: u32 },
    Paused(bool),
    Finished { pdf_path: PathBuf },
    Stopped,
    Failed { message: String },
}

impl Event {
    /// Terminal events end a run; nothing follows them until the next start.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::Finished { .. } | Event::Stopped | Event::Failed { .. }
        )
    }
}

/// Creates the run's event channel.
pub fn channel() -> (EventSender, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSender { tx }, rx)
}

/// Zero-capacity channel: every send blocks until the receiver takes it.
#[cfg(test)]
pub(crate) fn rendezvous() -> (EventSender, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (EventSender { tx }, rx)
}

/// Sending half of the event channel.
///
/// Sends never fail from the caller's point of view: if the UI has gone
/// away there is nobody left to tell.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(Event::Log(message.into()));
    }

    pub fn progress(&self, percent: u8, label: impl Into<String>) {
        self.send(Event::Progress {
            percent: percent.min(100),
            label: label.into(),
        });
    }

    pub fn stage(&self, stage: Stage, status: StageStatus) {
        self.send(Event::Stage { stage, status });
    }

    pub fn page_captured(&self, page: u32, total: u32) {
        self.send(Event::PageCaptured { page, total });
    }
}
