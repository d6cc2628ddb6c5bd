//! UI-state reducer: folds pipeline events into immutable snapshots.
//!
//! Front-ends render a `Snapshot` and nothing else. Each event produces a
//! new snapshot; the previous one is left untouched.

use crate::pipeline::{Event, Stage, StageStatus};
use std::path::PathBuf;

/// Older log lines are dropped past this many.
pub const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Running,
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub status: Status,
    pub progress: u8,
    pub label: String,
    pub stages: [StageStatus; 5],
    pub log: Vec<String>,
    pub current_page: u32,
    pub total_pages: u32,
    pub paused: bool,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            status: Status::Ready,
            progress: 0,
            label: "Ready".to_string(),
            stages: [StageStatus::Pending; 5],
            log: Vec::new(),
            current_page: 0,
            total_pages: 0,
            paused: false,
            output: None,
            error: None,
        }
    }
}

impl Snapshot {
    pub fn stage(&self, stage: Stage) -> StageStatus {
        self.stages[stage.index()]
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Returns the snapshot that results from applying `event`.
    pub fn apply(&self, event: &Event) -> Snapshot {
        let mut next = self.clone();
        match event {
            Event::Log(line) => {
                next.log.push(line.clone());
                if next.log.len() > MAX_LOG_LINES {
                    let excess = next.log.len() - MAX_LOG_LINES;
                    next.log.drain(..excess);
                }
            }
            Event::Progress { percent, label } => {
                next.progress = *percent;
                next.label = label.clone();
            }
            Event::Stage { stage, status } => {
                next.stages = stages_at(*stage, *status);
                if *status == StageStatus::Active {
                    next.status = Status::Running;
                    next.output = None;
                    next.error = None;
                }
            }
            Event::PageCaptured { page, total } => {
                next.current_page = *page;
                next.total_pages = *total;
            }
            Event::Paused(paused) => next.paused = *paused,
            Event::Finished { pdf_path } => {
                next.status = Status::Completed;
                next.progress = 100;
                next.label = "Complete!".to_string();
                next.stages = [StageStatus::Completed; 5];
                next.paused = false;
                next.output = Some(pdf_path.clone());
            }
            Event::Stopped => {
                next.reset();
                next.status = Status::Stopped;
            }
            Event::Failed { message } => {
                next.reset();
                next.status = Status::Failed;
                next.error = Some(message.clone());
            }
        }
        next
    }

    fn reset(&mut self) {
        self.progress = 0;
        self.label = "Ready".to_string();
        self.stages = [StageStatus::Pending; 5];
        self.paused = false;
    }
}

/// Stages before `stage` are done, `stage` takes `status`, later ones wait.
fn stages_at(stage: Stage, status: StageStatus) -> [StageStatus; 5] {
    let mut stages = [StageStatus::Pending; 5];
    for (i, slot) in stages.iter_mut().enumerate() {
        *slot = match i.cmp(&stage.index()) {
            std::cmp::Ordering::Less => StageStatus::Completed,
            std::cmp::Ordering::Equal => status,
            std::cmp::Ordering::Greater => StageStatus::Pending,
        };
    }
    stages
}
