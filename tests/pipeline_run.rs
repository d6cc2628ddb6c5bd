//! End-to-end runs of the pipeline against an in-memory viewer.

mod common;

use common::{file_names, marker, pdf_page_markers, pdf_page_size, quick_options, Viewer};
use crossbeam_channel::Receiver;
use lopdf::Document;
use std::time::Duration;
use super_capt_lib::capture::{CaptureError, CropRect, ScreenSource};
use super_capt_lib::keyboard::PageKey;
use super_capt_lib::pipeline::{
    events, run_pipeline, spawn_run, Event, RunControl, RunOutcome, Stage, StageStatus,
};
use super_capt_lib::session::CaptureSession;

fn new_session(root: &std::path::Path, pages: u32, rect: CropRect) -> CaptureSession {
    CaptureSession::with_timestamp(pages, PageKey::PageDown, root, rect, "20240501_120000").unwrap()
}

fn wait_for_terminal(rx: &Receiver<Event>) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("no terminal event");
        let done = event.is_terminal();
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[test]
fn three_pages_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let rect = CropRect::new(10, 10, 200, 150);
    let session = new_session(dir.path(), 3, rect);
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let (tx, rx) = events::channel();

    let outcome = run_pipeline(
        &session,
        &mut viewer.screen(),
        &mut viewer.keyboard(),
        &control,
        &tx,
        &quick_options(),
    );

    let pdf_path = session.pdf_path();
    assert_eq!(outcome, RunOutcome::Finished { pdf_path: pdf_path.clone() });
    assert_eq!(
        pdf_path.file_name().unwrap().to_string_lossy(),
        "SUPER_CAPT_20240501_120000.pdf"
    );

    let expected = ["page_0001.png", "page_0002.png", "page_0003.png"];
    assert_eq!(file_names(&session.capture_dir()), expected);
    assert_eq!(file_names(&session.cropped_dir()), expected);
    // No key press after the last page.
    assert_eq!(viewer.presses(), 2);

    for name in expected {
        let cropped = image::open(session.cropped_dir().join(name)).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (200, 150));
    }

    let doc = Document::load(&pdf_path).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(pdf_page_size(&doc, 1), (200.0, 150.0));
    assert_eq!(pdf_page_markers(&doc), [marker(1), marker(2), marker(3)]);

    assert!(!control.is_capturing());
    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.contains(&Event::Stage {
        stage: Stage::Complete,
        status: StageStatus::Completed,
    }));
    assert!(events.contains(&Event::Progress {
        percent: 100,
        label: "Complete!".into(),
    }));
    assert!(events.contains(&Event::PageCaptured { page: 3, total: 3 }));
}

#[test]
fn progress_never_goes_backwards() {
    let dir = tempfile::tempdir().unwrap();
    let session = new_session(dir.path(), 4, CropRect::new(0, 0, 50, 50));
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let (tx, rx) = events::channel();

    run_pipeline(
        &session,
        &mut viewer.screen(),
        &mut viewer.keyboard(),
        &control,
        &tx,
        &quick_options(),
    );

    let percents: Vec<u8> = rx
        .try_iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(percents.last(), Some(&100));
}

#[test]
fn stop_after_second_page_keeps_two_captures() {
    let dir = tempfile::tempdir().unwrap();
    let session = new_session(dir.path(), 5, CropRect::new(0, 0, 100, 100));
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let stopper = control.clone();
    let mut screen = viewer.screen().after_capture(move |page| {
        if page == 2 {
            stopper.request_stop();
        }
    });
    let (tx, rx) = events::channel();

    let outcome = run_pipeline(
        &session,
        &mut screen,
        &mut viewer.keyboard(),
        &control,
        &tx,
        &quick_options(),
    );

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(
        file_names(&session.capture_dir()),
        ["page_0001.png", "page_0002.png"]
    );
    assert!(!session.cropped_dir().exists());
    assert!(!session.pdf_path().exists());

    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(events.last(), Some(&Event::Stopped));
    assert!(events.contains(&Event::Log("Capture stopped by user.".into())));
}

struct FailsOnPage {
    inner: common::ViewerScreen,
    fail_at: u32,
    taken: u32,
}

impl ScreenSource for FailsOnPage {
    fn capture(&mut self) -> Result<image::DynamicImage, CaptureError> {
        self.taken += 1;
        if self.taken == self.fail_at {
            return Err(CaptureError::CaptureFailed("display went away".into()));
        }
        self.inner.capture()
    }
}

#[test]
fn capture_error_aborts_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let session = new_session(dir.path(), 4, CropRect::new(0, 0, 100, 100));
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let (tx, rx) = events::channel();
    let mut screen = FailsOnPage {
        inner: viewer.screen(),
        fail_at: 2,
        taken: 0,
    };

    let outcome = run_pipeline(
        &session,
        &mut screen,
        &mut viewer.keyboard(),
        &control,
        &tx,
        &quick_options(),
    );

    match outcome {
        RunOutcome::Failed { message } => assert!(message.contains("display went away")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(file_names(&session.capture_dir()), ["page_0001.png"]);
    assert!(!session.pdf_path().exists());
    assert!(!control.is_capturing());
    assert!(matches!(rx.try_iter().last(), Some(Event::Failed { .. })));
}

#[test]
fn pause_holds_the_worker_without_skipping_pages() {
    let dir = tempfile::tempdir().unwrap();
    let session = new_session(dir.path(), 5, CropRect::new(0, 0, 100, 100));
    let capture_dir = session.capture_dir();
    let cropped_dir = session.cropped_dir();
    let pdf_path = session.pdf_path();
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let (tx, rx) = events::channel();

    let handle = spawn_run(
        session,
        viewer.screen(),
        viewer.keyboard(),
        control.clone(),
        tx,
        quick_options(),
    )
    .unwrap();

    loop {
        let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        if let Event::PageCaptured { page: 2, .. } = event {
            control.set_paused(true);
            break;
        }
    }

    std::thread::sleep(Duration::from_millis(100));
    let held = file_names(&capture_dir).len();
    let presses = viewer.presses();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(file_names(&capture_dir).len(), held);
    assert_eq!(viewer.presses(), presses);
    assert!(held < 5);

    control.set_paused(false);
    let events = wait_for_terminal(&rx);
    assert!(matches!(events.last(), Some(Event::Finished { .. })));
    assert!(matches!(handle.join(), Some(RunOutcome::Finished { .. })));

    assert_eq!(file_names(&capture_dir).len(), 5);
    assert_eq!(file_names(&cropped_dir).len(), 5);
    let doc = Document::load(&pdf_path).unwrap();
    assert_eq!(
        pdf_page_markers(&doc),
        (1..=5).map(marker).collect::<Vec<_>>()
    );
}

#[test]
fn stop_while_paused_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let session = new_session(dir.path(), 10, CropRect::new(0, 0, 100, 100));
    let capture_dir = session.capture_dir();
    let cropped_dir = session.cropped_dir();
    let viewer = Viewer::new();
    let control = RunControl::new();
    control.begin();
    let pauser = control.clone();
    let screen = viewer.screen().after_capture(move |page| {
        if page == 1 {
            pauser.set_paused(true);
        }
    });
    let (tx, rx) = events::channel();

    let handle = spawn_run(session, screen, viewer.keyboard(), control.clone(), tx, quick_options())
        .unwrap();
    std::thread::sleep(Duration::from_millis(50));
    control.request_stop();

    let outcome = handle.join_timeout(Duration::from_secs(2));
    assert_eq!(outcome, Some(RunOutcome::Stopped));
    assert_eq!(wait_for_terminal(&rx).last(), Some(&Event::Stopped));
    assert_eq!(file_names(&capture_dir), ["page_0001.png"]);
    assert!(!cropped_dir.exists());
}
