//! Terminal front-end.
//!
//! Collects settings from the command line and the saved config, asks for
//! the crop area over a live reference screenshot, then renders the run
//! while reading single-letter commands from stdin.

use crate::capture::{CaptureError, CropRect, PrimaryMonitor, ScreenSource};
use crate::config::{self, AppConfig, ConfigError};
use crate::keyboard::{EnigoKeyboard, PageKey};
use crate::pipeline::{events, Event, StageStatus};
use crate::selector::{select_on_reference, Drag, RegionSelector, SelectionError};
use crate::surface::{ControlError, Controller, RunRequest, Snapshot, Status};
use clap::Parser;
use crossbeam_channel::{select, Receiver};
use image::ImageFormat;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::thread;
use tempfile::NamedTempFile;

const PROGRESS_WIDTH: usize = 30;

const CHECKLIST: &str = "\
Before selecting the crop area, make sure that:
  1. The document is open on its FIRST page.
  2. The viewer window is maximized.
  3. Every other window is minimized.";

const COMMANDS_HELP: &str = "Commands: [p] pause/resume  [s] stop  [q] quit";

/// Automated page capture to PDF.
#[derive(Debug, Parser)]
#[command(name = "super-capt", version, about)]
pub struct Cli {
    /// Number of pages to capture (1-9999)
    #[arg(long)]
    pub pages: Option<u32>,

    /// Key that advances the viewer to the next page
    #[arg(long, value_enum)]
    pub key: Option<PageKey>,

    /// Folder that receives the capture folders and the PDF
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Crop area as x,y,w,h in screen pixels; skips the interactive prompt
    #[arg(long, value_name = "X,Y,W,H")]
    pub region: Option<CropRect>,

    /// Wait after each page turn, in milliseconds (at least 1000)
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Seconds to wait before the first capture
    #[arg(long)]
    pub countdown_secs: Option<u64>,

    /// Resolution recorded for PDF pages
    #[arg(long)]
    pub dpi: Option<f32>,

    /// Persist the resulting settings as the new defaults
    #[arg(long)]
    pub save_config: bool,

    /// Open the PDF when the run completes
    #[arg(long)]
    pub open: bool,

    /// Skip the pre-flight checklist prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Cli {
    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(pages) = self.pages {
            config.total_pages = pages;
        }
        if let Some(key) = self.key {
            config.page_key = key;
        }
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay_ms = ms;
        }
        if let Some(secs) = self.countdown_secs {
            config.countdown_secs = secs;
        }
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
    }
}

/// A line typed by the operator while a run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
    Quit,
    Yes,
    No,
}

pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" | "resume" => Some(Command::TogglePause),
        "s" | "stop" => Some(Command::Stop),
        "q" | "quit" => Some(Command::Quit),
        "y" | "yes" => Some(Command::Yes),
        "n" | "no" | "" => Some(Command::No),
        _ => None,
    }
}

enum Input {
    Event(Event),
    Command(Command),
    EventsClosed,
    CommandsClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Stop,
    Quit,
}

pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = width * percent.min(100) as usize / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(width - filled), percent)
}

/// Asks for the crop area over a freshly captured reference screenshot.
///
/// The screenshot lives in a temporary file that is removed once the
/// selection is made or cancelled.
pub struct ConsoleSelector<S> {
    screen: S,
    scratch_dir: PathBuf,
    preset: Option<CropRect>,
}

impl<S: ScreenSource> ConsoleSelector<S> {
    pub fn new(screen: S, preset: Option<CropRect>) -> Self {
        Self {
            screen,
            scratch_dir: std::env::temp_dir(),
            preset,
        }
    }

    /// Folder that holds the reference screenshot while selecting.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn save_reference(&mut self) -> Result<NamedTempFile, SelectionError> {
        let image = self
            .screen
            .capture()
            .map_err(|e: CaptureError| SelectionError::Reference(e.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("selection_reference_")
            .suffix(".png")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| {
                SelectionError::Reference(format!("{}: {}", self.scratch_dir.display(), e))
            })?;
        image
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|e| SelectionError::Reference(format!("{}: {}", file.path().display(), e)))?;
        log::debug!("Reference screenshot written to {}", file.path().display());
        Ok(file)
    }
}

impl<S: ScreenSource> RegionSelector for ConsoleSelector<S> {
    fn select(&mut self) -> Result<Option<CropRect>, SelectionError> {
        let reference = self.save_reference()?;
        let path = reference.path();
        let preset = self.preset;
        select_on_reference(path, |width, height| match preset {
            Some(rect) => Some(Drag::from_rect(rect)),
            None => {
                println!("Reference screenshot: {}", path.display());
                prompt_drag(width, height)
            }
        })
    }
}

/// Reads `x,y,w,h` from stdin until it parses. An empty line or EOF
/// cancels.
fn prompt_drag(width: u32, height: u32) -> Option<Drag> {
    let stdin = io::stdin();
    loop {
        print!(
            "Crop area as x,y,w,h (screen is {}x{}, empty line cancels): ",
            width, height
        );
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line.parse::<CropRect>() {
            Ok(rect) => return Some(Drag::from_rect(rect)),
            Err(e) => println!("  {}", e),
        }
    }
}

/// Blocks until the operator presses Enter. Returns false on `q` or EOF.
fn confirm_checklist() -> bool {
    println!("{}", CHECKLIST);
    print!("Press Enter to continue, or q to quit: ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => parse_command(&line) != Some(Command::Quit),
    }
}

fn spawn_command_reader() -> io::Result<Receiver<Command>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("super-capt-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => println!("{}", COMMANDS_HELP),
                }
            }
        })?;
    Ok(rx)
}

fn render(event: &Event, snapshot: &Snapshot) {
    match event {
        Event::Log(line) => {
            println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), line)
        }
        Event::Progress { percent, label } => {
            println!("{} {}", progress_bar(*percent, PROGRESS_WIDTH), label)
        }
        Event::Stage { stage, status } => {
            let status = match status {
                StageStatus::Pending => "pending",
                StageStatus::Active => "in progress",
                StageStatus::Completed => "done",
            };
            println!("== {} ({})", stage.label(), status);
        }
        Event::PageCaptured { .. } => {}
        Event::Paused(true) => println!("-- Paused. Press p to resume."),
        Event::Paused(false) => {}
        Event::Finished { pdf_path } => {
            println!("Process complete.");
            println!("PDF file: {}", pdf_path.display());
        }
        Event::Stopped => println!(
            "Stopped after {} of {} pages.",
            snapshot.current_page, snapshot.total_pages
        ),
        Event::Failed { message } => println!("Run failed: {}", message),
    }
}

/// Applies and renders everything already queued.
fn drain(rx: &Receiver<Event>, controller: &mut Controller, snapshot: &mut Snapshot) {
    for event in rx.try_iter() {
        controller.observe(&event);
        *snapshot = snapshot.apply(&event);
        render(&event, snapshot);
    }
}

fn print_settings(config: &AppConfig) {
    println!("SUPER CAPT");
    println!("  Pages:       {}", config.total_pages);
    println!("  Page key:    {}", config.page_key);
    println!("  Output:      {}", config.output_root.display());
    println!("  Page delay:  {}ms", config.settle_delay_ms);
}

/// Opens `path` with the platform's default handler.
pub fn open_path(path: &Path) -> Result<(), AppError> {
    let status = if cfg!(target_os = "macos") {
        Process::new("open").arg(path).status()
    } else if cfg!(target_os = "windows") {
        Process::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .status()
    } else {
        Process::new("xdg-open").arg(path).status()
    };

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(AppError::Open {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, format!("opener exited with {}", status)),
        }),
        Err(source) => Err(AppError::Open {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Runs one capture from the command line to a terminal event.
pub fn run_console(cli: Cli) -> Result<(), AppError> {
    let mut config = config::load_config();
    cli.apply(&mut config);
    config.validate()?;
    if cli.save_config {
        config::save_config(&config)?;
    }

    print_settings(&config);
    if !cli.yes && !confirm_checklist() {
        log::info!("Cancelled at checklist");
        return Ok(());
    }

    let (tx, rx) = events::channel();
    let mut controller = Controller::new(tx, config.pipeline_options());
    let mut snapshot = Snapshot::default();
    let mut selector = ConsoleSelector::new(PrimaryMonitor, cli.region);

    let started = controller.start(
        &RunRequest::from(&config),
        &mut selector,
        PrimaryMonitor,
        EnigoKeyboard,
    );
    drain(&rx, &mut controller, &mut snapshot);
    match started {
        Ok(()) => {}
        Err(ControlError::NoSelection) => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    println!("{}", COMMANDS_HELP);
    let mut commands = spawn_command_reader().map_err(AppError::Input)?;
    let mut pending: Option<Pending> = None;

    loop {
        let input = select! {
            recv(rx) -> event => event.map(Input::Event).unwrap_or(Input::EventsClosed),
            recv(commands) -> command => command.map(Input::Command).unwrap_or(Input::CommandsClosed),
        };

        let command = match input {
            Input::Event(event) => {
                controller.observe(&event);
                snapshot = snapshot.apply(&event);
                render(&event, &snapshot);
                if event.is_terminal() {
                    break;
                }
                continue;
            }
            Input::EventsClosed => break,
            Input::CommandsClosed => {
                // stdin closed; keep rendering until the run ends
                commands = crossbeam_channel::never();
                continue;
            }
            Input::Command(command) => command,
        };

        match (command, pending.take()) {
            (Command::Yes, Some(Pending::Stop)) => {
                if let Err(e) = controller.stop() {
                    log::warn!("{}", e);
                }
                drain(&rx, &mut controller, &mut snapshot);
                break;
            }
            (Command::Yes, Some(Pending::Quit)) => {
                if !controller.shutdown() {
                    log::warn!("Worker still running at exit");
                }
                drain(&rx, &mut controller, &mut snapshot);
                break;
            }
            (_, Some(_)) => println!("Continuing."),
            (Command::TogglePause, None) => {
                if let Err(e) = controller.toggle_pause() {
                    println!("{}", e);
                }
            }
            (Command::Stop, None) => {
                pending = Some(Pending::Stop);
                println!("Stop the capture? [y/N]");
            }
            (Command::Quit, None) => {
                pending = Some(Pending::Quit);
                println!("A capture is running. Quit anyway? [y/N]");
            }
            (Command::Yes | Command::No, None) => println!("{}", COMMANDS_HELP),
        }
    }

    match (snapshot.status, &snapshot.output) {
        (Status::Completed, Some(pdf)) if cli.open => open_path(pdf),
        (Status::Failed, _) => Err(AppError::RunFailed(
            snapshot.error.clone().unwrap_or_default(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Failed to read operator input: {0}")]
    Input(io::Error),

    #[error("Failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
}
