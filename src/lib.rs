//! SUPER CAPT: automated page capture to PDF.
//!
//! The library wires together:
//! - Screen capture and cropping (capture/)
//! - Page-advance keystrokes (keyboard.rs)
//! - Region selection (selector.rs)
//! - The capture → crop → PDF pipeline on a worker thread (pipeline/)
//! - The command/snapshot surface a front-end drives (surface/)
//! - The terminal front-end (console.rs)

pub mod capture;
pub mod config;
pub mod console;
pub mod keyboard;
pub mod pipeline;
pub mod privilege;
pub mod selector;
pub mod session;
pub mod surface;

use clap::Parser;
pub use console::AppError;

/// Entry point, called by the binary.
pub fn run() -> Result<(), AppError> {
    env_logger::init();

    let cli = console::Cli::parse();
    log::info!("SUPER CAPT starting up");
    console::run_console(cli)
}
