//! Application state and main event loop.
//!
//! The app follows The Elm Architecture (TEA):
//! - [`Model`]: the complete application state
//! - [`Message`]: all possible events and actions
//! - [`update`]: state transitions
//! - [`App::run`]: main event loop with rendering and idle loading

mod event_loop;
mod input;
mod model;
mod update;

pub use model::Model;
pub use update::{update, Message};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::file::FileError;

/// Application-level failures, partitioned by exit code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration or I-O failure on the input file.
    #[error(transparent)]
    InputFile(#[from] FileError),

    /// The terminal could not be initialized.
    #[error("unable to initialize terminal: {0}")]
    Terminal(io::Error),

    /// A record in the stream could not be decoded.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Any other I-O failure while running.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    file_path: PathBuf,
}

impl App {
    /// Create a new application for the given file.
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }
}
