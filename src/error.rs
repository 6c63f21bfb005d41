//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while checking a sample for contamination.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0} not found in PATH. Please install it or add it to your PATH.")]
    ToolNotFound(String),

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse {what}: {text}")]
    Parse { what: &'static str, text: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing input: {}", .0.display())]
    MissingInput(PathBuf),
}

impl DetectError {
    pub fn parse(what: &'static str, text: impl Into<String>) -> Self {
        DetectError::Parse {
            what,
            text: text.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
