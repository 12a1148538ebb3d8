use std::path::PathBuf;
use thiserror::Error;

/// Why a single file could not be converted.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read size of {path}")]
    SizeProbe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Intermediate file already exists: {0}")]
    IntermediateCollision(PathBuf),

    #[error("Failed to rename {from} to {to}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {tool}: {reason}")]
    ToolLaunch { tool: String, reason: String },

    #[error("{command} exited with {}: {}", exit_label(.exit_code), .stderr.trim())]
    ToolFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Converter reported success but produced no output at {0}")]
    ToolOutputMissing(PathBuf),

    #[error("Failed to remove stale output {path}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Candidate has no file name: {0}")]
    InvalidPath(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (killed by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
