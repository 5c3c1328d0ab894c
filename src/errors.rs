/*!
 * Error types for the mp4concat tools.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when running an external media tool
#[derive(Error, Debug)]
pub enum ToolError {
    /// The executable could not be started at all
    #[error("Failed to launch {tool} ({program}): {message}")]
    LaunchFailed {
        /// Short tool label, e.g. "MP4Box"
        tool: String,
        /// Program path that was executed
        program: PathBuf,
        /// Underlying I/O error text
        message: String,
    },

    /// The tool ran but exited unsuccessfully
    #[error("{tool} exited with status {code}: {output}")]
    Failed {
        /// Short tool label
        tool: String,
        /// Exit code, or -1 when killed by a signal
        code: i32,
        /// Captured (filtered) output of the tool
        output: String,
    },

    /// The tool did not finish in time
    #[error("{tool} timed out after {secs} seconds")]
    TimedOut {
        /// Short tool label
        tool: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// The tool reported success but the expected file never appeared
    #[error("Expected {0:?} to be created but it was not")]
    OutputMissing(PathBuf),

    /// The tool output could not be interpreted
    #[error("Unexpected output from {tool} for {file:?}: {message}")]
    UnexpectedOutput {
        /// Short tool label
        tool: String,
        /// File the tool was run against
        file: PathBuf,
        /// What was missing or malformed
        message: String,
    },

    /// The video carries no chapter track
    #[error("No chapters or chapters track found in file {0:?}")]
    NoChapters(PathBuf),
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timestamp that does not follow HH:MM:SS,mmm
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// No usable cue was found
    #[error("No valid subtitle entries were found in {0}")]
    NoEntries(String),

    /// Fewer alignment offsets than subtitle files
    #[error("{available} alignment offsets available for {required} subtitle files")]
    NotEnoughOffsets {
        /// Offsets obtained from chapters or probed videos
        available: usize,
        /// Number of subtitle files to align
        required: usize,
    },
}

/// Errors that can occur while building or reading chapter lists
#[derive(Error, Debug)]
pub enum ChapterError {
    /// A chapter line whose timecode cannot be parsed
    #[error("Invalid chapter timecode on line {line}: {value}")]
    InvalidTimecode {
        /// 1-based line number in the chapter text
        line: usize,
        /// Offending value
        value: String,
    },

    /// The chapter text contained no chapter entries
    #[error("No chapter entries found")]
    Empty,
}

/// Errors that can occur while collecting input files
#[derive(Error, Debug)]
pub enum InputError {
    /// An explicitly named input does not exist
    #[error("Input file does not exist: {0:?}")]
    NotFound(PathBuf),

    /// A glob pattern matched nothing
    #[error("No files match pattern: {0}")]
    NoMatch(String),

    /// The input directory could not be listed
    #[error("Input directory does not exist: {0:?}")]
    DirectoryNotFound(PathBuf),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from an external tool
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from chapter handling
    #[error("Chapter error: {0}")]
    Chapter(#[from] ChapterError),

    /// Error from input collection
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
