//! Error types for batch runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ResolveError;

use super::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Why one video ended without a subtitle.
///
/// Always local to that video; the batch keeps going.
#[derive(Debug, Error)]
pub enum VideoError {
    /// No catalog identifier could be derived from the file name.
    #[error("no identifier found in '{file}'")]
    MissingIdentifier {
        /// File name of the video.
        file: String,
    },

    /// No provider produced a subtitle.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The subtitle could not be written beside the video.
    #[error("failed to write subtitle {}: {source}", path.display())]
    Write {
        /// Target subtitle path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The video task panicked or was cancelled.
    #[error("task for '{file}' did not complete: {reason}")]
    Task {
        /// File name of the video.
        file: String,
        /// Join failure description.
        reason: String,
    },
}

impl VideoError {
    /// Creates a `MissingIdentifier` error.
    #[must_use]
    pub fn missing_identifier(file: &str) -> Self {
        Self::MissingIdentifier {
            file: file.to_string(),
        }
    }

    /// Creates a `Write` error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Errors that stop a batch from starting or completing.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Worker semaphore was closed unexpectedly.
    #[error("worker semaphore closed unexpectedly")]
    SemaphoreClosed,
}
