//! Error types for flashpull.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing configuration, reported before any stage starts
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to create {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("HTTP request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("could not detect content type: {0}")]
    Detection(String),

    #[error("{codec} decompression failed: {source}")]
    Codec {
        codec: &'static str,
        source: io::Error,
    },

    /// Both hashed branches produced a block at `offset` but of different sizes
    #[error(
        "block size mismatch at offset {offset:#x}: new content has {new_len} bytes, destination has {existing_len}"
    )]
    BlockMismatch {
        offset: u64,
        new_len: usize,
        existing_len: usize,
    },

    /// Differential write stopped before both branches ended together
    #[error("new content and destination diverged in size after {processed} bytes ({reason})")]
    SizeDiverged { processed: u64, reason: String },

    #[error("pipeline stage {stage} failed to complete: {source}")]
    Join {
        stage: &'static str,
        source: tokio::task::JoinError,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Configuration and setup errors happen before the pipeline runs and
    /// leave the destination untouched.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Create { .. } | Error::Open { .. }
        )
    }

    pub(crate) fn join(stage: &'static str, source: tokio::task::JoinError) -> Self {
        Error::Join { stage, source }
    }
}
