//! Pipeline configuration.
//!
//! Built once from the command line and passed by reference to every
//! collaborator that needs it.

use crate::error::{Error, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Default network timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Default chunk size in KiB
pub const DEFAULT_CHUNK_KIB: usize = 1024;

/// Label used when detection fails and no fallback is given
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Remote resource to fetch
    pub url: Url,
    /// Destination file
    pub dest: PathBuf,
    /// Chunk and block size in bytes, shared by every stage
    pub chunk_size: usize,
    /// Bounds connection setup and time-to-headers, not the body stream
    pub timeout: Duration,
    /// Content-type label used when detection fails
    pub fallback_content_type: String,
}

impl PipelineConfig {
    pub fn new(
        url: &str,
        dest: impl Into<PathBuf>,
        chunk_kib: usize,
        timeout_secs: u64,
        fallback_content_type: impl Into<String>,
    ) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::Config("must specify a URL using --url".into()));
        }
        let url = Url::parse(url).map_err(|e| Error::Config(format!("invalid URL {url}: {e}")))?;

        let dest = dest.into();
        if dest.as_os_str().is_empty() {
            return Err(Error::Config(
                "must specify a destination path using --dest".into(),
            ));
        }

        if chunk_kib == 0 {
            return Err(Error::Config("chunk size must be at least 1 KiB".into()));
        }
        let chunk_size = chunk_kib
            .checked_mul(1024)
            .ok_or_else(|| Error::Config(format!("chunk size {chunk_kib} KiB is too large")))?;

        let fallback_content_type = fallback_content_type.into();
        if fallback_content_type.trim().is_empty() {
            return Err(Error::Config("fallback content type is empty".into()));
        }

        Ok(Self {
            url,
            dest,
            chunk_size,
            timeout: Duration::from_secs(timeout_secs),
            fallback_content_type,
        })
    }
}
