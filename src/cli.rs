use crate::config::{
    PipelineConfig, DEFAULT_CHUNK_KIB, DEFAULT_CONTENT_TYPE, DEFAULT_TIMEOUT_SECS,
};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flashpull")]
#[command(about = "Download a file and deploy it, rewriting only the blocks that changed", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The download URI
    #[arg(long, env = "FLASHPULL_URL")]
    pub url: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, env = "FLASHPULL_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// MIME type of the file to download, used if detection fails
    #[arg(long, env = "FLASHPULL_MIMETYPE", default_value = DEFAULT_CONTENT_TYPE)]
    pub mimetype: String,

    /// Destination path where to store the downloaded file
    #[arg(long, env = "FLASHPULL_DEST")]
    pub dest: Option<PathBuf>,

    /// Size of chunks in KiB
    #[arg(long, env = "FLASHPULL_CHUNKSIZE", default_value_t = DEFAULT_CHUNK_KIB)]
    pub chunksize: usize,

    /// Verbose output (debug logging)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (only show errors, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Validate the arguments into a pipeline configuration.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::new(
            self.url.as_deref().unwrap_or_default(),
            self.dest.clone().unwrap_or_default(),
            self.chunksize,
            self.timeout,
            self.mimetype.clone(),
        )
    }
}
