//! flashpull: download a file and deploy it onto a destination, rewriting
//! only the blocks whose content changed.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod streaming;
pub mod transport;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use streaming::{ContentType, DeployMode, DeployPipeline, DeployStats};
