//! Streaming deploy pipeline.
//!
//! Every stage is its own task; stages talk only through single-slot
//! channels, so the slowest stage sets the pace for the whole pipeline.
//!
//! # Architecture
//!
//! ```text
//! Destination absent:
//! +--------------+     +--------------+     +------------------+
//! | ChunkSource  | --> | Decompressor | --> | SequentialWriter |
//! |  (network)   |     |              |     |                  |
//! +--------------+     +--------------+     +------------------+
//!
//! Destination present:
//! +--------------+     +--------------+     +--------+
//! | ChunkSource  | --> | Decompressor | --> | Hasher | --+
//! |  (network)   |     |              |     | (new)  |   |    +------------+
//! +--------------+     +--------------+     +--------+   +--> | DiffWriter |
//! +--------------+                          +--------+   |    +------------+
//! | ChunkSource  | -----------------------> | Hasher | --+
//! |    (disk)    |                          | (old)  |
//! +--------------+                          +--------+
//! ```
//!
//! A stage that fails closes its output, so downstream sees an ordinary end
//! of sequence; the failure itself comes back through the stage's task
//! handle and is reported by [`DeployPipeline`].

pub mod adapter;
pub mod channel;
pub mod decompress;
pub mod diff_writer;
pub mod hasher;
pub mod pipeline;
pub mod source;

pub use adapter::{ChannelReader, ChannelWriter};
pub use channel::{
    AlignedBlock, BlockReceiver, BlockSender, ChunkReceiver, ChunkSender, Digest, StageStats,
    DIGEST_LEN, STAGE_CHANNEL_SIZE,
};
pub use decompress::{ContentType, Decompressor};
pub use diff_writer::{DiffEnd, DiffOutcome, DiffWriter, SequentialWriter};
pub use hasher::Hasher;
pub use pipeline::{DeployMode, DeployPipeline, DeployStats};
pub use source::ChunkSource;
