//! Channel types for the deploy pipeline.
//!
//! Every link between two stages is a bounded channel holding at most one
//! message, so a slow consumer throttles its producer. Dropping the sending
//! half ends the sequence.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Capacity of every inter-stage channel
pub const STAGE_CHANNEL_SIZE: usize = 1;

/// Size of a content digest in bytes
pub const DIGEST_LEN: usize = blake3::OUT_LEN;

/// Content digest of one aligned block
pub type Digest = [u8; DIGEST_LEN];

/// Hash a block's bytes.
pub fn digest(data: &[u8]) -> Digest {
    *blake3::hash(data).as_bytes()
}

// =============================================================================
// Chunk sequences
// =============================================================================

/// Sending half of a raw chunk sequence
pub type ChunkSender = mpsc::Sender<Bytes>;

/// Receiving half of a raw chunk sequence
pub type ChunkReceiver = mpsc::Receiver<Bytes>;

/// Create a channel for raw chunks.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    mpsc::channel(STAGE_CHANNEL_SIZE)
}

// =============================================================================
// AlignedBlock: HashStage -> DiffWriter
// =============================================================================

/// A block cut at a fixed stride from the start of its sequence, with the
/// digest of exactly its bytes. Only the last block of a sequence may be
/// shorter than the stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedBlock {
    pub data: Bytes,
    pub digest: Digest,
}

impl AlignedBlock {
    pub fn new(data: Bytes) -> Self {
        let digest = digest(&data);
        Self { data, digest }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether both blocks hold the same content.
    pub fn same_content(&self, other: &AlignedBlock) -> bool {
        self.digest == other.digest
    }
}

impl From<Bytes> for AlignedBlock {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for AlignedBlock {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Sending half of an aligned block sequence
pub type BlockSender = mpsc::Sender<AlignedBlock>;

/// Receiving half of an aligned block sequence
pub type BlockReceiver = mpsc::Receiver<AlignedBlock>;

/// Create a channel for aligned blocks.
pub fn block_channel() -> (BlockSender, BlockReceiver) {
    mpsc::channel(STAGE_CHANNEL_SIZE)
}

// =============================================================================
// Stage statistics
// =============================================================================

/// Counters a stage reports when its sequence ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Messages handed to the next stage
    pub chunks: u64,

    /// Bytes handed to the next stage
    pub bytes: u64,
}

impl StageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len as u64;
    }
}

// =============================================================================
// Tests
// =============================================================================
