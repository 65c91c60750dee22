//! Destination writers.
//!
//! [`DiffWriter`] pairs the hashed blocks of the new content with the hashed
//! blocks already on disk and rewrites only the blocks whose digests differ.
//! [`SequentialWriter`] is the plain path used when there is no destination
//! to compare against.

use crate::error::{Error, Result};
use crate::streaming::channel::{BlockReceiver, ChunkReceiver, StageStats};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tracing::{debug, error, info, warn};

/// Why the comparison loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEnd {
    /// Both sequences ended after the same block
    Complete,
    /// The new content ended while the destination still had blocks
    NewContentEnded,
    /// The destination ended while the new content still had blocks
    ExistingEnded,
    /// Paired blocks had different sizes
    LengthMismatch {
        offset: u64,
        new_len: usize,
        existing_len: usize,
    },
}

/// Result of a differential write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Bytes compared, i.e. the offset the loop stopped at
    pub processed: u64,
    /// Bytes rewritten on disk
    pub written: u64,
    pub end: DiffEnd,
}

impl DiffOutcome {
    pub fn is_complete(&self) -> bool {
        self.end == DiffEnd::Complete
    }

    /// Turn an incomplete comparison into an error.
    pub fn into_result(self) -> Result<Self> {
        match self.end {
            DiffEnd::Complete => Ok(self),
            DiffEnd::NewContentEnded => Err(Error::SizeDiverged {
                processed: self.processed,
                reason: "new content ended before the destination".into(),
            }),
            DiffEnd::ExistingEnded => Err(Error::SizeDiverged {
                processed: self.processed,
                reason: "destination ended before the new content".into(),
            }),
            DiffEnd::LengthMismatch {
                offset,
                new_len,
                existing_len,
            } => Err(Error::BlockMismatch {
                offset,
                new_len,
                existing_len,
            }),
        }
    }
}

/// Differential writer
pub struct DiffWriter {
    file: File,
}

impl DiffWriter {
    /// `file` must be opened for writing; its position is irrelevant.
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// Compare the two sequences pairwise and rewrite differing blocks at
    /// their cumulative offset. Each rewrite is flushed to disk before the
    /// next pair is taken.
    pub async fn run(
        mut self,
        mut new_rx: BlockReceiver,
        mut existing_rx: BlockReceiver,
    ) -> Result<DiffOutcome> {
        let mut processed = 0u64;
        let mut written = 0u64;

        let end = loop {
            let Some(new) = new_rx.recv().await else {
                break match existing_rx.recv().await {
                    None => DiffEnd::Complete,
                    Some(_) => DiffEnd::NewContentEnded,
                };
            };
            let Some(existing) = existing_rx.recv().await else {
                break DiffEnd::ExistingEnded;
            };

            if new.len() != existing.len() {
                error!(
                    offset = processed,
                    new_len = new.len(),
                    existing_len = existing.len(),
                    "Error buffersize doesn't match"
                );
                break DiffEnd::LengthMismatch {
                    offset: processed,
                    new_len: new.len(),
                    existing_len: existing.len(),
                };
            }

            if !new.same_content(&existing) {
                debug!(
                    offset = processed,
                    new = %hex::encode(&new.digest[..8]),
                    existing = %hex::encode(&existing.digest[..8]),
                    "Block digests differ"
                );
                self.write_block(processed, &new.data).await?;
                written += new.len() as u64;
                info!("Write at {:#x}", processed);
            }
            processed += new.len() as u64;
        };

        self.file.sync_all().await?;

        match &end {
            DiffEnd::Complete => info!("processed {}, written {}", processed, written),
            other => warn!(?other, "processed {}, written {}", processed, written),
        }

        Ok(DiffOutcome {
            processed,
            written,
            end,
        })
    }

    async fn write_block(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let result = async {
            self.file.seek(SeekFrom::Start(offset)).await?;
            self.file.write_all(data).await?;
            self.file.flush().await?;
            self.file.sync_data().await
        }
        .await;

        result.map_err(|e| {
            error!(offset, "Error writing file: {}", e);
            Error::Io(e)
        })
    }
}

/// Appends every chunk to a fresh destination file.
pub struct SequentialWriter {
    file: File,
}

impl SequentialWriter {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub async fn run(mut self, mut rx: ChunkReceiver) -> Result<StageStats> {
        let mut stats = StageStats::new();

        while let Some(chunk) = rx.recv().await {
            if let Err(e) = self.file.write_all(&chunk).await {
                error!("Error writing file: {}", e);
                return Err(Error::Io(e));
            }
            stats.record(chunk.len());
        }

        self.file.flush().await?;
        self.file.sync_all().await?;
        debug!(bytes = stats.bytes, "Destination written");
        Ok(stats)
    }
}
