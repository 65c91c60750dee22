//! Chunk sources: the head of every pipeline branch.
//!
//! Network-fed sources re-cut the HTTP body into chunks of the configured
//! size. Disk-fed sources read the existing destination in the same stride.
//! Either way the source owns its handle and drops it, closing the sequence,
//! when it returns.

use crate::error::Result;
use crate::progress::DownloadProgress;
use crate::streaming::channel::{ChunkSender, StageStats};
use crate::transport::Download;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

pub enum ChunkSource {
    Network {
        download: Download,
        chunk_size: usize,
        progress: DownloadProgress,
    },
    Disk {
        file: File,
        chunk_size: usize,
    },
}

impl ChunkSource {
    pub fn network(download: Download, chunk_size: usize, progress: DownloadProgress) -> Self {
        Self::Network {
            download,
            chunk_size,
            progress,
        }
    }

    pub fn disk(file: File, chunk_size: usize) -> Self {
        Self::Disk { file, chunk_size }
    }

    /// Emit chunks until end of data. On error the sequence is closed and the
    /// error returned; if the receiver hangs up the source stops quietly.
    pub async fn run(self, tx: ChunkSender) -> Result<StageStats> {
        match self {
            Self::Network {
                download,
                chunk_size,
                progress,
            } => {
                let result = run_network(download, chunk_size, &progress, &tx).await;
                match &result {
                    Ok(stats) => {
                        progress.finish();
                        info!(bytes = stats.bytes, "Download done");
                    }
                    Err(e) => {
                        progress.abandon();
                        error!("Download failed with {}", e);
                    }
                }
                result
            }
            Self::Disk { file, chunk_size } => {
                let result = run_disk(file, chunk_size, &tx).await;
                if let Err(e) = &result {
                    error!("Reading destination failed with {}", e);
                }
                result
            }
        }
    }
}

async fn run_network(
    mut download: Download,
    chunk_size: usize,
    progress: &DownloadProgress,
    tx: &ChunkSender,
) -> Result<StageStats> {
    info!(size = ?download.size_hint, chunk_size, "Starting download ...");

    let mut stats = StageStats::new();
    let mut pending = BytesMut::with_capacity(chunk_size);

    while let Some(part) = download.body.next().await {
        let part = part?;
        pending.extend_from_slice(&part);

        while pending.len() >= chunk_size {
            let chunk = pending.split_to(chunk_size).freeze();
            if !forward(tx, chunk, &mut stats).await {
                return Ok(stats);
            }
            progress.advance(chunk_size);
        }
    }

    // Short final chunk at end of stream
    if !pending.is_empty() {
        let len = pending.len();
        if forward(tx, pending.freeze(), &mut stats).await {
            progress.advance(len);
        }
    }

    Ok(stats)
}

async fn run_disk(mut file: File, chunk_size: usize, tx: &ChunkSender) -> Result<StageStats> {
    let mut stats = StageStats::new();

    loop {
        let mut buf = vec![0u8; chunk_size];
        let mut filled = 0;
        while filled < chunk_size {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            break;
        }
        buf.truncate(filled);

        if !forward(tx, Bytes::from(buf), &mut stats).await {
            break;
        }
        if filled < chunk_size {
            break;
        }
    }

    debug!(bytes = stats.bytes, chunks = stats.chunks, "Destination read done");
    Ok(stats)
}

/// Hand a chunk to the next stage. Returns false once the receiver is gone.
async fn forward(tx: &ChunkSender, chunk: Bytes, stats: &mut StageStats) -> bool {
    let len = chunk.len();
    if tx.send(chunk).await.is_err() {
        debug!("Downstream closed, stopping source");
        return false;
    }
    stats.record(len);
    true
}
