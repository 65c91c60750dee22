//! Deploy pipeline.
//!
//! Wires sources, decoder, hashers and writer together. The shape depends on
//! whether the destination already exists: a fresh destination is written
//! sequentially, an existing one goes through the differential writer.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::progress::DownloadProgress;
use crate::streaming::{
    channel::{block_channel, chunk_channel},
    ChunkSource, ContentType, Decompressor, DiffOutcome, DiffWriter, Hasher, SequentialWriter,
};
use crate::transport::{Download, HttpClient};
use tokio::fs::{File, OpenOptions};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which pipeline shape ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// Destination did not exist and was written front to back
    Fresh,
    /// Destination existed and only differing blocks were rewritten
    Differential,
}

/// Statistics for a deploy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployStats {
    pub mode: DeployMode,
    pub content_type: ContentType,
    /// Bytes of decoded content that reached the writer
    pub processed: u64,
    /// Bytes physically written to the destination
    pub written: u64,
}

impl DeployStats {
    /// Bytes that did not have to be written
    pub fn skipped(&self) -> u64 {
        self.processed.saturating_sub(self.written)
    }
}

/// Orchestrator for a deploy run
pub struct DeployPipeline {
    config: PipelineConfig,
    show_progress: bool,
}

impl DeployPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Detect the content type, open the download and deploy it.
    pub async fn run(&self) -> Result<DeployStats> {
        let client = HttpClient::new(&self.config)?;
        let content_type = self.resolve_content_type(&client).await;
        let download = client.open(&self.config.url).await?;
        self.deploy(download, content_type).await
    }

    async fn resolve_content_type(&self, client: &HttpClient) -> ContentType {
        match client.detect_content_type(&self.config.url).await {
            Ok(content_type) => {
                info!(%content_type, "Detected content type");
                content_type
            }
            Err(e) => {
                warn!("Failed to automatically detect compression: {}", e);
                let label = &self.config.fallback_content_type;
                let content_type = ContentType::from_label(label);
                if content_type == ContentType::Passthrough && label != content_type.label() {
                    warn!(%label, "No decoder for content type, passing bytes through");
                }
                content_type
            }
        }
    }

    /// Run the pipeline over an already opened download.
    pub async fn deploy(&self, download: Download, content_type: ContentType) -> Result<DeployStats> {
        let dest = &self.config.dest;
        let exists = tokio::fs::try_exists(dest)
            .await
            .map_err(|source| Error::Open {
                path: dest.clone(),
                source,
            })?;

        if exists {
            self.deploy_differential(download, content_type).await
        } else {
            self.deploy_fresh(download, content_type).await
        }
    }

    /// Source -> Decompressor -> SequentialWriter
    async fn deploy_fresh(&self, download: Download, content_type: ContentType) -> Result<DeployStats> {
        let dest = &self.config.dest;
        let file = File::create(dest).await.map_err(|source| Error::Create {
            path: dest.clone(),
            source,
        })?;
        info!(dest = %dest.display(), "Destination absent, writing sequentially");

        let progress = DownloadProgress::new(download.size_hint, self.show_progress);
        let (raw_tx, raw_rx) = chunk_channel();
        let (out_tx, out_rx) = chunk_channel();

        let source = tokio::spawn(
            ChunkSource::network(download, self.config.chunk_size, progress).run(raw_tx),
        );
        let decompress = tokio::spawn(Decompressor::new(content_type).run(raw_rx, out_tx));

        let written = SequentialWriter::new(file).run(out_rx).await;

        // Upstream failures first: they explain a short write
        join("source", source).await?;
        join("decompress", decompress).await?;
        let written = written?;

        Ok(DeployStats {
            mode: DeployMode::Fresh,
            content_type,
            processed: written.bytes,
            written: written.bytes,
        })
    }

    /// Source -> Decompressor -> Hasher --+
    ///                                     +--> DiffWriter
    /// Destination -> Hasher -------------+
    async fn deploy_differential(
        &self,
        download: Download,
        content_type: ContentType,
    ) -> Result<DeployStats> {
        let dest = &self.config.dest;
        let chunk_size = self.config.chunk_size;

        // Separate descriptors so the read branch never moves the write cursor
        let existing = File::open(dest).await.map_err(|source| Error::Open {
            path: dest.clone(),
            source,
        })?;
        let target = OpenOptions::new()
            .write(true)
            .open(dest)
            .await
            .map_err(|source| Error::Open {
                path: dest.clone(),
                source,
            })?;
        info!(dest = %dest.display(), "Destination exists, rewriting changed blocks only");

        let progress = DownloadProgress::new(download.size_hint, self.show_progress);
        let (raw_tx, raw_rx) = chunk_channel();
        let (decoded_tx, decoded_rx) = chunk_channel();
        let (new_tx, new_rx) = block_channel();
        let (disk_tx, disk_rx) = chunk_channel();
        let (existing_tx, existing_rx) = block_channel();

        let source =
            tokio::spawn(ChunkSource::network(download, chunk_size, progress).run(raw_tx));
        let decompress = tokio::spawn(Decompressor::new(content_type).run(raw_rx, decoded_tx));
        let hash_new = tokio::spawn(Hasher::new(chunk_size, "new").run(decoded_rx, new_tx));
        let disk = tokio::spawn(ChunkSource::disk(existing, chunk_size).run(disk_tx));
        let hash_existing =
            tokio::spawn(Hasher::new(chunk_size, "existing").run(disk_rx, existing_tx));

        let outcome = DiffWriter::new(target).run(new_rx, existing_rx).await;

        join("source", source).await?;
        join("decompress", decompress).await?;
        join("hash", hash_new).await?;
        join("disk", disk).await?;
        join("hash", hash_existing).await?;

        let outcome: DiffOutcome = outcome?;
        debug!(?outcome, "Differential write finished");
        let outcome = outcome.into_result()?;

        Ok(DeployStats {
            mode: DeployMode::Differential,
            content_type,
            processed: outcome.processed,
            written: outcome.written,
        })
    }
}

async fn join<T>(stage: &'static str, handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.map_err(|e| Error::join(stage, e))?
}
