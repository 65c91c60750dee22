//! Decompression stage.
//!
//! Picks a decoder by content-type label and runs it on a blocking thread,
//! reading the incoming chunk sequence through a [`ChannelReader`] and
//! writing decoded bytes through a [`ChannelWriter`].

use crate::error::{Error, Result};
use crate::streaming::adapter::{ChannelReader, ChannelWriter};
use crate::streaming::channel::{ChunkReceiver, ChunkSender, StageStats};
use bytes::Bytes;
use std::fmt;
use std::io::{self, Read, Write};
use tracing::{debug, error, info};

/// Content types the pipeline knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Forward bytes unmodified
    Passthrough,
    Gzip,
    Xz,
    Bzip2,
    Zstd,
}

impl ContentType {
    /// Map a MIME label to a decoder. Labels without a decoder pass through.
    pub fn from_label(label: &str) -> Self {
        match label {
            "application/gzip" => Self::Gzip,
            "application/x-xz" => Self::Xz,
            "application/x-bzip2" => Self::Bzip2,
            "application/zstd" => Self::Zstd,
            _ => Self::Passthrough,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passthrough => "application/octet-stream",
            Self::Gzip => "application/gzip",
            Self::Xz => "application/x-xz",
            Self::Bzip2 => "application/x-bzip2",
            Self::Zstd => "application/zstd",
        }
    }

    fn codec_name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Bzip2 => "bzip2",
            Self::Zstd => "zstd",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decompression stage
pub struct Decompressor {
    content_type: ContentType,
}

impl Decompressor {
    pub fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }

    /// Decode `rx` into `tx` until the input ends. A codec error closes the
    /// output early and is returned; a closed output stops the stage quietly.
    pub async fn run(self, rx: ChunkReceiver, tx: ChunkSender) -> Result<StageStats> {
        if self.content_type != ContentType::Passthrough {
            info!("Decompressing {}...", self.content_type);
        }

        tokio::task::spawn_blocking(move || self.run_blocking(rx, tx))
            .await
            .map_err(|e| Error::join("decompress", e))?
    }

    fn run_blocking(self, rx: ChunkReceiver, tx: ChunkSender) -> Result<StageStats> {
        let reader = ChannelReader::new(rx);
        let mut writer = ChannelWriter::<Bytes>::new(tx);

        let result = match self.content_type {
            ContentType::Passthrough => copy(reader, &mut writer),
            ContentType::Gzip => copy(flate2::bufread::MultiGzDecoder::new(reader), &mut writer),
            ContentType::Xz => copy(
                xz2::bufread::XzDecoder::new_multi_decoder(reader),
                &mut writer,
            ),
            ContentType::Bzip2 => copy(bzip2::bufread::MultiBzDecoder::new(reader), &mut writer),
            ContentType::Zstd => {
                zstd::stream::read::Decoder::with_buffer(reader).and_then(|d| copy(d, &mut writer))
            }
        };

        let stats = writer.stats();
        match result {
            Ok(_) => {
                debug!(
                    codec = self.content_type.codec_name(),
                    bytes = stats.bytes,
                    "Decompression done"
                );
                Ok(stats)
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("Downstream closed, stopping decompression");
                Ok(stats)
            }
            Err(e) => {
                error!(codec = self.content_type.codec_name(), "copy error {}", e);
                Err(Error::Codec {
                    codec: self.content_type.codec_name(),
                    source: e,
                })
            }
        }
    }
}

fn copy<R: Read, W: Write>(mut reader: R, writer: &mut W) -> io::Result<u64> {
    io::copy(&mut reader, writer)
}
