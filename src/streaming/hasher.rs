//! Hash stage.
//!
//! Cuts a chunk sequence into blocks of a fixed size counted from the start
//! of the sequence, whatever the incoming chunk boundaries were, and attaches
//! a digest to each block. Both branches of the differential path must use
//! the same block size or their blocks cannot be paired.

use crate::error::{Error, Result};
use crate::streaming::adapter::ChannelReader;
use crate::streaming::channel::{AlignedBlock, BlockSender, ChunkReceiver, StageStats};
use bytes::Bytes;
use std::io::{self, Read};
use tracing::debug;

pub struct Hasher {
    block_size: usize,
    /// Label for log events, e.g. "new" or "existing"
    branch: &'static str,
}

impl Hasher {
    pub fn new(block_size: usize, branch: &'static str) -> Self {
        Self { block_size, branch }
    }

    pub async fn run(self, rx: ChunkReceiver, tx: BlockSender) -> Result<StageStats> {
        tokio::task::spawn_blocking(move || self.run_blocking(rx, tx))
            .await
            .map_err(|e| Error::join("hash", e))?
    }

    fn run_blocking(self, rx: ChunkReceiver, tx: BlockSender) -> Result<StageStats> {
        let mut reader = ChannelReader::new(rx);
        let mut stats = StageStats::new();

        loop {
            let mut buf = vec![0u8; self.block_size];
            let filled = fill(&mut reader, &mut buf)?;
            if filled == 0 {
                break;
            }
            buf.truncate(filled);

            let block = AlignedBlock::new(Bytes::from(buf));
            if tx.blocking_send(block).is_err() {
                debug!(branch = self.branch, "Downstream closed, stopping hash stage");
                break;
            }
            stats.record(filled);

            // A short block only happens at end of sequence
            if filled < self.block_size {
                break;
            }
        }

        debug!(
            branch = self.branch,
            blocks = stats.chunks,
            bytes = stats.bytes,
            "Hashing done"
        );
        Ok(stats)
    }
}

/// Read until `buf` is full or the sequence ends; returns the bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::channel::{block_channel, chunk_channel, digest};
    use proptest::prelude::*;

    async fn hash_all(input: Vec<u8>, stride: usize, block_size: usize) -> Vec<AlignedBlock> {
        let (in_tx, in_rx) = chunk_channel();
        let (out_tx, mut out_rx) = block_channel();

        let stage = tokio::spawn(Hasher::new(block_size, "test").run(in_rx, out_tx));
        tokio::spawn(async move {
            for part in input.chunks(stride.max(1)) {
                if in_tx.send(Bytes::copy_from_slice(part)).await.is_err() {
                    break;
                }
            }
        });

        let mut blocks = Vec::new();
        while let Some(block) = out_rx.recv().await {
            blocks.push(block);
        }
        stage.await.unwrap().unwrap();
        blocks
    }

    #[tokio::test]
    async fn test_blocks_ignore_chunk_boundaries() {
        let input: Vec<u8> = (0..100u8).collect();
        let blocks = hash_all(input.clone(), 7, 32).await;

        let lens: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
        assert_eq!(lens, vec![32, 32, 32, 4]);
        assert_eq!(&blocks[1].data[..], &input[32..64]);
        assert_eq!(blocks[3].digest, digest(&input[96..]));
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_trailing_block() {
        let blocks = hash_all(vec![1u8; 64], 64, 32).await;
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.len() == 32));
    }

    #[tokio::test]
    async fn test_short_only_block() {
        let blocks = hash_all(b"tiny".to_vec(), 4, 32).await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 4);
        assert_eq!(blocks[0].digest, digest(b"tiny"));
    }

    #[tokio::test]
    async fn test_empty_sequence_emits_nothing() {
        let blocks = hash_all(Vec::new(), 4, 32).await;
        assert!(blocks.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_blocks_align_to_stride(
            len in 0usize..2000,
            stride in 1usize..300,
            block_size in 1usize..256,
        ) {
            let input: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let blocks = runtime.block_on(hash_all(input.clone(), stride, block_size));

            prop_assert_eq!(blocks.len(), len.div_ceil(block_size));
            for (i, block) in blocks.iter().enumerate() {
                let start = i * block_size;
                let end = (start + block_size).min(len);
                prop_assert_eq!(&block.data[..], &input[start..end]);
                prop_assert_eq!(block.digest, digest(&input[start..end]));
            }
        }
    }
}
