//! Byte-stream views over stage channels.
//!
//! Decompressors and other `std::io` filters know nothing about channels.
//! [`ChannelReader`] turns the receiving end of a sequence into a
//! [`BufRead`], [`ChannelWriter`] turns the sending end into a [`Write`].
//!
//! Both block the calling thread on the channel, so they must only be used
//! from `tokio::task::spawn_blocking` or a plain thread, never from inside an
//! async task.

use crate::streaming::channel::StageStats;
use bytes::Bytes;
use std::io::{self, BufRead, Read, Write};
use tokio::sync::mpsc;

/// Reads the concatenated bytes of every message in a sequence.
///
/// Holds at most one received message; the unread tail of it is served
/// before the next message is pulled from the channel. End of sequence is
/// reported as a zero-length read.
pub struct ChannelReader<T> {
    rx: mpsc::Receiver<T>,
    current: Option<T>,
    pos: usize,
}

impl<T: AsRef<[u8]>> ChannelReader<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            rx,
            current: None,
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |chunk| chunk.as_ref().len() - self.pos)
    }
}

impl<T: AsRef<[u8]>> BufRead for ChannelReader<T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        // Empty messages are skipped, never surfaced as end of stream
        while self.remaining() == 0 {
            match self.rx.blocking_recv() {
                Some(chunk) => {
                    self.current = Some(chunk);
                    self.pos = 0;
                }
                None => {
                    self.current = None;
                    self.pos = 0;
                    return Ok(&[]);
                }
            }
        }

        match self.current {
            Some(ref chunk) => Ok(&chunk.as_ref()[self.pos..]),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.pos + self.remaining());
    }
}

impl<T: AsRef<[u8]>> Read for ChannelReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let n = {
            let available = self.fill_buf()?;
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

/// Hands every write to the next stage as one owned message.
///
/// A write blocks until the channel has room, which is how backpressure
/// reaches a filter driving this writer. Fails with
/// [`io::ErrorKind::BrokenPipe`] once the receiver is gone.
pub struct ChannelWriter<T> {
    tx: mpsc::Sender<T>,
    stats: StageStats,
}

impl<T: From<Bytes>> ChannelWriter<T> {
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self {
            tx,
            stats: StageStats::new(),
        }
    }

    /// Counters for everything handed off so far
    pub fn stats(&self) -> StageStats {
        self.stats
    }
}

impl<T: From<Bytes>> Write for ChannelWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let chunk = T::from(Bytes::copy_from_slice(buf));
        self.tx
            .blocking_send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "downstream stage closed"))?;
        self.stats.record(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
