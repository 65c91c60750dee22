use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flashpull::streaming::channel::{block_channel, chunk_channel};
use flashpull::streaming::{DiffWriter, Hasher};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

const IMAGE_LEN: usize = 16 * 1024 * 1024;
const FRAGMENT: usize = 16 * 1024;

fn image(seed: u8) -> Vec<u8> {
    (0..IMAGE_LEN)
        .map(|i| ((i as u32 * 13 + seed as u32) % 251) as u8)
        .collect()
}

async fn feed(data: Bytes, tx: flashpull::streaming::ChunkSender) {
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + FRAGMENT).min(data.len());
        if tx.send(data.slice(offset..end)).await.is_err() {
            return;
        }
        offset = end;
    }
}

/// Hash both sides and run the differential writer over a temp file that
/// already holds `existing`.
async fn deploy(new: Bytes, existing: Bytes, block_size: usize, file: &NamedTempFile) -> u64 {
    let (new_raw_tx, new_raw_rx) = chunk_channel();
    let (old_raw_tx, old_raw_rx) = chunk_channel();
    let (new_tx, new_rx) = block_channel();
    let (old_tx, old_rx) = block_channel();

    tokio::spawn(feed(new, new_raw_tx));
    tokio::spawn(feed(existing, old_raw_tx));
    tokio::spawn(Hasher::new(block_size, "new").run(new_raw_rx, new_tx));
    tokio::spawn(Hasher::new(block_size, "existing").run(old_raw_rx, old_tx));

    let target = tokio::fs::OpenOptions::new()
        .write(true)
        .open(file.path())
        .await
        .unwrap();
    let outcome = DiffWriter::new(target).run(new_rx, old_rx).await.unwrap();
    outcome.written
}

fn bench_identical(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let data = Bytes::from(image(1));

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();

    let mut group = c.benchmark_group("diff_identical");
    group.throughput(Throughput::Bytes(IMAGE_LEN as u64));
    group.sample_size(10);

    for kib in [64usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(kib), &kib, |b, &kib| {
            b.iter(|| {
                let written = rt.block_on(deploy(data.clone(), data.clone(), kib * 1024, &file));
                black_box(written)
            });
        });
    }

    group.finish();
}

fn bench_sparse_changes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let existing = image(2);
    let mut changed = existing.clone();
    // One byte in every fourth MiB
    for offset in (0..IMAGE_LEN).step_by(4 * 1024 * 1024) {
        changed[offset] ^= 0xff;
    }
    let existing = Bytes::from(existing);
    let changed = Bytes::from(changed);

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&existing).unwrap();

    let mut group = c.benchmark_group("diff_sparse_changes");
    group.throughput(Throughput::Bytes(IMAGE_LEN as u64));
    group.sample_size(10);

    group.bench_function("1024", |b| {
        b.iter(|| {
            // Restore the original so every iteration rewrites the same blocks
            std::fs::write(file.path(), &existing).unwrap();
            let written = rt.block_on(deploy(
                changed.clone(),
                existing.clone(),
                1024 * 1024,
                &file,
            ));
            black_box(written)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_identical, bench_sparse_changes);
criterion_main!(benches);
