//! Benchmarks for the range streaming path.
//!
//! Measures range planning on its own and end-to-end chunk streaming from
//! the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use futures::StreamExt;
use reelgate::pool::CredentialPool;
use reelgate::store::MemoryStore;
use reelgate::streaming::{
    encode_token, parse_range_header, resolve_range, ChunkPlan, StreamServer, StreamSettings,
};
use reelgate_common::ChatId;
use reelgate_fileid::MediaKind;

const MIB: u64 = 1024 * 1024;

fn bench_range_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_planning");
    let size = Some(4 * 1024 * MIB);

    for header in ["bytes=0-", "bytes=1073741831-2147483659", "bytes=-500"] {
        group.bench_function(header, |b| {
            b.iter(|| {
                let request = parse_range_header(black_box(header));
                let range = resolve_range(request, size).unwrap();
                black_box(ChunkPlan::new(&range, MIB).chunk_count())
            });
        });
    }

    group.finish();
}

fn bench_chunk_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_streaming");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for file_size in [256 * 1024usize, 4 * MIB as usize] {
        let store = Arc::new(MemoryStore::new());
        let pool = CredentialPool::new();
        pool.register("bench", store.clone());
        let message = store
            .insert_file(
                ChatId(-1),
                MediaKind::Document,
                "bench.bin",
                "application/octet-stream",
                vec![7u8; file_size],
                None,
            )
            .unwrap();
        let token = encode_token(message);
        let settings = StreamSettings {
            chunk_size: 64 * 1024,
            chunk_timeout: Duration::from_secs(5),
            prefetch_chunks: 2,
        };
        let server = StreamServer::new(pool, settings, ChatId(-1));

        group.throughput(Throughput::Bytes(file_size as u64));
        group.bench_function(format!("full_{}", file_size), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let stream = server.serve(&token, None).await.unwrap();
                    let total = stream
                        .body
                        .fold(0usize, |n, frame| async move { n + frame.unwrap().len() })
                        .await;
                    black_box(total)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_range_planning, bench_chunk_streaming);
criterion_main!(benches);
