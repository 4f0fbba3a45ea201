// Chunkpress - Chunked Multi-Algorithm Lossless Compression
// Copyright (C) 2025 Chunkpress Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Codec benchmarks comparing the LZMA and Zstd backends

use chunkpress_compression::{
    classify, ChunkCodec, CodecAlgorithm, CodecDirection, ExecFilter, ReversibleFilter,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Generate test data with specified pattern
fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "text" => {
            let text = "The quick brown fox jumps over the lazy dog. ".as_bytes();
            (0..size).map(|i| text[i % text.len()]).collect()
        }
        "random" => (0..size).map(|i| ((i ^ 0xAA) & 0xFF) as u8).collect(),
        "code" => {
            // nop sled with periodic rel32 calls, like an instruction stream
            let mut data = vec![0x90u8; size];
            let mut i = 0;
            while i + 5 <= size {
                data[i] = 0xE8;
                let rel = (size as u32 / 2).wrapping_sub(i as u32 + 5);
                data[i + 1..i + 5].copy_from_slice(&rel.to_le_bytes());
                i += 37;
            }
            data
        }
        _ => vec![0u8; size],
    }
}

fn compressor(algo: CodecAlgorithm, level: &mut u32, chunk: usize) -> Box<dyn ChunkCodec> {
    algo.init(level, 1, chunk, CodecDirection::Compress)
        .expect("init compressor")
}

fn benchmark_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression");

    for (name, size) in [("10kb", 10 * 1024), ("100kb", 100 * 1024)] {
        let data = black_box(generate_test_data(size, "text"));
        let mut dst = vec![0u8; size * 2 + 256];

        let mut level = 6;
        let lzma = compressor(CodecAlgorithm::Lzma, &mut level, size);
        group.bench_function(format!("lzma_compress_{}_text_level6", name), |b| {
            b.iter(|| lzma.compress(&data, &mut dst, level))
        });

        let mut level = 6;
        let zstd = compressor(CodecAlgorithm::Zstd, &mut level, size);
        group.bench_function(format!("zstd_compress_{}_text_level6", name), |b| {
            b.iter(|| zstd.compress(&data, &mut dst, level))
        });
    }

    group.finish();
}

fn benchmark_decompression(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompression");

    let data = black_box(generate_test_data(100 * 1024, "text"));
    let mut dst = vec![0u8; data.len() * 2 + 256];

    for algo in [CodecAlgorithm::Lzma, CodecAlgorithm::Zstd] {
        let mut level = 6;
        let codec = compressor(algo, &mut level, data.len());
        let written = codec.compress(&data, &mut dst, level).expect("compress");
        let segment = dst[..written].to_vec();

        let decoder = algo
            .init(&mut level, 1, data.len(), CodecDirection::Decompress)
            .expect("init decompressor");
        let mut out = vec![0u8; data.len()];
        group.bench_function(format!("{:?}_decompress_100kb", algo), |b| {
            b.iter(|| decoder.decompress(black_box(&segment), &mut out))
        });
    }

    group.finish();
}

fn benchmark_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_levels");

    let data = black_box(generate_test_data(10 * 1024, "text"));
    let mut dst = vec![0u8; data.len() * 2 + 256];

    for requested in [1u32, 6, 9, 14] {
        let mut level = requested;
        let codec = compressor(CodecAlgorithm::Lzma, &mut level, data.len());
        group.bench_function(format!("lzma_level_{}", requested), |b| {
            b.iter(|| codec.compress(&data, &mut dst, level))
        });
    }

    group.finish();
}

fn benchmark_classify_and_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_filter");

    let text = black_box(generate_test_data(100 * 1024, "text"));
    let random = black_box(generate_test_data(100 * 1024, "random"));
    let code = black_box(generate_test_data(100 * 1024, "code"));

    group.bench_function("classify_text_100kb", |b| b.iter(|| classify(&text)));
    group.bench_function("classify_random_100kb", |b| b.iter(|| classify(&random)));

    let filter = ExecFilter::new();
    let mut dst = vec![0u8; code.len()];
    group.bench_function("exec_filter_encode_100kb", |b| {
        b.iter(|| filter.encode(&code, &mut dst))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_compression,
    benchmark_decompression,
    benchmark_levels,
    benchmark_classify_and_filter
);
criterion_main!(benches);
