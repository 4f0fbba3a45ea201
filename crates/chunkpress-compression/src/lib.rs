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

//! Content-aware codec and filter layer for chunked compression
//!
//! This crate decides, per data chunk, how to compress: a content
//! classifier steers path selection, reversible transform filters expose
//! redundancy before generic compression, and a closed set of backend
//! codecs sits behind one uniform plugin contract:
//! - **Content classification**: single-pass text/binary heuristic
//! - **Reversible filters**: lossless pre-compression transforms with
//!   clean fallback when input is unsuitable
//! - **LZMA backend**: high ratio, pseudo-level presets, fixed segment header
//! - **Zstd backend**: fast path for binary and mixed chunks
//!
//! The upstream worker pool owns chunk boundaries, scheduling and the chunk
//! header (including each chunk's uncompressed length); this layer owns
//! everything between a chunk buffer and its compressed segment.
//!
//! # Quick Start
//!
//! ```rust
//! use chunkpress_compression::{classify, CodecAlgorithm, CodecDirection, ContentType};
//!
//! fn main() -> anyhow::Result<()> {
//!     let chunk = b"The quick brown fox jumps over the lazy dog. ".repeat(50);
//!     assert_eq!(classify(&chunk), ContentType::Text);
//!
//!     let mut level = 6;
//!     let codec = CodecAlgorithm::Lzma.init(
//!         &mut level, 1, chunk.len(), CodecDirection::Compress)?;
//!     let mut segment = vec![0u8; chunk.len() + 512];
//!     let written = codec.compress(&chunk, &mut segment, level)?;
//!
//!     let decoder = CodecAlgorithm::Lzma.init(
//!         &mut level, 1, chunk.len(), CodecDirection::Decompress)?;
//!     let mut restored = vec![0u8; chunk.len()];
//!     decoder.decompress(&segment[..written], &mut restored)?;
//!     assert_eq!(restored, chunk);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! Handles are plain owned values: construct one per algorithm and
//! direction before spawning workers, share it by reference, drop it after
//! the workers join. `compress` and `decompress` take `&self` and mutate
//! nothing, so concurrent calls through one handle are safe; the per-call
//! level is an explicit argument rather than shared tuning state.

pub mod analyzer;
pub mod error;
pub mod filter;
pub mod lzma_codec;
pub mod metrics;
pub mod zstd_codec;

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use analyzer::{classify, codec_for_content, ContentType};
pub use error::{CodecError, CodecResult};
pub use filter::{encode_or_passthrough, ExecFilter, FilterOutcome, ReversibleFilter};
pub use lzma_codec::{LzmaCodec, LzmaProps, LZMA_ENGINE_LEVEL_CAP, LZMA_HEADER_SIZE, LZMA_MAX_LEVEL};
pub use metrics::CompressionMetrics;
pub use zstd_codec::{ZstdCodec, ZSTD_MAX_LEVEL};

/// Which direction a codec handle will serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecDirection {
    /// The handle will compress chunks
    Compress,
    /// The handle will decompress segments
    Decompress,
}

/// Multithreading and buffer capabilities of one backend.
///
/// A plain value produced by a pure query; the upstream scheduler reads it
/// once per (algorithm, level, chunk size) tuple before dispatching work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecCapabilities {
    /// Whether concurrent compress calls may share one handle
    pub compress_parallel: bool,
    /// Whether concurrent decompress calls may share one handle
    pub decompress_parallel: bool,
    /// How many threads decompression uses
    pub decompress_threads: u32,
    /// Extra destination bytes compression may need beyond the chunk size
    pub output_headroom: usize,
}

/// Backend compression algorithm identifier.
///
/// The set is closed and statically known; dispatch happens on this
/// identifier, never through dynamic loading. The `u8` value is what the
/// upstream chunk header records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodecAlgorithm {
    /// LZMA: high ratio, slow, the text/archival path
    Lzma = 1,
    /// Zstd: fast, the binary/mixed path
    Zstd = 2,
}

impl CodecAlgorithm {
    /// Wire identifier of this algorithm
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up an algorithm by its wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(CodecAlgorithm::Lzma),
            2 => Some(CodecAlgorithm::Zstd),
            _ => None,
        }
    }

    /// Query this backend's capabilities. Pure; no handle required.
    pub fn capabilities(self, level: u32, chunk_size: usize) -> CodecCapabilities {
        match self {
            CodecAlgorithm::Lzma => LzmaCodec::capabilities(level, chunk_size),
            CodecAlgorithm::Zstd => ZstdCodec::capabilities(level, chunk_size),
        }
    }

    /// Construct a codec handle for one direction.
    ///
    /// For the compress direction this derives the backend's tuning
    /// parameters from `level`, clamping pseudo-levels in place so the
    /// caller sees the level the engine will use. Construct handles before
    /// spawning workers and drop them after all workers have finished;
    /// the handle itself is immutable, so the in-flight calls themselves
    /// need no further synchronization.
    pub fn init(
        self,
        level: &mut u32,
        threads: u32,
        chunk_size: usize,
        direction: CodecDirection,
    ) -> CodecResult<Box<dyn ChunkCodec>> {
        Ok(match (self, direction) {
            (CodecAlgorithm::Lzma, CodecDirection::Compress) => {
                Box::new(LzmaCodec::for_compression(level, threads, chunk_size)?)
            }
            (CodecAlgorithm::Lzma, CodecDirection::Decompress) => {
                Box::new(LzmaCodec::for_decompression())
            }
            (CodecAlgorithm::Zstd, CodecDirection::Compress) => {
                Box::new(ZstdCodec::for_compression(level, threads, chunk_size)?)
            }
            (CodecAlgorithm::Zstd, CodecDirection::Decompress) => {
                Box::new(ZstdCodec::for_decompression())
            }
        })
    }
}

/// Uniform contract every backend codec satisfies.
///
/// One compress call produces one self-contained segment (any
/// algorithm-specific header plus payload) in the caller's destination
/// buffer; a segment is only ever decompressed by the algorithm that
/// produced it. Implementations never retain the buffers beyond the call.
pub trait ChunkCodec: Send + Sync + Debug {
    /// Which algorithm this handle dispatches to
    fn algorithm(&self) -> CodecAlgorithm;

    /// Compress `src` into `dst` at the given numeric level, returning the
    /// total segment length (header + payload).
    ///
    /// Fails with [`CodecError::BufferTooSmall`] when `dst` cannot hold the
    /// segment; where the header size is statically known this is detected
    /// before the engine runs, so no partial output is written.
    fn compress(&self, src: &[u8], dst: &mut [u8], level: u32) -> CodecResult<usize>;

    /// Decompress one segment into `dst`, returning the bytes written.
    ///
    /// The destination is sized by the caller from the chunk header's
    /// uncompressed length. Invalid or truncated input fails with
    /// [`CodecError::CorruptData`].
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize>;

    /// Size metrics for a completed compress call
    fn metrics(&self, original: &[u8], segment: &[u8]) -> CompressionMetrics {
        CompressionMetrics::from_sizes(original.len(), segment.len())
    }
}
