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

//! Zstd backend adapter
//!
//! The fast path for binary and mixed chunks. Zstd frames are
//! self-describing, so this backend adds no adapter header: the segment is
//! the frame. Unlike LZMA there are no pseudo-levels; the contract's
//! numeric level feeds the engine directly (floored at 1).

use crate::error::{CodecError, CodecResult};
use crate::{ChunkCodec, CodecAlgorithm, CodecCapabilities};
use tracing::{trace, warn};

/// Highest level accepted by this adapter, matching the contract's range
pub const ZSTD_MAX_LEVEL: u32 = 14;

/// Zstd codec handle. The compress direction carries the derived engine
/// level; decompression reads everything from the frame.
#[derive(Debug)]
pub struct ZstdCodec {
    level: Option<i32>,
}

impl ZstdCodec {
    /// Build a compress-direction handle
    pub fn for_compression(level: &mut u32, threads: u32, _chunk_size: usize) -> CodecResult<Self> {
        if *level > ZSTD_MAX_LEVEL {
            return Err(CodecError::invalid_parameter(format!(
                "level {} above maximum {}",
                level, ZSTD_MAX_LEVEL
            )));
        }
        if threads == 0 {
            return Err(CodecError::invalid_parameter("thread count must be >= 1"));
        }
        Ok(ZstdCodec {
            level: Some((*level).max(1) as i32),
        })
    }

    /// Build a decompress-direction handle
    pub fn for_decompression() -> Self {
        ZstdCodec { level: None }
    }

    /// Capability descriptor for this backend.
    ///
    /// Zstd can expand incompressible input, so compression wants
    /// `compress_bound` headroom over the chunk size in the destination.
    pub fn capabilities(_level: u32, chunk_size: usize) -> CodecCapabilities {
        CodecCapabilities {
            compress_parallel: true,
            decompress_parallel: false,
            decompress_threads: 1,
            output_headroom: zstd::zstd_safe::compress_bound(chunk_size) - chunk_size,
        }
    }
}

impl ChunkCodec for ZstdCodec {
    fn algorithm(&self) -> CodecAlgorithm {
        CodecAlgorithm::Zstd
    }

    fn compress(&self, src: &[u8], dst: &mut [u8], level: u32) -> CodecResult<usize> {
        if level > ZSTD_MAX_LEVEL {
            return Err(CodecError::invalid_parameter(format!(
                "level {} above maximum {}",
                level, ZSTD_MAX_LEVEL
            )));
        }
        if self.level.is_none() {
            return Err(CodecError::invalid_parameter(
                "handle not built for compression",
            ));
        }

        match zstd::bulk::compress_to_buffer(src, dst, level.max(1) as i32) {
            Ok(written) => {
                trace!(srclen = src.len(), dstlen = written, level, "zstd compress");
                Ok(written)
            }
            Err(e) => {
                // A destination at or above compress_bound never runs out of
                // space, so a failure below the bound is a capacity failure.
                if dst.len() < zstd::zstd_safe::compress_bound(src.len()) {
                    Err(CodecError::buffer_too_small(dst.len()))
                } else {
                    warn!(error = %e, "unmapped zstd compress error");
                    Err(CodecError::unknown(-1, e.to_string()))
                }
            }
        }
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize> {
        match zstd::bulk::decompress_to_buffer(src, dst) {
            Ok(written) => {
                trace!(srclen = src.len(), dstlen = written, "zstd decompress");
                Ok(written)
            }
            // Callers size the destination from the chunk header's
            // uncompressed length, so decode failures mean bad input.
            Err(e) => Err(CodecError::corrupt_data(e.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roundtrip_all_levels() {
        let data = b"chunked multi-algorithm lossless compression".repeat(40);
        for requested in 0..=ZSTD_MAX_LEVEL {
            let mut level = requested;
            let codec = ZstdCodec::for_compression(&mut level, 1, data.len()).unwrap();
            assert_eq!(level, requested);

            let mut dst = vec![0u8; zstd::zstd_safe::compress_bound(data.len())];
            let n = codec.compress(&data, &mut dst, level).unwrap();
            assert!(n < data.len());

            let decoder = ZstdCodec::for_decompression();
            let mut out = vec![0u8; data.len()];
            let m = decoder.decompress(&dst[..n], &mut out).unwrap();
            assert_eq!(m, data.len());
            assert_eq!(out, data);
        }
    }

    #[test]
    fn undersized_destination_is_buffer_too_small() {
        let mut level = 3;
        let codec = ZstdCodec::for_compression(&mut level, 1, 1 << 20).unwrap();
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 131 % 256) as u8).collect();
        let mut dst = [0u8; 8];
        let err = codec.compress(&data, &mut dst, level).unwrap_err();
        assert!(err.is_buffer_too_small());
    }

    #[test]
    fn garbage_input_is_corrupt_data() {
        let decoder = ZstdCodec::for_decompression();
        let mut dst = vec![0u8; 256];
        let err = decoder.decompress(b"not a zstd frame", &mut dst).unwrap_err();
        assert!(err.is_corrupt_data());
    }

    #[test]
    fn truncated_frame_is_corrupt_data() {
        let mut level = 3;
        let codec = ZstdCodec::for_compression(&mut level, 1, 1 << 20).unwrap();
        let data = vec![0xABu8; 2000];
        let mut dst = vec![0u8; zstd::zstd_safe::compress_bound(data.len())];
        let n = codec.compress(&data, &mut dst, level).unwrap();

        let decoder = ZstdCodec::for_decompression();
        let mut out = vec![0u8; data.len()];
        let err = decoder.decompress(&dst[..n / 2], &mut out).unwrap_err();
        assert!(err.is_corrupt_data());
    }

    #[test]
    fn empty_chunk_roundtrips() {
        let mut level = 3;
        let codec = ZstdCodec::for_compression(&mut level, 1, 1 << 20).unwrap();
        let mut dst = vec![0u8; 64];
        let n = codec.compress(&[], &mut dst, level).unwrap();
        assert!(n > 0);

        let decoder = ZstdCodec::for_decompression();
        let mut out = Vec::new();
        let m = decoder.decompress(&dst[..n], &mut out).unwrap();
        assert_eq!(m, 0);
    }

    #[test]
    fn level_above_maximum_is_rejected() {
        let mut level = 15;
        let err = ZstdCodec::for_compression(&mut level, 1, 1 << 20).unwrap_err();
        assert!(matches!(err, CodecError::InvalidParameter(_)));
    }

    #[test]
    fn capabilities_require_output_headroom() {
        let caps = ZstdCodec::capabilities(3, 1 << 20);
        assert!(caps.compress_parallel);
        assert!(!caps.decompress_parallel);
        assert!(caps.output_headroom > 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_roundtrip_level_3(data in prop::collection::vec(any::<u8>(), 0..8192)) {
            let mut level = 3;
            let codec = ZstdCodec::for_compression(&mut level, 1, 8192).unwrap();
            let mut dst = vec![0u8; zstd::zstd_safe::compress_bound(data.len())];
            let n = codec.compress(&data, &mut dst, level).unwrap();

            let decoder = ZstdCodec::for_decompression();
            let mut out = vec![0u8; data.len()];
            decoder.decompress(&dst[..n], &mut out).unwrap();
            prop_assert_eq!(out, data);
        }
    }
}
