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

//! LZMA backend adapter
//!
//! Raw LZMA1 over liblzma with a fixed per-segment header. Compression
//! levels 0-9 map onto engine presets; 10-14 are pseudo-levels that select
//! extended dictionary/nice-len/depth presets and are clamped back to 9
//! before reaching the engine.
//!
//! Segment format:
//!
//! ```text
//! Offset Size Description
//!  0     1   LZMA properties byte (lc/lp/pb, packed)
//!  1     4   Dictionary size (little endian)
//!  5         Compressed data, terminated by the end-of-payload marker
//! ```
//!
//! The uncompressed chunk size is not stored here; the upstream chunk
//! header owns it.

use crate::error::{CodecError, CodecResult};
use crate::{ChunkCodec, CodecAlgorithm, CodecCapabilities};
use tracing::{trace, warn};
use liblzma::stream::{Action, Filters, LzmaOptions, Status, Stream};

/// Size of the per-segment header: properties byte + LE32 dictionary size
pub const LZMA_HEADER_SIZE: usize = 5;

/// Highest level accepted by this adapter (pseudo-levels included)
pub const LZMA_MAX_LEVEL: u32 = 14;

/// Highest level the underlying engine accepts; anything above is a
/// pseudo-level and clamps to this
pub const LZMA_ENGINE_LEVEL_CAP: u32 = 9;

/// Default dictionary size below level 8
const DEFAULT_DICT: u32 = 1 << 24;

/// Largest dictionary size a well-formed segment can declare
const MAX_DICT: u32 = 1 << 30;

// Literal/position bit settings shared by every liblzma preset. Fixing them
// here keeps the packed properties byte constant and decodable.
const LZMA_LC: u32 = 3;
const LZMA_LP: u32 = 0;
const LZMA_PB: u32 = 2;

/// Construction-time tuning parameters for the compress direction.
///
/// Derived once from the requested level and immutable afterwards, so a
/// single handle can serve concurrent compress calls without shared
/// mutable state. The per-call numeric level is passed into `compress`
/// instead of being written back here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LzmaProps {
    /// Engine preset level after pseudo-level clamping
    pub level: u32,
    /// Dictionary size handed to the engine and recorded in each segment
    pub dict_size: u32,
    /// Match nice-len ("fast bytes"); 0 leaves the preset default
    pub nice_len: u32,
    /// Match-finder depth ("match cycles"); 0 leaves the preset default
    pub depth: u32,
    /// Worker thread count the caller intends to run; the raw LZMA1 engine
    /// itself is single-threaded per call
    pub threads: u32,
}

impl LzmaProps {
    /// Derive tuning parameters from a requested level (pseudo-levels
    /// included), then clamp the level to the engine cap.
    fn derive(level: u32, threads: u32) -> Self {
        let mut dict_size = if level < 8 {
            DEFAULT_DICT
        } else {
            // Engine-selected: resolved to the preset dictionary below so
            // the segment header carries a concrete value.
            0
        };
        let mut nice_len = 0;
        let mut depth = 0;

        if level < 7 {
            nice_len = 32;
        } else if level < 10 {
            nice_len = 64;
        } else if level == 11 {
            nice_len = 64;
            depth = 128;
        } else if level == 12 {
            nice_len = 128;
            depth = 256;
        } else if level == 13 {
            nice_len = 64;
            depth = 128;
            dict_size = 1 << 27;
        } else if level == 14 {
            nice_len = 128;
            depth = 256;
            dict_size = 1 << 28;
        }

        let level = level.min(LZMA_ENGINE_LEVEL_CAP);
        if dict_size == 0 {
            dict_size = if level == 8 { 1 << 25 } else { 1 << 26 };
        }

        LzmaProps {
            level,
            dict_size,
            nice_len,
            depth,
            threads,
        }
    }
}

/// LZMA codec handle.
///
/// Compress-direction handles carry the derived [`LzmaProps`];
/// decompress-direction handles carry nothing because every decode
/// parameter comes from the segment header. Teardown is `Drop`.
#[derive(Debug)]
pub struct LzmaCodec {
    props: Option<LzmaProps>,
}

impl LzmaCodec {
    /// Build a compress-direction handle.
    ///
    /// Derives the tuning parameters from `level` and clamps pseudo-levels
    /// in place, so the caller's variable reflects the level the engine
    /// will actually see.
    pub fn for_compression(level: &mut u32, threads: u32, _chunk_size: usize) -> CodecResult<Self> {
        if *level > LZMA_MAX_LEVEL {
            return Err(CodecError::invalid_parameter(format!(
                "level {} above maximum {}",
                level, LZMA_MAX_LEVEL
            )));
        }
        if threads == 0 {
            return Err(CodecError::invalid_parameter("thread count must be >= 1"));
        }
        let props = LzmaProps::derive(*level, threads);
        *level = (*level).min(LZMA_ENGINE_LEVEL_CAP);
        Ok(LzmaCodec { props: Some(props) })
    }

    /// Build a decompress-direction handle.
    pub fn for_decompression() -> Self {
        LzmaCodec { props: None }
    }

    /// Capability descriptor for this backend.
    ///
    /// Compression may run on multiple worker threads concurrently through
    /// one handle; decompression is single-threaded and needs no output
    /// headroom beyond the chunk size.
    pub fn capabilities(_level: u32, _chunk_size: usize) -> CodecCapabilities {
        CodecCapabilities {
            compress_parallel: true,
            decompress_parallel: false,
            decompress_threads: 1,
            output_headroom: 0,
        }
    }

    /// Derived tuning parameters, present on compress-direction handles
    pub fn props(&self) -> Option<&LzmaProps> {
        self.props.as_ref()
    }
}

fn encoder_options(props: &LzmaProps, level: u32) -> CodecResult<LzmaOptions> {
    let mut opts =
        LzmaOptions::new_preset(level).map_err(|e| map_engine_error(e, ErrorSite::Setup))?;
    opts.dict_size(props.dict_size);
    if props.nice_len > 0 {
        opts.nice_len(props.nice_len);
    }
    if props.depth > 0 {
        opts.depth(props.depth);
    }
    opts.literal_context_bits(LZMA_LC);
    opts.literal_position_bits(LZMA_LP);
    opts.position_bits(LZMA_PB);
    Ok(opts)
}

impl ChunkCodec for LzmaCodec {
    fn algorithm(&self) -> CodecAlgorithm {
        CodecAlgorithm::Lzma
    }

    fn compress(&self, src: &[u8], dst: &mut [u8], level: u32) -> CodecResult<usize> {
        if level > LZMA_MAX_LEVEL {
            return Err(CodecError::invalid_parameter(format!(
                "level {} above maximum {}",
                level, LZMA_MAX_LEVEL
            )));
        }
        let props = self
            .props
            .as_ref()
            .ok_or_else(|| CodecError::invalid_parameter("handle not built for compression"))?;
        // The header size is statically known, so an undersized destination
        // is rejected before the engine writes anything.
        if dst.len() < LZMA_HEADER_SIZE {
            return Err(CodecError::buffer_too_small(dst.len()));
        }

        let opts = encoder_options(props, level.min(LZMA_ENGINE_LEVEL_CAP))?;
        let mut filters = Filters::new();
        filters.lzma1(&opts);
        let mut stream =
            Stream::new_raw_encoder(&filters).map_err(|e| map_engine_error(e, ErrorSite::Setup))?;

        let (header, payload) = dst.split_at_mut(LZMA_HEADER_SIZE);
        header[0] = pack_props_byte();
        header[1..].copy_from_slice(&props.dict_size.to_le_bytes());

        let capacity = payload.len();
        let mut consumed = 0usize;
        let mut produced = 0usize;
        loop {
            let status = stream
                .process(&src[consumed..], &mut payload[produced..], Action::Finish)
                .map_err(|e| map_encode_error(e, capacity + LZMA_HEADER_SIZE))?;
            consumed = stream.total_in() as usize;
            produced = stream.total_out() as usize;
            match status {
                Status::StreamEnd => break,
                _ if produced == capacity => {
                    return Err(CodecError::buffer_too_small(dst.len()));
                }
                _ => {}
            }
        }

        trace!(
            srclen = src.len(),
            dstlen = LZMA_HEADER_SIZE + produced,
            level,
            "lzma compress"
        );
        Ok(LZMA_HEADER_SIZE + produced)
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize> {
        if src.len() < LZMA_HEADER_SIZE {
            return Err(CodecError::corrupt_data("segment shorter than its header"));
        }
        let (lc, lp, pb) = unpack_props_byte(src[0])?;
        let dict_size = u32::from_le_bytes([src[1], src[2], src[3], src[4]]);
        if dict_size == 0 || dict_size > MAX_DICT {
            return Err(CodecError::corrupt_data(format!(
                "implausible dictionary size {} in segment header",
                dict_size
            )));
        }

        let mut opts = LzmaOptions::new_preset(0)
            .map_err(|e| map_engine_error(e, ErrorSite::Setup))?;
        opts.dict_size(dict_size);
        opts.literal_context_bits(lc);
        opts.literal_position_bits(lp);
        opts.position_bits(pb);
        let mut filters = Filters::new();
        filters.lzma1(&opts);
        let mut stream = Stream::new_raw_decoder(&filters)
            .map_err(|e| map_engine_error(e, ErrorSite::Decode))?;

        let payload = &src[LZMA_HEADER_SIZE..];
        let mut consumed = 0usize;
        let mut produced = 0usize;
        loop {
            let before = (consumed, produced);
            match stream.process(&payload[consumed..], &mut dst[produced..], Action::Finish) {
                Ok(status) => {
                    consumed = stream.total_in() as usize;
                    produced = stream.total_out() as usize;
                    match status {
                        Status::StreamEnd => break,
                        _ if (consumed, produced) == before => {
                            return Err(stalled_decode(consumed, produced, payload, dst));
                        }
                        _ => {}
                    }
                }
                Err(e) => return Err(map_engine_error(e, ErrorSite::Decode)),
            }
        }

        trace!(srclen = src.len(), dstlen = produced, "lzma decompress");
        Ok(produced)
    }
}

/// Pack the lc/lp/pb triple into the single-byte wire encoding.
fn pack_props_byte() -> u8 {
    ((LZMA_PB * 5 + LZMA_LP) * 9 + LZMA_LC) as u8
}

/// Decode and validate a wire properties byte.
fn unpack_props_byte(b: u8) -> CodecResult<(u32, u32, u32)> {
    let b = b as u32;
    if b >= 225 {
        return Err(CodecError::corrupt_data(format!(
            "invalid LZMA properties byte 0x{:02x}",
            b
        )));
    }
    let lc = b % 9;
    let rest = b / 9;
    let lp = rest % 5;
    let pb = rest / 5;
    Ok((lc, lp, pb))
}

/// A decoder that can make no further progress is either out of output
/// space (destination full, input remaining) or looking at a truncated
/// payload.
fn stalled_decode(consumed: usize, produced: usize, payload: &[u8], dst: &[u8]) -> CodecError {
    if produced == dst.len() && consumed < payload.len() {
        CodecError::buffer_too_small(dst.len())
    } else {
        CodecError::corrupt_data("truncated LZMA payload")
    }
}

/// Where an engine error surfaced; decode-side option rejections mean the
/// wire header was bad, not the caller's arguments.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ErrorSite {
    Setup,
    Decode,
}

fn map_engine_error(e: liblzma::stream::Error, site: ErrorSite) -> CodecError {
    use liblzma::stream::Error;
    match e {
        Error::Mem | Error::MemLimit => CodecError::OutOfMemory,
        Error::Options if site == ErrorSite::Decode => {
            CodecError::corrupt_data("engine rejected segment header parameters")
        }
        Error::Options => CodecError::invalid_parameter("engine rejected encoder options"),
        Error::Data | Error::Format => CodecError::corrupt_data(e.to_string()),
        other => {
            let code = raw_engine_code(&other);
            warn!(code, error = %other, "unmapped liblzma error");
            CodecError::unknown(code, other.to_string())
        }
    }
}

fn map_encode_error(e: liblzma::stream::Error, _dst_capacity: usize) -> CodecError {
    // A genuine engine error during encode. Output-full stalls never reach
    // here: liblzma surfaces them as `Ok(Status::MemNeeded)`, which the
    // compress loop detects via its `produced == capacity` guard.
    map_engine_error(e, ErrorSite::Setup)
}

/// liblzma `lzma_ret` numeric values, preserved for the `Unknown` kind.
fn raw_engine_code(e: &liblzma::stream::Error) -> i32 {
    use liblzma::stream::Error;
    match e {
        Error::NoCheck => 2,
        Error::UnsupportedCheck => 3,
        Error::Mem => 5,
        Error::MemLimit => 6,
        Error::Format => 7,
        Error::Options => 8,
        Error::Data => 9,
        Error::Program => 11,
    }
}
