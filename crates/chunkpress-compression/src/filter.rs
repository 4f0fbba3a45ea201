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

//! Reversible pre-compression transforms
//!
//! A filter losslessly rewrites a chunk to expose redundancy a generic
//! codec cannot find on its own, and is undone after decompression. Filters
//! are orthogonal to codec choice: any backend may run on filtered output.
//! Selection is driven by content type or by upstream metadata (e.g. "this
//! chunk is executable code"), never by the codec.

use crate::error::{CodecError, CodecResult};
use std::fmt::Debug;
use tracing::debug;

/// A lossless, invertible buffer transform.
///
/// For every buffer `b` accepted by `encode`, `decode(encode(b))` must
/// reproduce `b` byte for byte. `encode` may refuse unsuitable input with
/// [`CodecError::Unsupported`]; the caller then compresses the untransformed
/// buffer instead. Neither direction mutates the source.
pub trait ReversibleFilter: Send + Sync + Debug {
    /// Transform `src` into `dst`, returning the bytes written.
    ///
    /// Fails with [`CodecError::BufferTooSmall`] if the transformed output
    /// cannot fit in `dst`, without writing partial output in that case.
    fn encode(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize>;

    /// Invert a previous `encode`, returning the bytes written.
    fn decode(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize>;
}

/// What happened when a filter was offered a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The filter transformed the chunk; payload length in `dst`
    Transformed(usize),
    /// The filter refused the chunk; compress the original buffer
    Passthrough,
}

/// Run a filter, treating `Unsupported` as a clean fallback.
///
/// Any other error (including `BufferTooSmall`) propagates: those indicate
/// caller bugs or real failures, not unsuitable content.
pub fn encode_or_passthrough(
    filter: &dyn ReversibleFilter,
    src: &[u8],
    dst: &mut [u8],
) -> CodecResult<FilterOutcome> {
    match filter.encode(src, dst) {
        Ok(written) => Ok(FilterOutcome::Transformed(written)),
        Err(CodecError::Unsupported(reason)) => {
            debug!("filter refused chunk ({reason}), falling back to untransformed path");
            Ok(FilterOutcome::Passthrough)
        }
        Err(e) => Err(e),
    }
}

/// Branch opcodes rewritten by [`ExecFilter`]: CALL rel32 and JMP rel32.
const CALL_REL32: u8 = 0xE8;
const JMP_REL32: u8 = 0xE9;

/// Smallest buffer that can hold one opcode plus a rel32 operand.
const MIN_EXEC_LEN: usize = 5;

/// x86 branch-target normalization filter.
///
/// Relative call/jump displacements differ at every call site even when they
/// target the same address, which defeats match-finding. Rewriting each
/// rel32 operand to the absolute target address turns repeated targets into
/// repeated byte patterns. The transform is size-preserving and exactly
/// invertible because both directions skip operand bytes identically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecFilter;

impl ExecFilter {
    /// Create the filter
    pub fn new() -> Self {
        ExecFilter
    }
}

impl ReversibleFilter for ExecFilter {
    fn encode(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize> {
        if src.len() < MIN_EXEC_LEN {
            return Err(CodecError::unsupported(
                "buffer too short to contain a rel32 branch",
            ));
        }
        if dst.len() < src.len() {
            return Err(CodecError::buffer_too_small(dst.len()));
        }

        let mut sites = 0u64;
        let mut i = 0;
        while i + MIN_EXEC_LEN <= src.len() {
            let op = src[i];
            dst[i] = op;
            if op == CALL_REL32 || op == JMP_REL32 {
                let rel = u32::from_le_bytes([src[i + 1], src[i + 2], src[i + 3], src[i + 4]]);
                let abs = rel.wrapping_add(i as u32 + 5);
                dst[i + 1..i + 5].copy_from_slice(&abs.to_le_bytes());
                sites += 1;
                i += 5;
            } else {
                i += 1;
            }
        }
        dst[i..src.len()].copy_from_slice(&src[i..]);

        if sites == 0 {
            return Err(CodecError::unsupported("no rel32 branch sites in buffer"));
        }
        Ok(src.len())
    }

    fn decode(&self, src: &[u8], dst: &mut [u8]) -> CodecResult<usize> {
        if dst.len() < src.len() {
            return Err(CodecError::buffer_too_small(dst.len()));
        }

        let mut i = 0;
        while i + MIN_EXEC_LEN <= src.len() {
            let op = src[i];
            dst[i] = op;
            if op == CALL_REL32 || op == JMP_REL32 {
                let abs = u32::from_le_bytes([src[i + 1], src[i + 2], src[i + 3], src[i + 4]]);
                let rel = abs.wrapping_sub(i as u32 + 5);
                dst[i + 1..i + 5].copy_from_slice(&rel.to_le_bytes());
                i += 5;
            } else {
                i += 1;
            }
        }
        dst[i..src.len()].copy_from_slice(&src[i..]);
        Ok(src.len())
    }
}
