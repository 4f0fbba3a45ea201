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

//! Codec and filter error types

use thiserror::Error;

/// Result type alias for codec and filter operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during classification, filtering, compression
/// and decompression
///
/// The kinds mirror what the underlying engines can report. `BufferTooSmall`
/// is the only kind a caller is expected to recover from locally (retry with
/// a larger destination); `Unsupported` signals that the caller should fall
/// back to another path (untransformed buffer, different backend).
#[derive(Error, Debug)]
pub enum CodecError {
    /// Allocation failure inside a compression engine
    #[error("engine out of memory")]
    OutOfMemory,

    /// Malformed level, thread count or size argument
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Destination buffer capacity is insufficient
    #[error("destination buffer too small: need more than {capacity} bytes")]
    BufferTooSmall {
        /// Capacity the caller supplied
        capacity: usize,
    },

    /// Input or parameter combination this backend/filter cannot handle
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// Decompression encountered invalid or truncated encoded data
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Engine-specific error with no mapped category
    #[error("unmapped engine error (code {code}): {message}")]
    Unknown {
        /// Raw engine error code
        code: i32,
        /// Engine-provided description, if any
        message: String,
    },
}

impl CodecError {
    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        CodecError::InvalidParameter(msg.into())
    }

    /// Create a buffer too small error for the given destination capacity
    pub fn buffer_too_small(capacity: usize) -> Self {
        CodecError::BufferTooSmall { capacity }
    }

    /// Create an unsupported input error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        CodecError::Unsupported(msg.into())
    }

    /// Create a corrupt data error
    pub fn corrupt_data<S: Into<String>>(msg: S) -> Self {
        CodecError::CorruptData(msg.into())
    }

    /// Create an unmapped engine error carrying the raw code
    pub fn unknown<S: Into<String>>(code: i32, message: S) -> Self {
        CodecError::Unknown {
            code,
            message: message.into(),
        }
    }

    /// Check if this is a buffer too small error (recoverable at the caller)
    pub fn is_buffer_too_small(&self) -> bool {
        matches!(self, CodecError::BufferTooSmall { .. })
    }

    /// Check if this is an unsupported input error (caller should fall back)
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CodecError::Unsupported(_))
    }

    /// Check if this is a corrupt data error
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, CodecError::CorruptData(_))
    }
}
