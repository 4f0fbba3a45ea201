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

//! Chunk content classification
//!
//! A single-pass byte distribution heuristic that steers filter and codec
//! selection. Classification is coarse on purpose: the downstream decision
//! is only "text-oriented path" vs "binary-oriented path".

use crate::CodecAlgorithm;

/// Coarse content classification of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Plain text: no high-bit bytes, mostly printable
    Text,
    /// Binary or mixed content (the default path)
    Unknown,
}

/// Classify a chunk by its byte distribution.
///
/// Scans the buffer once, counting bytes with the most-significant bit set
/// and control bytes (value < 32). The chunk is `Text` when no high-bit
/// byte occurs and strictly less than 7/8 of the buffer is control bytes;
/// everything else, including an empty buffer, is `Unknown`.
///
/// Pure function of the buffer contents: the same bytes always classify
/// the same way.
pub fn classify(buf: &[u8]) -> ContentType {
    let mut high_bits: u64 = 0;
    let mut control: u64 = 0;

    // Accumulate without branching so the loop can auto-vectorize.
    for &b in buf {
        high_bits += (b & 0x80) as u64;
        control += (b < 32) as u64;
    }
    high_bits /= 0x80;

    let len = buf.len() as u64;
    if high_bits == 0 && control < (len >> 1) + (len >> 2) + (len >> 3) {
        ContentType::Text
    } else {
        ContentType::Unknown
    }
}

/// Pick the backend best suited to a content class.
///
/// Text routes to the high-ratio backend, binary/mixed to the fast one.
/// Callers holding richer metadata (e.g. "this chunk is executable code")
/// are free to override this.
pub fn codec_for_content(content: ContentType) -> CodecAlgorithm {
    match content {
        ContentType::Text => CodecAlgorithm::Lzma,
        ContentType::Unknown => CodecAlgorithm::Zstd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_printable_classifies_as_text() {
        let data = b"The quick brown fox jumps over the lazy dog.".repeat(20);
        assert_eq!(classify(&data), ContentType::Text);
    }

    #[test]
    fn repeated_letter_classifies_as_text() {
        let data = vec![b'a'; 1000];
        assert_eq!(classify(&data), ContentType::Text);
    }

    #[test]
    fn high_bit_bytes_classify_as_unknown() {
        // ~50% of bytes have the MSB set, like random binary data
        let data: Vec<u8> = (0..1000).map(|i| (i * 37 % 256) as u8).collect();
        assert!(data.iter().filter(|&&b| b & 0x80 != 0).count() > 400);
        assert_eq!(classify(&data), ContentType::Unknown);
    }

    #[test]
    fn single_high_bit_byte_defeats_text() {
        let mut data = vec![b'x'; 512];
        data[300] = 0xC3;
        assert_eq!(classify(&data), ContentType::Unknown);
    }

    #[test]
    fn mostly_control_bytes_classify_as_unknown() {
        // 15/16 control bytes exceeds the 7/8 bound
        let data: Vec<u8> = (0..1024)
            .map(|i| if i % 16 == 0 { b' ' } else { 0x01 })
            .collect();
        assert_eq!(classify(&data), ContentType::Unknown);
    }

    #[test]
    fn text_with_newlines_stays_text() {
        let data = b"line one\nline two\r\nline three\n".repeat(30);
        assert_eq!(classify(&data), ContentType::Text);
    }

    #[test]
    fn empty_buffer_is_unknown() {
        assert_eq!(classify(&[]), ContentType::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let data: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        assert_eq!(classify(&data), classify(&data));
    }

    #[test]
    fn steering_prefers_lzma_for_text() {
        assert_eq!(codec_for_content(ContentType::Text), CodecAlgorithm::Lzma);
        assert_eq!(codec_for_content(ContentType::Unknown), CodecAlgorithm::Zstd);
    }
}
