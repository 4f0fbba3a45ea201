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

//! Compression effectiveness metrics

use serde::{Deserialize, Serialize};

/// Size metrics for one compress call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionMetrics {
    /// Original chunk size in bytes
    pub original_size: usize,
    /// Compressed segment size in bytes (header included)
    pub compressed_size: usize,
    /// Compression ratio (original/compressed, higher is better)
    pub compression_ratio: f64,
    /// Space saved in bytes
    pub space_saved: usize,
    /// Space saved as percentage of the original
    pub space_saved_percent: f64,
}

impl CompressionMetrics {
    /// Create metrics from size information
    pub fn from_sizes(original_size: usize, compressed_size: usize) -> Self {
        let compression_ratio = if compressed_size == 0 {
            1.0
        } else {
            original_size as f64 / compressed_size as f64
        };

        let space_saved = original_size.saturating_sub(compressed_size);
        let space_saved_percent = if original_size == 0 {
            0.0
        } else {
            (space_saved as f64 / original_size as f64) * 100.0
        };

        CompressionMetrics {
            original_size,
            compressed_size,
            compression_ratio,
            space_saved,
            space_saved_percent,
        }
    }
}
