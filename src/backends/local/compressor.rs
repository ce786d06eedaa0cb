// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use bytes::Bytes;

use crate::traits::ArtifactCompressor;

/// Leaves artifacts untouched. Used when no format-aware compressor is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompressor;

impl ArtifactCompressor for PassthroughCompressor {
    fn compress(&self, data: &Bytes, _max_bytes: usize) -> Bytes {
        data.clone()
    }
}
