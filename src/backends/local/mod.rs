// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod artifact;
pub mod compressor;
pub mod factory;
pub mod storage;
pub mod text;

pub use artifact::SvgPlaceholderGenerator;
pub use compressor::PassthroughCompressor;
pub use factory::LocalBackendFactory;
pub use storage::{FileSystemStorage, InMemoryStorage};
pub use text::EchoTextGenerator;
