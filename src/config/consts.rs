// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Directory filesystem storage writes under when the config names none.
pub const DEFAULT_STORAGE_ROOT: &str = "history";
/// Default log filter for the binary when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";
