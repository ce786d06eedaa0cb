// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::StorageError;
use crate::traits::StorageSink;

/// Reject names that would escape the run directory.
fn check_component(name: &str, filename: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(StorageError::Rejected {
            filename: filename.to_string(),
            reason: format!("'{}' is not a plain path component", name),
        });
    }
    Ok(())
}

/// Stores artifacts as `<root>/<run_id>/<filename>`.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageSink for FileSystemStorage {
    async fn save(&self, run_id: &str, filename: &str, data: &Bytes) -> Result<String, StorageError> {
        check_component(run_id, filename)?;
        check_component(filename, filename)?;

        let directory = self.root.join(run_id);
        tokio::fs::create_dir_all(&directory).await?;
        let path = directory.join(filename);
        tokio::fs::write(&path, data).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Keeps artifacts in memory, addressed as `memory://<run_id>/<filename>`.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    artifacts: Mutex<HashMap<(String, String), Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, run_id: &str, filename: &str) -> Option<Bytes> {
        self.artifacts
            .lock()
            .get(&(run_id.to_string(), filename.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.lock().is_empty()
    }
}

#[async_trait]
impl StorageSink for InMemoryStorage {
    async fn save(&self, run_id: &str, filename: &str, data: &Bytes) -> Result<String, StorageError> {
        check_component(run_id, filename)?;
        check_component(filename, filename)?;
        self.artifacts
            .lock()
            .insert((run_id.to_string(), filename.to_string()), data.clone());
        Ok(format!("memory://{}/{}", run_id, filename))
    }
}
