// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Storage abstraction consumed by the maintenance layer.
//!
//! The clean executor needs exactly one capability from storage: delete a
//! file by path. No atomic rename, no batch delete, no listing is assumed.
//! Concrete backends (local filesystem, object stores) are injected behind
//! the [`Storage`] trait.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, ErrorKind, Result};

/// Narrow file storage interface.
///
/// `delete` returns `Ok(true)` when a file was removed, `Ok(false)` when
/// there was nothing at the path, and an error when the outcome is unknown
/// (for example a permission failure or a network fault). Callers that
/// tolerate partial failure are expected to catch the error per path.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Delete the file at `path`.
    async fn delete(&self, path: &str) -> Result<bool>;
}

/// [`Storage`] backed by the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct LocalStorage;

impl LocalStorage {
    /// Create a new local filesystem storage.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn delete(&self, path: &str) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::new(ErrorKind::Unexpected, "failed to delete file")
                .with_context("path", path)
                .with_source(e)),
        }
    }
}

/// In-memory [`Storage`] holding a set of paths.
///
/// Paths registered through [`MemoryStorage::fail_on`] error on delete,
/// which models storage faults with an unknown outcome.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path`.
    pub fn put(&self, path: impl Into<String>) {
        self.lock_files().insert(path.into());
    }

    /// Make deletes of `path` fail with an error.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.lock_failing().insert(path.into());
    }

    /// Whether a file currently exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.lock_files().contains(path)
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.lock_files().len()
    }

    /// Whether the storage holds no files.
    pub fn is_empty(&self) -> bool {
        self.lock_files().is_empty()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn delete(&self, path: &str) -> Result<bool> {
        if self.lock_failing().contains(path) {
            return Err(Error::new(ErrorKind::Unexpected, "injected delete failure")
                .with_context("path", path));
        }
        Ok(self.lock_files().remove(path))
    }
}
