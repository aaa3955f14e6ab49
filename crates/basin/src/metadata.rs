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

//! Persisted table metadata: version marker and property set.
//!
//! The upgrade/downgrade engine reads the current version from here and
//! writes back the merged properties together with the new version marker.
//! A commit is a single atomic unit: a concurrent reader never observes new
//! properties paired with the old version code. [`FileMetadataStore`] gets
//! this from a write-to-temp-then-rename; other backends must provide an
//! equivalent guarantee.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::{TableProperties, TableVersion};
use crate::{Error, ErrorKind, Result};

/// Table metadata as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Unique identifier of the table, fixed at creation.
    pub table_uuid: Uuid,
    /// On-disk metadata schema revision.
    pub version: TableVersion,
    /// String properties persisted with the table.
    pub properties: HashMap<String, String>,
}

impl TableMetadata {
    /// Create metadata for a fresh table at version zero with the default
    /// property set.
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION.to_string(),
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION_DEFAULT.to_string(),
        );
        properties.insert(
            TableProperties::PROPERTY_PARTITION_FIELDS.to_string(),
            TableProperties::PROPERTY_PARTITION_FIELDS_DEFAULT.to_string(),
        );
        properties.insert(
            TableProperties::PROPERTY_POPULATE_META_FIELDS.to_string(),
            TableProperties::PROPERTY_POPULATE_META_FIELDS_DEFAULT.to_string(),
        );
        Self {
            table_uuid: Uuid::new_v4(),
            version: TableVersion::Zero,
            properties,
        }
    }

    /// Typed view over the property map.
    pub fn table_properties(&self) -> Result<TableProperties> {
        TableProperties::try_from(&self.properties)
    }
}

impl Default for TableMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Store for persisted table metadata.
///
/// `commit` must apply the whole metadata snapshot atomically with respect
/// to concurrent `load` calls.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Load the current table metadata.
    async fn load(&self) -> Result<TableMetadata>;

    /// Persist `metadata`, replacing the previous snapshot atomically.
    async fn commit(&self, metadata: &TableMetadata) -> Result<()>;
}

/// [`MetadataStore`] persisting metadata as a JSON file.
///
/// Commits write a sibling temp file and rename it over the target, so a
/// reader sees either the old or the new snapshot, never a mix.
#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    path: PathBuf,
}

impl FileMetadataStore {
    /// Create a store over the metadata file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the metadata file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn load(&self) -> Result<TableMetadata> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::new(ErrorKind::Unexpected, "failed to read table metadata")
                .with_context("path", self.path.display().to_string())
                .with_source(e)
        })?;
        let metadata = serde_json::from_slice(&bytes)?;
        Ok(metadata)
    }

    async fn commit(&self, metadata: &TableMetadata) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(metadata)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes).await.map_err(|e| {
            Error::new(ErrorKind::Unexpected, "failed to stage table metadata")
                .with_context("path", tmp_path.display().to_string())
                .with_source(e)
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::new(ErrorKind::Unexpected, "failed to publish table metadata")
                .with_context("path", self.path.display().to_string())
                .with_source(e)
        })?;
        Ok(())
    }
}

/// In-memory [`MetadataStore`] with commit failure injection.
#[derive(Debug)]
pub struct MemoryMetadataStore {
    inner: Mutex<TableMetadata>,
    fail_commits: Mutex<bool>,
}

impl MemoryMetadataStore {
    /// Create a store seeded with `metadata`.
    pub fn new(metadata: TableMetadata) -> Self {
        Self {
            inner: Mutex::new(metadata),
            fail_commits: Mutex::new(false),
        }
    }

    /// Make all subsequent commits fail.
    pub fn fail_commits(&self, fail: bool) {
        *self
            .fail_commits
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = fail;
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn load(&self) -> Result<TableMetadata> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn commit(&self, metadata: &TableMetadata) -> Result<()> {
        if *self.fail_commits.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(Error::new(
                ErrorKind::Unexpected,
                "injected metadata commit failure",
            ));
        }
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = metadata.clone();
        Ok(())
    }
}
