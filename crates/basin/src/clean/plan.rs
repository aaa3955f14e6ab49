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

//! Cleaner plan: the precomputed description of which files are safe to
//! delete, keyed by partition.
//!
//! Plan construction (retention policy evaluation) happens upstream; this
//! module only models the plan the executor consumes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MaintenanceConfig;
use crate::spec::ActionInstant;
use crate::{Error, ErrorKind};

/// Retention policy token.
///
/// Carried opaquely through the clean executor and recorded into every
/// finalized [`CleanStat`](crate::clean::CleanStat); the executor never
/// interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanerPolicy {
    /// Retain the files referenced by the last N commits.
    #[default]
    KeepLatestCommits,
    /// Retain the last N versions of each file group.
    KeepLatestFileVersions,
    /// Retain files newer than a wall-clock window.
    KeepLatestByHours,
}

impl fmt::Display for CleanerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanerPolicy::KeepLatestCommits => "KEEP_LATEST_COMMITS",
            CleanerPolicy::KeepLatestFileVersions => "KEEP_LATEST_FILE_VERSIONS",
            CleanerPolicy::KeepLatestByHours => "KEEP_LATEST_BY_HOURS",
        };
        f.write_str(s)
    }
}

impl FromStr for CleanerPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "KEEP_LATEST_COMMITS" => Ok(CleanerPolicy::KeepLatestCommits),
            "KEEP_LATEST_FILE_VERSIONS" => Ok(CleanerPolicy::KeepLatestFileVersions),
            "KEEP_LATEST_BY_HOURS" => Ok(CleanerPolicy::KeepLatestByHours),
            other => Err(Error::new(ErrorKind::DataInvalid, "unknown cleaner policy")
                .with_context("policy", other)),
        }
    }
}

/// One candidate file within a partition of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanFileInfo {
    /// Path of the file to delete. Table-relative for regular data files,
    /// absolute for bootstrap-base files.
    pub file_path: String,
    /// Whether the file is a bootstrap-base file living outside the
    /// table's own directory tree.
    pub is_bootstrap_base_file: bool,
}

impl CleanFileInfo {
    /// Create info for a regular data file.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            is_bootstrap_base_file: false,
        }
    }

    /// Create info for a bootstrap-base file.
    pub fn bootstrap(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            is_bootstrap_base_file: true,
        }
    }
}

/// One delete task produced by flattening the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanFileTask {
    /// Partition the file belongs to.
    pub partition_path: String,
    /// Path of the file to delete.
    pub file_path: String,
    /// Whether this is a bootstrap-base file.
    pub is_bootstrap_base_file: bool,
}

/// The cleaner plan consumed by the executor.
///
/// A partition key with an empty file list is meaningful: the executor still
/// emits a (all-empty) stat for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanerPlan {
    /// Candidate files per partition path.
    pub files_to_delete_per_partition: HashMap<String, Vec<CleanFileInfo>>,
    /// Earliest instant the retention policy keeps, if any.
    pub earliest_instant_to_retain: Option<ActionInstant>,
    /// Policy that produced this plan.
    pub policy: CleanerPolicy,
}

impl CleanerPlan {
    /// Create an empty plan for the given policy.
    pub fn new(policy: CleanerPolicy) -> Self {
        Self {
            files_to_delete_per_partition: HashMap::new(),
            earliest_instant_to_retain: None,
            policy,
        }
    }

    /// Create an empty plan carrying the configured cleaner policy.
    pub fn from_config(config: &MaintenanceConfig) -> Self {
        Self::new(config.cleaner_policy)
    }

    /// Set the earliest retained instant.
    #[must_use]
    pub fn with_earliest_instant(mut self, instant: ActionInstant) -> Self {
        self.earliest_instant_to_retain = Some(instant);
        self
    }

    /// Add a partition with its candidate files. An empty `files` list marks
    /// the partition as touched with nothing to delete.
    #[must_use]
    pub fn with_partition(
        mut self,
        partition_path: impl Into<String>,
        files: Vec<CleanFileInfo>,
    ) -> Self {
        self.files_to_delete_per_partition
            .insert(partition_path.into(), files);
        self
    }

    /// Whether the plan names no partitions at all.
    pub fn is_empty(&self) -> bool {
        self.files_to_delete_per_partition.is_empty()
    }

    /// Total number of candidate files across all partitions.
    pub fn total_files(&self) -> usize {
        self.files_to_delete_per_partition
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Flatten the plan into one delete task per candidate file.
    pub fn flatten(&self) -> Vec<CleanFileTask> {
        self.files_to_delete_per_partition
            .iter()
            .flat_map(|(partition_path, files)| {
                files.iter().map(move |info| CleanFileTask {
                    partition_path: partition_path.clone(),
                    file_path: info.file_path.clone(),
                    is_bootstrap_base_file: info.is_bootstrap_base_file,
                })
            })
            .collect()
    }
}
