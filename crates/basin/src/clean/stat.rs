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

//! Per-partition accounting of delete outcomes.
//!
//! [`PartitionCleanStat`] is the mutable accumulator workers feed while a
//! clean run executes; [`CleanStat`] is the immutable record handed to the
//! commit writer once a partition is finalized. Merging accumulators is
//! commutative and associative over the recorded path multisets, which is
//! what makes the finalized output independent of task completion order.

use serde::{Deserialize, Serialize};

use super::plan::CleanerPolicy;
use crate::spec::ActionInstant;
use crate::{Error, ErrorKind, Result};

/// Mutable per-partition accumulator of delete outcomes.
///
/// Six append-only sequences: patterns, successes and failures for regular
/// data files, and the parallel triple for bootstrap-base files. Sequences
/// never shrink within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionCleanStat {
    partition_path: String,
    delete_path_patterns: Vec<String>,
    success_delete_files: Vec<String>,
    failed_delete_files: Vec<String>,
    delete_bootstrap_base_path_patterns: Vec<String>,
    success_delete_bootstrap_base_files: Vec<String>,
    failed_delete_bootstrap_base_files: Vec<String>,
}

impl PartitionCleanStat {
    /// Create an empty accumulator for `partition_path`.
    pub fn new(partition_path: impl Into<String>) -> Self {
        Self {
            partition_path: partition_path.into(),
            ..Default::default()
        }
    }

    /// Partition this accumulator belongs to.
    pub fn partition_path(&self) -> &str {
        &self.partition_path
    }

    /// Record a delete pattern that was attempted.
    pub fn add_delete_pattern(&mut self, path: impl Into<String>, is_bootstrap: bool) {
        if is_bootstrap {
            self.delete_bootstrap_base_path_patterns.push(path.into());
        } else {
            self.delete_path_patterns.push(path.into());
        }
    }

    /// Record the outcome of a delete attempt.
    ///
    /// `succeeded` is `None` when the underlying delete call raised an error
    /// instead of returning a definite boolean; that is recorded as a
    /// failure, never dropped, so the audit trail covers every attempt.
    pub fn add_delete_result(
        &mut self,
        path: impl Into<String>,
        succeeded: Option<bool>,
        is_bootstrap: bool,
    ) {
        let target = match (succeeded.unwrap_or(false), is_bootstrap) {
            (true, false) => &mut self.success_delete_files,
            (false, false) => &mut self.failed_delete_files,
            (true, true) => &mut self.success_delete_bootstrap_base_files,
            (false, true) => &mut self.failed_delete_bootstrap_base_files,
        };
        target.push(path.into());
    }

    /// Merge another accumulator for the same partition into this one.
    ///
    /// Concatenates the six sequences. Commutative and associative as
    /// multisets of recorded paths, so the result is independent of the
    /// order concurrent producers completed in.
    pub fn merge(mut self, other: PartitionCleanStat) -> Result<PartitionCleanStat> {
        if self.partition_path != other.partition_path {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "cannot merge clean stats of different partitions",
            )
            .with_context("left", self.partition_path)
            .with_context("right", other.partition_path));
        }
        self.delete_path_patterns.extend(other.delete_path_patterns);
        self.success_delete_files.extend(other.success_delete_files);
        self.failed_delete_files.extend(other.failed_delete_files);
        self.delete_bootstrap_base_path_patterns
            .extend(other.delete_bootstrap_base_path_patterns);
        self.success_delete_bootstrap_base_files
            .extend(other.success_delete_bootstrap_base_files);
        self.failed_delete_bootstrap_base_files
            .extend(other.failed_delete_bootstrap_base_files);
        Ok(self)
    }

    /// Recorded regular delete patterns.
    pub fn delete_path_patterns(&self) -> &[String] {
        &self.delete_path_patterns
    }

    /// Regular files deleted successfully.
    pub fn success_delete_files(&self) -> &[String] {
        &self.success_delete_files
    }

    /// Regular files whose delete failed or had an unknown outcome.
    pub fn failed_delete_files(&self) -> &[String] {
        &self.failed_delete_files
    }

    /// Recorded bootstrap-base delete patterns.
    pub fn delete_bootstrap_base_path_patterns(&self) -> &[String] {
        &self.delete_bootstrap_base_path_patterns
    }

    /// Bootstrap-base files deleted successfully.
    pub fn success_delete_bootstrap_base_files(&self) -> &[String] {
        &self.success_delete_bootstrap_base_files
    }

    /// Bootstrap-base files whose delete failed or had an unknown outcome.
    pub fn failed_delete_bootstrap_base_files(&self) -> &[String] {
        &self.failed_delete_bootstrap_base_files
    }
}

/// Finalized, immutable clean accounting for one partition.
///
/// Exactly one of these is produced per partition key of the input plan,
/// including partitions that contributed zero delete tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanStat {
    /// Policy the clean run was configured with.
    pub policy: CleanerPolicy,
    /// Partition this stat describes.
    pub partition_path: String,
    /// Earliest instant retained by the plan, if any.
    pub earliest_commit_retained: Option<ActionInstant>,
    /// Patterns of regular files the run attempted to delete.
    pub delete_path_patterns: Vec<String>,
    /// Regular files deleted successfully.
    pub success_delete_files: Vec<String>,
    /// Regular files whose delete failed.
    pub failed_delete_files: Vec<String>,
    /// Patterns of bootstrap-base files the run attempted to delete.
    pub delete_bootstrap_base_path_patterns: Vec<String>,
    /// Bootstrap-base files deleted successfully.
    pub success_delete_bootstrap_base_files: Vec<String>,
    /// Bootstrap-base files whose delete failed.
    pub failed_delete_bootstrap_base_files: Vec<String>,
}

impl CleanStat {
    /// Finalize a partition accumulator into an immutable stat.
    pub fn from_partition_stat(
        policy: CleanerPolicy,
        earliest_commit_retained: Option<ActionInstant>,
        stat: PartitionCleanStat,
    ) -> Self {
        Self {
            policy,
            partition_path: stat.partition_path,
            earliest_commit_retained,
            delete_path_patterns: stat.delete_path_patterns,
            success_delete_files: stat.success_delete_files,
            failed_delete_files: stat.failed_delete_files,
            delete_bootstrap_base_path_patterns: stat.delete_bootstrap_base_path_patterns,
            success_delete_bootstrap_base_files: stat.success_delete_bootstrap_base_files,
            failed_delete_bootstrap_base_files: stat.failed_delete_bootstrap_base_files,
        }
    }

    /// Stat for a partition the plan named but that produced no tasks.
    pub fn empty(
        policy: CleanerPolicy,
        partition_path: impl Into<String>,
        earliest_commit_retained: Option<ActionInstant>,
    ) -> Self {
        Self::from_partition_stat(
            policy,
            earliest_commit_retained,
            PartitionCleanStat::new(partition_path),
        )
    }

    /// Number of delete attempts recorded for this partition.
    pub fn total_attempted(&self) -> usize {
        self.success_delete_files.len()
            + self.failed_delete_files.len()
            + self.success_delete_bootstrap_base_files.len()
            + self.failed_delete_bootstrap_base_files.len()
    }

    /// Number of successful deletes, regular and bootstrap.
    pub fn total_succeeded(&self) -> usize {
        self.success_delete_files.len() + self.success_delete_bootstrap_base_files.len()
    }

    /// Number of failed deletes, regular and bootstrap.
    pub fn total_failed(&self) -> usize {
        self.failed_delete_files.len() + self.failed_delete_bootstrap_base_files.len()
    }
}

/// Aggregate accounting over the stats of one clean run, for the commit
/// writer that consumes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRunSummary {
    /// Partitions the run reported on.
    pub partitions: usize,
    /// Delete attempts across all partitions.
    pub attempted: usize,
    /// Successful deletes across all partitions.
    pub succeeded: usize,
    /// Failed deletes across all partitions.
    pub failed: usize,
}

impl CleanRunSummary {
    /// Summarize the stats of one clean run.
    pub fn of(stats: &[CleanStat]) -> Self {
        Self {
            partitions: stats.len(),
            attempted: stats.iter().map(CleanStat::total_attempted).sum(),
            succeeded: stats.iter().map(CleanStat::total_succeeded).sum(),
            failed: stats.iter().map(CleanStat::total_failed).sum(),
        }
    }

    /// Whether every attempted delete succeeded.
    pub fn is_fully_successful(&self) -> bool {
        self.failed == 0
    }
}
