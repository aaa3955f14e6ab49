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

//! Execution of a cleaner plan.
//!
//! # Algorithm
//!
//! 1. Flatten the plan into one [`CleanFileTask`] per candidate file.
//! 2. Run every task through the injected [`ExecutionContext`]. Each task
//!    performs exactly one delete call; an error from storage is caught,
//!    logged and recorded as an unknown outcome, and never aborts sibling
//!    tasks or the run.
//! 3. Reduce the task outcomes sequentially: each outcome becomes a
//!    single-record partition accumulator, folded per partition with the
//!    associative [`PartitionCleanStat::merge`]. Workers therefore never
//!    contend on shared accumulators.
//! 4. Emit one [`CleanStat`] per partition key of the plan, all-empty for
//!    partitions that produced no tasks.
//!
//! # Failure model
//!
//! Per-file failures are data, not errors: they surface in the finalized
//! stats' failed-delete sequences. The only fatal path is a fault of the
//! execution substrate itself, which propagates unmodified. The plan is
//! never rolled back based on individual file failures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tracing::{debug, warn};

use super::plan::{CleanFileTask, CleanerPlan};
use super::stat::{CleanStat, PartitionCleanStat};
use crate::config::MaintenanceConfig;
use crate::engine::{ConcurrentContext, ExecutionContext};
use crate::io::Storage;
use crate::Result;

/// Progress event emitted during a clean run.
#[derive(Debug, Clone)]
pub enum CleanProgressEvent {
    /// The plan has been flattened into delete tasks.
    TasksPlanned {
        /// Number of partitions named by the plan.
        partitions: usize,
        /// Number of delete tasks to execute.
        tasks: usize,
    },
    /// Delete tasks are completing.
    DeletingFiles {
        /// Number of completed tasks so far.
        completed: usize,
        /// Total number of tasks.
        total: usize,
    },
}

/// Callback for progress events during a clean run.
pub type CleanProgressCallback = Arc<dyn Fn(CleanProgressEvent) + Send + Sync>;

/// Outcome of one delete task.
///
/// `succeeded` is `None` when the delete call errored rather than returning
/// a definite boolean.
#[derive(Debug, Clone)]
struct TaskOutcome {
    task: CleanFileTask,
    succeeded: Option<bool>,
}

impl TaskOutcome {
    /// Fold this outcome into a single-record partition accumulator.
    ///
    /// Regular files are recorded by bare file name (patterns stay valid
    /// across historical path prefixes); bootstrap-base files keep the full
    /// path because they live outside the table's directory tree.
    fn into_partition_stat(self) -> PartitionCleanStat {
        let pattern = if self.task.is_bootstrap_base_file {
            self.task.file_path.clone()
        } else {
            file_name(&self.task.file_path)
        };
        let mut stat = PartitionCleanStat::new(self.task.partition_path);
        stat.add_delete_pattern(pattern.clone(), self.task.is_bootstrap_base_file);
        stat.add_delete_result(pattern, self.succeeded, self.task.is_bootstrap_base_file);
        stat
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Executes cleaner plans against storage.
///
/// The execution backend is injected at construction; the executor never
/// branches on which backend is active.
pub struct CleanPlanExecutor<E> {
    storage: Arc<dyn Storage>,
    context: E,
    config: MaintenanceConfig,
    progress_callback: Option<CleanProgressCallback>,
}

impl CleanPlanExecutor<ConcurrentContext> {
    /// Create an executor over `storage` whose delete concurrency is
    /// bounded by `config.max_concurrent_deletes`.
    pub fn new(storage: Arc<dyn Storage>, config: MaintenanceConfig) -> Self {
        let context = ConcurrentContext::new(config.max_concurrent_deletes);
        Self::with_context(storage, context, config)
    }
}

impl<E: ExecutionContext> CleanPlanExecutor<E> {
    /// Create an executor over `storage` driven by a caller-supplied
    /// execution backend.
    pub fn with_context(storage: Arc<dyn Storage>, context: E, config: MaintenanceConfig) -> Self {
        Self {
            storage,
            context,
            config,
            progress_callback: None,
        }
    }

    /// Register a progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: CleanProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Execute `plan` and return one finalized stat per partition key of
    /// the plan, in no guaranteed order.
    pub async fn clean(&self, plan: &CleanerPlan) -> Result<Vec<CleanStat>> {
        let tasks = plan.flatten();
        debug!(
            partitions = plan.files_to_delete_per_partition.len(),
            tasks = tasks.len(),
            policy = %plan.policy,
            max_concurrent_deletes = self.config.max_concurrent_deletes,
            "executing cleaner plan"
        );
        if let Some(callback) = &self.progress_callback {
            callback(CleanProgressEvent::TasksPlanned {
                partitions: plan.files_to_delete_per_partition.len(),
                tasks: tasks.len(),
            });
        }

        let outcomes = self.delete_files(tasks).await?;

        // Sequential reduction: group outcomes by partition and fold them
        // with the associative merge. The finalized stats are independent of
        // the order tasks completed in.
        let mut stats: HashMap<String, PartitionCleanStat> = HashMap::new();
        for outcome in outcomes {
            let partial = outcome.into_partition_stat();
            match stats.remove(partial.partition_path()) {
                Some(existing) => {
                    let key = existing.partition_path().to_string();
                    stats.insert(key, existing.merge(partial)?);
                }
                None => {
                    stats.insert(partial.partition_path().to_string(), partial);
                }
            }
        }

        // One stat per partition named by the plan, all-empty when the
        // partition produced no tasks.
        let clean_stats = plan
            .files_to_delete_per_partition
            .keys()
            .map(|partition_path| match stats.remove(partition_path) {
                Some(stat) => CleanStat::from_partition_stat(
                    plan.policy,
                    plan.earliest_instant_to_retain.clone(),
                    stat,
                ),
                None => CleanStat::empty(
                    plan.policy,
                    partition_path.clone(),
                    plan.earliest_instant_to_retain.clone(),
                ),
            })
            .collect();

        Ok(clean_stats)
    }

    /// Run every delete task through the execution context, recording one
    /// outcome per task.
    async fn delete_files(&self, tasks: Vec<CleanFileTask>) -> Result<Vec<TaskOutcome>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let report_interval = (total / 10).clamp(1, 100);
        let completed = Arc::new(AtomicUsize::new(0));
        let storage = Arc::clone(&self.storage);
        let progress_callback = self.progress_callback.clone();

        self.context
            .map_parallel(tasks, move |task: CleanFileTask| {
                let storage = Arc::clone(&storage);
                let completed = Arc::clone(&completed);
                let progress_callback = progress_callback.clone();
                async move {
                    let succeeded = match storage.delete(&task.file_path).await {
                        Ok(deleted) => Some(deleted),
                        Err(error) => {
                            warn!(
                                path = %task.file_path,
                                partition = %task.partition_path,
                                %error,
                                "failed to delete file"
                            );
                            None
                        }
                    };

                    let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % report_interval == 0 || current == total {
                        if let Some(callback) = &progress_callback {
                            callback(CleanProgressEvent::DeletingFiles {
                                completed: current,
                                total,
                            });
                        }
                    }

                    TaskOutcome { task, succeeded }
                }
                .boxed()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::future::BoxFuture;

    use super::*;
    use crate::clean::plan::{CleanFileInfo, CleanerPolicy};
    use crate::engine::{ConcurrentContext, SequentialContext};
    use crate::io::MemoryStorage;
    use crate::spec::{ActionInstant, ActionKind};
    use crate::{Error, ErrorKind};

    fn executor_with<E: ExecutionContext>(
        storage: Arc<MemoryStorage>,
        context: E,
    ) -> CleanPlanExecutor<E> {
        CleanPlanExecutor::with_context(storage, context, MaintenanceConfig::default())
    }

    fn stat_for<'a>(stats: &'a [CleanStat], partition: &str) -> &'a CleanStat {
        stats
            .iter()
            .find(|s| s.partition_path == partition)
            .unwrap_or_else(|| panic!("missing stat for partition {partition}"))
    }

    fn sorted(v: &[String]) -> Vec<String> {
        let mut v = v.to_vec();
        v.sort();
        v
    }

    #[tokio::test]
    async fn test_mixed_outcomes_single_partition() {
        // Plan: p1 has one deletable file and one that errors; p2 is named
        // with zero candidate files.
        let storage = Arc::new(MemoryStorage::new());
        storage.put("p1/f1.parquet");
        storage.put("p1/f2.parquet");
        storage.fail_on("p1/f2.parquet");

        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits)
            .with_partition("p1", vec![
                CleanFileInfo::new("p1/f1.parquet"),
                CleanFileInfo::new("p1/f2.parquet"),
            ])
            .with_partition("p2", vec![]);

        let executor = executor_with(storage, SequentialContext::new());
        let stats = executor.clean(&plan).await.unwrap();
        assert_eq!(stats.len(), 2);

        let p1 = stat_for(&stats, "p1");
        assert_eq!(p1.success_delete_files, ["f1.parquet"]);
        assert_eq!(p1.failed_delete_files, ["f2.parquet"]);
        assert_eq!(sorted(&p1.delete_path_patterns), ["f1.parquet", "f2.parquet"]);

        let p2 = stat_for(&stats, "p2");
        assert_eq!(p2.total_attempted(), 0);
        assert!(p2.delete_path_patterns.is_empty());
        assert!(p2.failed_delete_files.is_empty());
    }

    #[tokio::test]
    async fn test_failure_never_aborts_siblings() {
        let storage = Arc::new(MemoryStorage::new());
        for i in 0..20 {
            storage.put(format!("p1/f{i}.parquet"));
        }
        storage.fail_on("p1/f3.parquet");
        storage.fail_on("p1/f11.parquet");

        let files = (0..20)
            .map(|i| CleanFileInfo::new(format!("p1/f{i}.parquet")))
            .collect();
        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits).with_partition("p1", files);

        let executor = executor_with(Arc::clone(&storage), ConcurrentContext::new(4));
        let stats = executor.clean(&plan).await.unwrap();

        let p1 = stat_for(&stats, "p1");
        assert_eq!(p1.success_delete_files.len(), 18);
        assert_eq!(sorted(&p1.failed_delete_files), ["f11.parquet", "f3.parquet"]);
        // Every file except the two failing ones is gone from storage.
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_files_keep_full_path() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put("p1/f1.parquet");
        storage.put("/external/bootstrap/base1.parquet");

        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestFileVersions).with_partition(
            "p1",
            vec![
                CleanFileInfo::new("p1/f1.parquet"),
                CleanFileInfo::bootstrap("/external/bootstrap/base1.parquet"),
            ],
        );

        let executor = executor_with(storage, SequentialContext::new());
        let stats = executor.clean(&plan).await.unwrap();

        let p1 = stat_for(&stats, "p1");
        // Regular files record the bare file name, bootstrap-base files the
        // full path.
        assert_eq!(p1.delete_path_patterns, ["f1.parquet"]);
        assert_eq!(p1.success_delete_files, ["f1.parquet"]);
        assert_eq!(
            p1.delete_bootstrap_base_path_patterns,
            ["/external/bootstrap/base1.parquet"]
        );
        assert_eq!(
            p1.success_delete_bootstrap_base_files,
            ["/external/bootstrap/base1.parquet"]
        );
        assert!(p1.failed_delete_files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_recorded_as_failed() {
        // A delete that finds nothing returns false; the attempt is still
        // recorded, as a failure.
        let storage = Arc::new(MemoryStorage::new());
        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits)
            .with_partition("p1", vec![CleanFileInfo::new("p1/gone.parquet")]);

        let executor = executor_with(storage, SequentialContext::new());
        let stats = executor.clean(&plan).await.unwrap();

        let p1 = stat_for(&stats, "p1");
        assert_eq!(p1.failed_delete_files, ["gone.parquet"]);
        assert!(p1.success_delete_files.is_empty());
    }

    #[tokio::test]
    async fn test_earliest_instant_copied_to_every_stat() {
        let instant = ActionInstant::completed(ActionKind::Commit, "20260828103045123");
        let storage = Arc::new(MemoryStorage::new());
        storage.put("p1/f1.parquet");

        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits)
            .with_earliest_instant(instant.clone())
            .with_partition("p1", vec![CleanFileInfo::new("p1/f1.parquet")])
            .with_partition("p2", vec![]);

        let executor = executor_with(storage, SequentialContext::new());
        let stats = executor.clean(&plan).await.unwrap();

        for stat in &stats {
            assert_eq!(stat.earliest_commit_retained.as_ref(), Some(&instant));
            assert_eq!(stat.policy, CleanerPolicy::KeepLatestCommits);
        }
    }

    #[tokio::test]
    async fn test_result_independent_of_backend() {
        let build_storage = || {
            let storage = Arc::new(MemoryStorage::new());
            for p in ["p1", "p2", "p3"] {
                for i in 0..8 {
                    storage.put(format!("{p}/f{i}.parquet"));
                }
            }
            storage.fail_on("p2/f5.parquet");
            storage
        };
        let plan = {
            let mut plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits);
            for p in ["p1", "p2", "p3"] {
                let files = (0..8)
                    .map(|i| CleanFileInfo::new(format!("{p}/f{i}.parquet")))
                    .collect();
                plan = plan.with_partition(p, files);
            }
            plan
        };

        let sequential = executor_with(build_storage(), SequentialContext::new())
            .clean(&plan)
            .await
            .unwrap();
        let concurrent = executor_with(build_storage(), ConcurrentContext::new(6))
            .clean(&plan)
            .await
            .unwrap();

        for partition in ["p1", "p2", "p3"] {
            let a = stat_for(&sequential, partition);
            let b = stat_for(&concurrent, partition);
            assert_eq!(sorted(&a.success_delete_files), sorted(&b.success_delete_files));
            assert_eq!(sorted(&a.failed_delete_files), sorted(&b.failed_delete_files));
            assert_eq!(sorted(&a.delete_path_patterns), sorted(&b.delete_path_patterns));
        }
    }

    #[tokio::test]
    async fn test_empty_plan_produces_no_stats() {
        let storage = Arc::new(MemoryStorage::new());
        let executor = executor_with(storage, SequentialContext::new());
        let stats = executor
            .clean(&CleanerPlan::new(CleanerPolicy::KeepLatestCommits))
            .await
            .unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_progress_events_emitted() {
        let storage = Arc::new(MemoryStorage::new());
        for i in 0..5 {
            storage.put(format!("p1/f{i}.parquet"));
        }
        let files = (0..5)
            .map(|i| CleanFileInfo::new(format!("p1/f{i}.parquet")))
            .collect();
        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits).with_partition("p1", files);

        let events: Arc<Mutex<Vec<CleanProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let executor = executor_with(storage, SequentialContext::new()).with_progress_callback(
            Arc::new(move |event| sink.lock().unwrap().push(event)),
        );

        executor.clean(&plan).await.unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(
            events[0],
            CleanProgressEvent::TasksPlanned { partitions: 1, tasks: 5 }
        ));
        assert!(matches!(
            events.last().unwrap(),
            CleanProgressEvent::DeletingFiles { completed: 5, total: 5 }
        ));
    }

    /// Storage that tracks the peak number of deletes in flight.
    #[derive(Default)]
    struct GaugedStorage {
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Storage for GaugedStorage {
        async fn delete(&self, _path: &str) -> crate::Result<bool> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_configured_delete_concurrency_is_honored() {
        let storage = Arc::new(GaugedStorage::default());
        let files = (0..8)
            .map(|i| CleanFileInfo::new(format!("p1/f{i}.parquet")))
            .collect();
        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits).with_partition("p1", files);

        let config = MaintenanceConfig {
            max_concurrent_deletes: 1,
            ..MaintenanceConfig::default()
        };
        let executor = CleanPlanExecutor::new(Arc::clone(&storage) as Arc<dyn Storage>, config);
        executor.clean(&plan).await.unwrap();

        // With the bound at 1 the deletes run strictly one at a time.
        assert_eq!(storage.peak_in_flight.load(Ordering::SeqCst), 1);
    }

    /// Execution context whose substrate is broken.
    struct FailingContext;

    #[async_trait]
    impl ExecutionContext for FailingContext {
        async fn map_parallel<I, O, F>(&self, _items: Vec<I>, _op: F) -> crate::Result<Vec<O>>
        where
            I: Send + 'static,
            O: Send + 'static,
            F: Fn(I) -> BoxFuture<'static, O> + Send + Sync + 'static,
        {
            Err(Error::new(
                ErrorKind::ExecutionFault,
                "execution substrate lost",
            ))
        }
    }

    #[tokio::test]
    async fn test_execution_fault_propagates_unmodified() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put("p1/f1.parquet");
        let plan = CleanerPlan::new(CleanerPolicy::KeepLatestCommits)
            .with_partition("p1", vec![CleanFileInfo::new("p1/f1.parquet")]);

        let executor = executor_with(storage, FailingContext);
        let err = executor.clean(&plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFault);
    }
}
