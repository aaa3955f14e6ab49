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

//! Execution context abstraction.
//!
//! Maintenance operations are embarrassingly parallel: a clean run is a bag
//! of independent delete tasks with no ordering dependency between them. The
//! [`ExecutionContext`] trait exposes the one capability the core needs,
//! mapping a collection of work items to results, possibly concurrently.
//! The concrete backend (sequential loop, bounded thread pool, something
//! distributed) is injected at construction. Core logic never branches on
//! which backend is active.
//!
//! Two backends ship with the crate:
//!
//! - [`SequentialContext`] runs items one at a time in input order.
//! - [`ConcurrentContext`] drives items through a bounded
//!   `buffer_unordered` stream, so completions may arrive in any order.
//!
//! Both return one result per input item, in input order. A fault of the
//! substrate itself (not of an individual item) surfaces as
//! [`ErrorKind::ExecutionFault`](crate::ErrorKind::ExecutionFault).

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::BoxFuture;

use crate::{Error, ErrorKind, Result};

/// A parallel/sequential execution substrate.
///
/// `op` may be invoked concurrently by multiple workers and item completion
/// order is unspecified; the returned vector always carries one result per
/// input item, positionally aligned with the input.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Apply `op` to every item of `items`, possibly in parallel.
    async fn map_parallel<I, O, F>(&self, items: Vec<I>, op: F) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> BoxFuture<'static, O> + Send + Sync + 'static;
}

/// Executes items one at a time, in input order.
///
/// Useful for tests and for callers that want deterministic scheduling.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialContext;

impl SequentialContext {
    /// Create a new sequential context.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionContext for SequentialContext {
    async fn map_parallel<I, O, F>(&self, items: Vec<I>, op: F) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> BoxFuture<'static, O> + Send + Sync + 'static,
    {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(op(item).await);
        }
        Ok(results)
    }
}

/// Executes items with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentContext {
    max_concurrency: usize,
}

impl ConcurrentContext {
    /// Create a context running at most `max_concurrency` items at once.
    /// Values below 1 are clamped to 1.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Maximum number of items in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for ConcurrentContext {
    /// Defaults concurrency to the number of available threads.
    fn default() -> Self {
        let max_concurrency = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self::new(max_concurrency)
    }
}

#[async_trait]
impl ExecutionContext for ConcurrentContext {
    async fn map_parallel<I, O, F>(&self, items: Vec<I>, op: F) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> BoxFuture<'static, O> + Send + Sync + 'static,
    {
        let total = items.len();
        let mut slots: Vec<Option<O>> = (0..total).map(|_| None).collect();

        let mut stream = futures::stream::iter(items.into_iter().enumerate())
            .map(|(idx, item)| {
                let fut = op(item);
                async move { (idx, fut.await) }
            })
            .buffer_unordered(self.max_concurrency);

        while let Some((idx, result)) = stream.next().await {
            slots[idx] = Some(result);
        }
        drop(stream);

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    Error::new(
                        ErrorKind::ExecutionFault,
                        "execution context dropped a task result",
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn test_sequential_context_preserves_order() {
        let ctx = SequentialContext::new();
        let items: Vec<u32> = (0..16).collect();

        let results = ctx
            .map_parallel(items, |i| async move { i * 2 }.boxed())
            .await
            .unwrap();

        assert_eq!(results, (0..16).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrent_context_aligns_results_with_input() {
        let ctx = ConcurrentContext::new(8);
        let items: Vec<u32> = (0..64).collect();

        // Later items finish first so that completion order differs from
        // input order.
        let results = ctx
            .map_parallel(items, |i| {
                async move {
                    let delay = 64 - u64::from(i);
                    tokio::time::sleep(std::time::Duration::from_micros(delay)).await;
                    i * 2
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(results, (0..64).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrent_context_empty_input() {
        let ctx = ConcurrentContext::default();
        let results: Vec<u32> = ctx
            .map_parallel(Vec::<u32>::new(), |i| async move { i }.boxed())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_concurrency_clamped_to_one() {
        assert_eq!(ConcurrentContext::new(0).max_concurrency(), 1);
        assert_eq!(ConcurrentContext::new(16).max_concurrency(), 16);
    }
}
