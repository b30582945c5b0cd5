// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Evaluate-then-redispatch loop for results that did not pass validation.

use crate::models::config::DispatchConfig;
use crate::models::crawler::{PageSource, Request};
use crate::services::dispatch::WorkerPool;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Requests that need another attempt, and the results worth keeping
pub type Partition<T> = (Vec<Request>, Vec<PageSource<T>>);

/// Re-crawl every result `evaluate` rejects until it rejects none.
///
/// `evaluate` splits a batch into requests that need another attempt and
/// results worth keeping. Rejected requests are dispatched again with ten
/// workers and no delay, the fresh results are merged with the kept ones
/// and the whole set is evaluated again. When nothing is rejected the kept
/// results are returned.
///
/// There is no iteration cap. If `evaluate` keeps rejecting a request
/// (a permanently broken page, for instance) this loops forever; callers
/// that cannot rule that out should bound the call with
/// [`tokio::time::timeout`].
///
/// Any failed crawl during a re-crawl pass aborts the loop with a
/// "failed to crawl page sources" error, discarding what was gathered so far.
pub async fn evaluate_parallel_requests<T, F, Fut, E>(
    previous_results: Vec<PageSource<T>>,
    crawler: F,
    evaluate: E,
) -> Result<Vec<PageSource<T>>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    E: Fn(Vec<PageSource<T>>) -> Partition<T>,
{
    WorkerPool::new(DispatchConfig::recrawl())
        .evaluate(previous_results, crawler, evaluate)
        .await
}

impl WorkerPool {
    /// Same loop as [`evaluate_parallel_requests`], re-crawling through this pool
    pub async fn evaluate<T, F, Fut, E>(
        &self,
        previous_results: Vec<PageSource<T>>,
        crawler: F,
        evaluate: E,
    ) -> Result<Vec<PageSource<T>>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        E: Fn(Vec<PageSource<T>>) -> Partition<T>,
    {
        let crawler = Arc::new(crawler);
        let mut current = previous_results;
        let mut round = 0_usize;

        loop {
            let (problematic, mut valid) = evaluate(current);
            if problematic.is_empty() {
                debug!(rounds = round, "All page sources passed evaluation");
                return Ok(valid);
            }

            round += 1;
            info!(round, "Crawling {} problematic sources", problematic.len());
            let fresh = self
                .dispatch_shared(problematic, Arc::clone(&crawler))
                .await
                .into_result()
                .context("failed to crawl page sources")?;

            valid.extend(fresh);
            current = valid;
        }
    }
}

/// Build an evaluation function from a per-result check.
///
/// Results failing `is_valid` are re-wrapped into fresh [`Request`]s; the
/// rest are kept as they are.
pub fn partition_by<T, P>(is_valid: P) -> impl Fn(Vec<PageSource<T>>) -> Partition<T>
where
    P: Fn(&PageSource<T>) -> bool,
{
    move |results| {
        let mut recrawl = Vec::new();
        let mut valid = Vec::new();
        for result in results {
            if is_valid(&result) {
                valid.push(result);
            } else {
                recrawl.push(result.to_request());
            }
        }
        (recrawl, valid)
    }
}
