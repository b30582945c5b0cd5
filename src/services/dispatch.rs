// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Bounded worker pool that fans requests out to a caller-supplied crawl function.
//!
//! A feeder task streams requests into one shared queue, a fixed number of
//! workers pull from it until it is drained, and every outcome lands in a
//! result channel large enough to hold all of them. Each dispatched request
//! yields exactly one [`PageSource`], whether the crawl succeeded, failed,
//! panicked or was never started because the pool was cancelled.

use crate::models::config::DispatchConfig;
use crate::models::crawler::{CrawlError, PageSource, Request};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Everything a dispatch produced
#[derive(Debug)]
pub struct Dispatch<T> {
    /// One entry per request, in completion order
    pub results: Vec<PageSource<T>>,
    /// The last error observed while collecting, later failures overwrite
    /// earlier ones
    pub error: Option<CrawlError>,
}

impl<T> Dispatch<T> {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            error: None,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_ok()).count()
    }

    /// Collapse into a `Result`, dropping the results when any request failed
    pub fn into_result(self) -> Result<Vec<PageSource<T>>, CrawlError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.results),
        }
    }
}

type SharedInput = Arc<Mutex<mpsc::Receiver<Request>>>;

/// Fixed-size pool of workers pulling from a shared queue
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop feeding new work once `token` is cancelled. Requests that were
    /// already handed to a worker run to completion, the rest come back as
    /// [`CrawlError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Run `crawler` once for every request and collect all outcomes
    pub async fn dispatch<T, F, Fut>(
        &self,
        requests: Vec<Request>,
        crawler: F,
    ) -> Dispatch<T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.dispatch_shared(requests, Arc::new(crawler)).await
    }

    pub(crate) async fn dispatch_shared<T, F, Fut>(
        &self,
        requests: Vec<Request>,
        crawler: Arc<F>,
    ) -> Dispatch<T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let total = requests.len();
        if total == 0 {
            return Dispatch::empty();
        }

        // Closed when this call returns or its future is dropped
        let done = self.cancel.child_token();
        let _done_guard = done.clone().drop_guard();

        let (result_tx, mut result_rx) = mpsc::channel::<PageSource<T>>(total);
        let input: SharedInput = Arc::new(Mutex::new(stream_inputs(
            done.clone(),
            requests,
            result_tx.clone(),
        )));

        let workers: Vec<JoinHandle<()>> = (0..self.config.number_of_workers())
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    Worker {
                        id: worker_id,
                        input: Arc::clone(&input),
                        results: result_tx.clone(),
                        done: done.clone(),
                    },
                    Arc::clone(&crawler),
                    self.config.delay(),
                ))
            })
            .collect();
        // The channel closes once the feeder and every worker let go of their senders
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        let mut error = None;
        while let Some(result) = result_rx.recv().await {
            if let Some(e) = &result.error {
                error = Some(e.clone());
            }
            results.push(result);
        }

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }

        Dispatch { results, error }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

/// Dispatch `requests` across `number_of_workers` workers, each pausing for
/// `delay` before every request.
///
/// Returns every result, including failed ones, along with the last error
/// seen. Results are unordered; correlate them through [`PageSource::request`].
///
/// # Example
///
/// ```rust,no_run
/// use lala_spider::models::crawler::Request;
/// use lala_spider::services::dispatch::parallel_requests;
/// use std::time::Duration;
///
/// # async fn run() {
/// let requests = vec![Request::new("1017927-35.2023.8.26.0008")];
/// let dispatch = parallel_requests(requests, 4, Duration::ZERO, |id| async move {
///     Ok(format!("<html>{}</html>", id))
/// })
/// .await;
/// assert_eq!(dispatch.results.len(), 1);
/// # }
/// ```
pub async fn parallel_requests<T, F, Fut>(
    requests: Vec<Request>,
    number_of_workers: usize,
    delay: Duration,
    crawler: F,
) -> Dispatch<T>
where
    T: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    WorkerPool::new(DispatchConfig::new(number_of_workers, delay))
        .dispatch(requests, crawler)
        .await
}

/// Stream `requests` into a hand-off queue until they run out or `done` fires.
/// Requests left over after cancellation are reported straight to `results`.
fn stream_inputs<T>(
    done: CancellationToken,
    requests: Vec<Request>,
    results: mpsc::Sender<PageSource<T>>,
) -> mpsc::Receiver<Request>
where
    T: Send + 'static,
{
    let (input_tx, input_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut pending = requests.into_iter();
        while let Some(request) = pending.next() {
            tokio::select! {
                biased;
                _ = done.cancelled() => {
                    cancel_remaining(std::iter::once(request).chain(pending), &results);
                    return;
                }
                permit = input_tx.reserve() => match permit {
                    Ok(permit) => permit.send(request),
                    // Every worker is gone
                    Err(_) => return,
                },
            }
        }
    });
    input_rx
}

fn cancel_remaining<T>(
    requests: impl Iterator<Item = Request>,
    results: &mpsc::Sender<PageSource<T>>,
) {
    for request in requests {
        debug!(request = %request.search_string, "Request cancelled before dispatch");
        let source = PageSource::failure(CrawlError::Cancelled {
            request: request.search_string,
        });
        // Capacity covers every request, so this only fails when the collector is gone
        if results.try_send(source).is_err() {
            return;
        }
    }
}

/// What a worker needs to pull requests and hand back results
struct Worker<T> {
    id: usize,
    input: SharedInput,
    results: mpsc::Sender<PageSource<T>>,
    done: CancellationToken,
}

async fn run_worker<T, F, Fut>(worker: Worker<T>, crawler: Arc<F>, delay: Duration)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let Worker {
        id: worker_id,
        input,
        results,
        done,
    } = worker;

    loop {
        // The lock is only held while waiting for the next request
        let next = input.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };

        // A request still sitting in the queue when the pool is cancelled
        // was never handed over, so it is not crawled
        let source = if done.is_cancelled() {
            debug!(
                worker_id,
                request = %request.search_string,
                "Request cancelled before dispatch"
            );
            PageSource::failure(CrawlError::Cancelled {
                request: request.search_string,
            })
        } else {
            debug!(worker_id, request = %request.search_string, "Worker processing request");
            if !delay.is_zero() {
                sleep(delay).await;
            }
            crawl_one(crawler.as_ref(), request).await
        };

        if results.send(source).await.is_err() {
            warn!(worker_id, "Result collector went away, stopping worker");
            break;
        }
    }
}

async fn crawl_one<T, F, Fut>(crawler: &F, request: Request) -> PageSource<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let search_string = request.search_string;
    let outcome = AssertUnwindSafe(async { crawler(search_string.clone()).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(page)) => PageSource::success(search_string, page),
        Ok(Err(e)) => PageSource::failure(CrawlError::Failed {
            request: search_string,
            message: format!("{:#}", e),
        }),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(request = %search_string, "Crawl function panicked: {}", message);
            PageSource::failure(CrawlError::Panicked {
                request: search_string,
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
