// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Concurrent crawl orchestration for scraping form-driven, script-rendered sites.
//!
//! [`services::dispatch`] runs a caller-supplied crawl function over a batch of
//! requests with a bounded worker pool; [`services::evaluate`] re-crawls the
//! results a caller-supplied check rejects until every result passes.

pub mod models;
pub mod services;

pub use models::crawler::{CrawlError, PageSource, Request};
pub use services::dispatch::{parallel_requests, Dispatch, WorkerPool};
pub use services::evaluate::{evaluate_parallel_requests, partition_by};
