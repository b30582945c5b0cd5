// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single unit of work handed to the crawl function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Identifier passed to the crawl function (a search string, a case number, ...)
    pub search_string: String,
}

impl Request {
    pub fn new(search_string: impl Into<String>) -> Self {
        Self {
            search_string: search_string.into(),
        }
    }
}

impl From<&str> for Request {
    fn from(search_string: &str) -> Self {
        Self::new(search_string)
    }
}

/// Why a single request did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("crawl failed for {request}: {message}")]
    Failed { request: String, message: String },
    #[error("crawl panicked for {request}: {message}")]
    Panicked { request: String, message: String },
    #[error("request {request} was cancelled before a worker picked it up")]
    Cancelled { request: String },
}

impl CrawlError {
    /// Identifier of the request this error belongs to
    pub fn request(&self) -> &str {
        match self {
            CrawlError::Failed { request, .. }
            | CrawlError::Panicked { request, .. }
            | CrawlError::Cancelled { request } => request,
        }
    }
}

/// Outcome of running the crawl function on one request.
///
/// Exactly one `PageSource` is produced per dispatched [`Request`]. Results
/// come back unordered, so `request` is the only way to correlate them.
#[derive(Debug, Clone)]
pub struct PageSource<T> {
    /// Payload returned by the crawl function, `None` when it failed
    pub page: Option<T>,
    /// Echo of [`Request::search_string`]
    pub request: String,
    pub error: Option<CrawlError>,
    pub crawled_at: DateTime<Utc>,
}

impl<T> PageSource<T> {
    pub fn success(request: impl Into<String>, page: T) -> Self {
        Self {
            page: Some(page),
            request: request.into(),
            error: None,
            crawled_at: Utc::now(),
        }
    }

    pub fn failure(error: CrawlError) -> Self {
        Self {
            page: None,
            request: error.request().to_string(),
            error: Some(error),
            crawled_at: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Re-wrap the originating identifier into a fresh request for another attempt
    pub fn to_request(&self) -> Request {
        Request::new(self.request.clone())
    }
}

/// Remove the request at `index`, keeping the order of the remaining ones.
/// Returns `None` and leaves the vector untouched when `index` is out of range.
pub fn remove_request(requests: &mut Vec<Request>, index: usize) -> Option<Request> {
    (index < requests.len()).then(|| requests.remove(index))
}

/// Remove the page source at `index`, keeping the order of the remaining ones.
/// Returns `None` and leaves the vector untouched when `index` is out of range.
pub fn remove_page_source<T>(
    sources: &mut Vec<PageSource<T>>,
    index: usize,
) -> Option<PageSource<T>> {
    (index < sources.len()).then(|| sources.remove(index))
}

/// One line of the CLI report
#[derive(Debug, Serialize, Deserialize)]
pub struct PageReport {
    pub request: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub content_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub crawled_at: DateTime<Utc>,
}
