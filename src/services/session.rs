// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::config::SessionConfig;
use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

/// Placeholder replaced by the request identifier in URL templates
pub const REQUEST_PLACEHOLDER: &str = "{}";

/// HTTP session shared by every worker of a dispatch.
///
/// Settings are fixed at construction. Cloning is cheap and clones share one
/// connection pool, which is released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        debug!(
            user_agent = %config.user_agent,
            timeout = ?config.timeout,
            "Session initialized"
        );
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch a page and return its body
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| anyhow!("Invalid URL {}: {}", url, e))?;

        if self.config.debug {
            info!("Fetching {}", parsed);
        } else {
            debug!("Fetching {}", parsed);
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .with_context(|| format!("Failed to fetch content: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Unexpected status {} for {}", status, url));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }

    /// Turn this session into a crawl function that fetches `url_template`
    /// with the request identifier substituted for `{}`
    pub fn crawler(
        &self,
        url_template: &str,
    ) -> impl Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync + 'static {
        let session = self.clone();
        let url_template = url_template.to_string();
        move |request: String| {
            let session = session.clone();
            let url = build_url(&url_template, &request);
            async move { session.fetch_page(&url).await }.boxed()
        }
    }
}

/// Substitute the URL-encoded request identifier into `url_template`.
/// Templates without a placeholder get the identifier appended.
pub fn build_url(url_template: &str, request: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(request.as_bytes()).collect();
    if url_template.contains(REQUEST_PLACEHOLDER) {
        url_template.replacen(REQUEST_PLACEHOLDER, &encoded, 1)
    } else {
        format!("{}{}", url_template, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_substitutes_placeholder() {
        let url = build_url(
            "https://esaj.example.org/cpopg/search.do?processo={}",
            "1017927-35.2023.8.26.0008",
        );
        assert_eq!(
            url,
            "https://esaj.example.org/cpopg/search.do?processo=1017927-35.2023.8.26.0008"
        );
    }

    #[test]
    fn test_build_url_encodes_request() {
        let url = build_url("https://example.com/search?q={}", "a b&c");
        assert_eq!(url, "https://example.com/search?q=a+b%26c");
    }

    #[test]
    fn test_build_url_appends_without_placeholder() {
        assert_eq!(
            build_url("https://example.com/case/", "42"),
            "https://example.com/case/42"
        );
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_invalid_url() {
        let session = Session::new(SessionConfig::default()).unwrap();
        let err = session.fetch_page("not-a-valid-url").await.unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_session_keeps_very_long_timeout() {
        let timeout = std::time::Duration::from_secs(u64::MAX);
        let session = Session::new(SessionConfig {
            timeout,
            ..SessionConfig::default()
        })
        .unwrap();
        assert_eq!(session.config().timeout, timeout);
    }
}
