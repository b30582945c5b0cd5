// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{Context, Result};
use clap::Parser;
use lala_spider::models::config::{DispatchConfig, SessionConfig};
use lala_spider::models::crawler::{PageReport, PageSource, Request};
use lala_spider::services::dispatch::WorkerPool;
use lala_spider::services::evaluate::{evaluate_parallel_requests, partition_by};
use lala_spider::services::extract::{extract_title, has_selector, parse_selector};
use lala_spider::services::logging::init_logging;
use lala_spider::services::session::Session;
use scraper::Selector;
use std::time::Duration;
use tracing::{info, warn};

// Version is extracted from Cargo.toml at compile time via build.rs
const VERSION: &str = env!("SPIDER_VERSION");

/// Fetch many pages in parallel and re-fetch the ones that did not render
#[derive(Debug, Parser)]
#[command(name = "lala-spider", version = VERSION)]
struct Cli {
    /// URL to fetch per request, `{}` is replaced by the request identifier
    #[arg(long)]
    url_template: String,

    /// Number of concurrent workers (defaults to SPIDER_WORKERS or 10)
    #[arg(long)]
    workers: Option<usize>,

    /// Pause each worker takes before every request, in milliseconds
    /// (defaults to SPIDER_DELAY_MS or 0)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// CSS selector a page must contain to count as fully rendered;
    /// pages without it are fetched again until they have it
    #[arg(long)]
    expect: Option<String>,

    /// Give up re-fetching after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,

    /// Request identifiers (search strings, case numbers, ...)
    #[arg(required = true)]
    requests: Vec<String>,
}

impl Cli {
    fn dispatch_config(&self) -> Result<DispatchConfig> {
        DispatchConfig::from_env_or(self.workers, self.delay_ms.map(Duration::from_millis))
    }

    /// Parse `--expect` up front so a malformed selector fails the run
    /// instead of rejecting every page
    fn expected_selector(&self) -> Result<Option<Selector>> {
        self.expect
            .as_deref()
            .map(|expression| {
                parse_selector(expression).with_context(|| {
                    format!("--expect is not a valid CSS selector: {}", expression)
                })
            })
            .transpose()
    }
}

fn report(source: &PageSource<String>) -> PageReport {
    let page = source.page.as_deref();
    PageReport {
        request: source.request.clone(),
        ok: source.is_ok(),
        title: page.and_then(extract_title),
        content_hash: page.map(|html| format!("{:x}", md5::compute(html))),
        content_length: page.map_or(0, str::len),
        error: source.error.as_ref().map(ToString::to_string),
        crawled_at: source.crawled_at,
    }
}

async fn recrawl_until_rendered(
    session: &Session,
    url_template: &str,
    results: Vec<PageSource<String>>,
    expected: Selector,
    deadline: Option<Duration>,
) -> Result<Vec<PageSource<String>>> {
    let evaluate = partition_by(move |source: &PageSource<String>| {
        source
            .page
            .as_deref()
            .is_some_and(|html| has_selector(html, &expected))
    });
    let recrawl = evaluate_parallel_requests(results, session.crawler(url_template), evaluate);

    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, recrawl)
            .await
            .with_context(|| format!("pages still incomplete after {:?}", deadline))?,
        None => recrawl.await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = cli.dispatch_config()?;
    let expected = cli.expected_selector()?;
    let mut session_config = SessionConfig::from_env()?;
    session_config.debug = cli.verbose;
    let session = Session::new(session_config)?;

    let requests: Vec<Request> = cli.requests.iter().map(Request::new).collect();
    info!(
        "Dispatching {} requests across {} workers",
        requests.len(),
        config.number_of_workers()
    );

    let dispatch = WorkerPool::new(config)
        .dispatch(requests, session.crawler(&cli.url_template))
        .await;
    if let Some(e) = &dispatch.error {
        warn!(
            "{} of {} requests failed, last error: {}",
            dispatch.failed_count(),
            dispatch.results.len(),
            e
        );
    }

    let results = match expected {
        Some(expected) => {
            recrawl_until_rendered(
                &session,
                &cli.url_template,
                dispatch.results,
                expected,
                cli.deadline_secs.map(Duration::from_secs),
            )
            .await?
        }
        None => dispatch.results,
    };

    for source in &results {
        println!("{}", serde_json::to_string(&report(source))?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["lala-spider", "--url-template", "https://esaj.example.org/{}"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_malformed_expect_is_rejected_before_crawling() {
        let err = cli(&["--expect", "td[", "1017927-35.2023.8.26.0008"])
            .expected_selector()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("invalid selector td["));
    }

    #[test]
    fn test_expect_is_optional() {
        assert!(cli(&["0002396-75.2013.8.26.0201"])
            .expected_selector()
            .unwrap()
            .is_none());

        let selector = cli(&["--expect", "#numeroProcesso", "0002396-75.2013.8.26.0201"])
            .expected_selector()
            .unwrap()
            .unwrap();
        assert!(has_selector("<span id=\"numeroProcesso\">1</span>", &selector));
    }

    #[test]
    fn test_workers_flag_wins() {
        let config = cli(&["--workers", "3", "--delay-ms", "20", "x"])
            .dispatch_config()
            .unwrap();
        assert_eq!(config.number_of_workers(), 3);
        assert_eq!(config.delay(), Duration::from_millis(20));
    }
}
