// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Immutable configuration values for the worker pool and the HTTP session.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Worker count used by the re-crawl pass
pub const RECRAWL_WORKERS: usize = 10;

pub const DEFAULT_USER_AGENT: &str = "LalaSpider/0.1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a batch of requests is spread across workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    number_of_workers: usize,
    delay: Duration,
}

impl DispatchConfig {
    /// A worker count of zero is raised to one, a pool without workers
    /// could never produce the one-result-per-request guarantee.
    pub fn new(number_of_workers: usize, delay: Duration) -> Self {
        if number_of_workers == 0 {
            tracing::warn!("number_of_workers must be at least 1, using a single worker");
        }
        Self {
            number_of_workers: number_of_workers.max(1),
            delay,
        }
    }

    /// Fixed settings of the re-crawl pass: ten workers, no delay
    pub fn recrawl() -> Self {
        Self::new(RECRAWL_WORKERS, Duration::ZERO)
    }

    /// Read `SPIDER_WORKERS` and `SPIDER_DELAY_MS`, falling back to the
    /// re-crawl defaults for whichever is unset
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            env::var("SPIDER_WORKERS").ok().as_deref(),
            env::var("SPIDER_DELAY_MS").ok().as_deref(),
        )
    }

    /// Use `workers` and `delay` where given and read `SPIDER_WORKERS` and
    /// `SPIDER_DELAY_MS` only for the ones left unset
    pub fn from_env_or(workers: Option<usize>, delay: Option<Duration>) -> Result<Self> {
        Self::with_overrides(
            workers,
            delay,
            env::var("SPIDER_WORKERS").ok().as_deref(),
            env::var("SPIDER_DELAY_MS").ok().as_deref(),
        )
    }

    fn with_overrides(
        workers: Option<usize>,
        delay: Option<Duration>,
        env_workers: Option<&str>,
        env_delay_ms: Option<&str>,
    ) -> Result<Self> {
        let from_env = Self::from_values(
            workers.map_or(env_workers, |_| None),
            delay.map_or(env_delay_ms, |_| None),
        )?;
        Ok(Self::new(
            workers.unwrap_or(from_env.number_of_workers),
            delay.unwrap_or(from_env.delay),
        ))
    }

    fn from_values(workers: Option<&str>, delay_ms: Option<&str>) -> Result<Self> {
        let number_of_workers = match workers {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("SPIDER_WORKERS must be a number, got: {}", value))?,
            None => RECRAWL_WORKERS,
        };
        let delay = match delay_ms {
            Some(value) => Duration::from_millis(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("SPIDER_DELAY_MS must be a number, got: {}", value))?,
            ),
            None => Duration::ZERO,
        };
        Ok(Self::new(number_of_workers, delay))
    }

    pub fn number_of_workers(&self) -> usize {
        self.number_of_workers
    }

    /// Pause applied by each worker before every unit of work
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::recrawl()
    }
}

/// Settings of one HTTP session, fixed at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub user_agent: String,
    /// Hard limit for a single page fetch
    pub timeout: Duration,
    /// Log every fetch at info level instead of debug
    pub debug: bool,
}

impl SessionConfig {
    /// Read `USER_AGENT` and `SPIDER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(user_agent) = env::var("USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Ok(timeout) = env::var("SPIDER_TIMEOUT_SECS") {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .with_context(|| format!("SPIDER_TIMEOUT_SECS must be a number, got: {}", timeout))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            debug: false,
        }
    }
}
