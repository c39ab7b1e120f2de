//! Run configuration.
//!
//! Everything the pipeline needs to know about a run lives in one
//! [`CollectConfig`] value that is handed to [`crate::pipeline::Pipeline`]
//! at construction. There is no module-level state.

use crate::error::{CollectError, Result};
use std::collections::BTreeSet;
use std::time::Duration;

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex refuses `per-page` values above this
pub const MAX_PAGE_SIZE: u32 = 200;

/// Closed range of seconds a randomized wait is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    fn check(&self, name: &str) -> Result<()> {
        let ordered = self.min_secs >= 0.0 && self.min_secs <= self.max_secs;
        if !(ordered && self.max_secs.is_finite()) {
            return Err(CollectError::Config(format!(
                "{} range must satisfy 0 <= min <= max (got {}..{})",
                name, self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }
}

/// Configuration for one collection run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Upstream base URL (overridable for mirrors and tests)
    pub api_base: String,
    /// Email for the OpenAlex polite pool
    pub mailto: Option<String>,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Publication years that produce output rows
    pub years_of_interest: BTreeSet<i32>,
    /// Candidates requested per author search
    pub search_limit: u32,
    /// Works requested per page
    pub page_size: u32,
    /// Attempts per URL before the fetcher gives up
    pub max_attempts: u32,
    /// Wait after a 429 without a usable Retry-After header
    pub rate_limit_wait: DelayRange,
    /// Longest Retry-After hint honored; larger hints are clamped to this
    pub max_retry_after: Duration,
    /// Wait after a 5xx or transport error
    pub server_error_wait: DelayRange,
    /// Pause between successive page requests
    pub courtesy_delay: DelayRange,
    /// Authors processed concurrently
    pub workers: usize,
    /// Draw this many names at random instead of processing all of them
    pub sample_size: Option<usize>,
    /// Seed for the sample draw
    pub seed: Option<u64>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            api_base: OPENALEX_API_BASE.to_string(),
            mailto: None,
            user_agent: format!("rustcoauthors/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            years_of_interest: (2017..=2023).collect(),
            search_limit: 25,
            page_size: MAX_PAGE_SIZE,
            max_attempts: 5,
            rate_limit_wait: DelayRange::new(30.0, 60.0),
            max_retry_after: Duration::from_secs(300),
            server_error_wait: DelayRange::new(5.0, 10.0),
            courtesy_delay: DelayRange::new(2.5, 3.5),
            workers: 1,
            sample_size: None,
            seed: None,
        }
    }
}

impl CollectConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.years_of_interest.is_empty() {
            return Err(CollectError::Config(
                "years of interest must not be empty".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(CollectError::Config(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.search_limit == 0 {
            return Err(CollectError::Config(
                "search limit must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(CollectError::Config(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(CollectError::Config("workers must be at least 1".to_string()));
        }
        self.rate_limit_wait.check("rate limit wait")?;
        self.server_error_wait.check("server error wait")?;
        self.courtesy_delay.check("courtesy delay")?;
        url::Url::parse(&self.api_base)?;
        Ok(())
    }
}

/// Parse a year set: `"2017-2023"` (inclusive) or `"2017,2019,2021"`.
pub fn parse_years(input: &str) -> Result<BTreeSet<i32>> {
    let input = input.trim();
    let parse = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|_| CollectError::Config(format!("Invalid year: {:?}", s)))
    };

    if let Some((start, end)) = input.split_once('-') {
        let (start, end) = (parse(start)?, parse(end)?);
        if start > end {
            return Err(CollectError::Config(format!(
                "Invalid year range: {}",
                input
            )));
        }
        return Ok((start..=end).collect());
    }

    input.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse)
        .collect()
}
