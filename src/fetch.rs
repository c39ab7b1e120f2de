//! Resilient HTTP fetching.
//!
//! [`Fetcher::get`] issues a GET with a bounded number of attempts:
//! - 2xx returns immediately
//! - 429 waits for the `Retry-After` hint (or a random 30-60s) and retries
//! - 5xx and transport errors wait a random 5-10s and retry
//! - any other status is returned as-is without retrying
//!
//! After the last attempt the most recent response is returned and the caller
//! judges it by [`FetchResponse::state`]. Transport, sleeping and randomness
//! are traits so the whole loop runs deterministically under test.

use crate::config::{CollectConfig, DelayRange};
use crate::error::{CollectError, Result};
use crate::random::{delay_in, RandomSource};
use futures::future::BoxFuture;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Status, retry hint and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub retry_after: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

/// Performs a single GET. No retrying happens at this layer.
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<RawResponse>>;
}

/// `reqwest`-backed transport used in production.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &CollectConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(match &config.mailto {
                Some(email) => format!("{} (mailto:{})", config.user_agent, email),
                None => config.user_agent.clone(),
            })
            .build()
            .map_err(|e| CollectError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<RawResponse>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await?;
            Ok(RawResponse {
                status,
                retry_after,
                body,
            })
        })
    }
}

/// Suspends the current task.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Where a fetch currently stands. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Pending,
    Success,
    PermanentFailure,
    RetriesExhausted,
}

/// Why, and for how long, the fetcher waits before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    RateLimited(Duration),
    ServerError(Duration),
}

/// Outcome of evaluating one response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Finish(FetchState),
    Retry(Backoff),
}

/// Attempt bound and wait distributions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_wait: DelayRange,
    pub max_retry_after: Duration,
    pub server_error_wait: DelayRange,
}

impl RetryPolicy {
    pub fn from_config(config: &CollectConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            rate_limit_wait: config.rate_limit_wait,
            max_retry_after: config.max_retry_after,
            server_error_wait: config.server_error_wait,
        }
    }

    /// Decide what follows response number `attempt` (1-based).
    pub fn next(
        &self,
        attempt: u32,
        status: StatusCode,
        retry_after: Option<&str>,
        random: &dyn RandomSource,
    ) -> Transition {
        if status.is_success() {
            return Transition::Finish(FetchState::Success);
        }

        let backoff = if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after
                .and_then(parse_retry_after)
                .map(|hint| hint.min(self.max_retry_after))
                .unwrap_or_else(|| delay_in(random, self.rate_limit_wait));
            Backoff::RateLimited(wait)
        } else if status.is_server_error() {
            Backoff::ServerError(delay_in(random, self.server_error_wait))
        } else {
            return Transition::Finish(FetchState::PermanentFailure);
        };

        if attempt >= self.max_attempts {
            Transition::Finish(FetchState::RetriesExhausted)
        } else {
            Transition::Retry(backoff)
        }
    }

    /// Wait before retrying after a transport error, or `None` when out of attempts.
    pub fn after_transport_error(&self, attempt: u32, random: &dyn RandomSource) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| delay_in(random, self.server_error_wait))
    }
}

/// Parse a `Retry-After` value given in seconds. HTTP-date values are not supported.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Shared hold-off deadline. A 429 seen by any clone of a [`Fetcher`] delays
/// the next request of every clone.
#[derive(Debug, Default)]
pub struct RateGate {
    until: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn hold_until(&self, deadline: Instant) {
        let mut until = match self.until.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if until.map_or(true, |current| deadline > current) {
            *until = Some(deadline);
        }
    }

    /// Time left until the gate opens, if it is closed.
    pub fn remaining(&self) -> Option<Duration> {
        let until = *self.until.lock().ok()?;
        until
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }
}

/// Final response of a fetch together with how it ended.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
    pub state: FetchState,
    pub attempts: u32,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.state == FetchState::Success
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| CollectError::Parse(format!("Unexpected response body: {}", e)))
    }
}

/// GET with bounded retry/backoff. Cheap to clone; clones share the rate gate.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    random: Arc<dyn RandomSource>,
    policy: RetryPolicy,
    gate: Arc<RateGate>,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        random: Arc<dyn RandomSource>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            random,
            policy,
            gate: Arc::new(RateGate::default()),
        }
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    pub fn random(&self) -> &Arc<dyn RandomSource> {
        &self.random
    }

    pub async fn get(&self, url: &str) -> Result<FetchResponse> {
        let mut state = FetchState::Pending;
        let mut attempts = 0;
        let mut last: Option<RawResponse> = None;

        while state == FetchState::Pending {
            if let Some(wait) = self.gate.remaining() {
                debug!(wait_secs = wait.as_secs_f64(), "Waiting for rate gate");
                self.sleeper.sleep(wait).await;
            }

            attempts += 1;
            match self.transport.get(url).await {
                Ok(response) => {
                    let transition = self.policy.next(
                        attempts,
                        response.status,
                        response.retry_after.as_deref(),
                        &*self.random,
                    );
                    match transition {
                        Transition::Finish(done) => state = done,
                        Transition::Retry(Backoff::RateLimited(wait)) => {
                            warn!(
                                url = url,
                                attempt = attempts,
                                wait_secs = wait.as_secs_f64(),
                                "Rate limited, backing off"
                            );
                            match Instant::now().checked_add(wait) {
                                Some(deadline) => self.gate.hold_until(deadline),
                                None => self.sleeper.sleep(wait).await,
                            }
                        }
                        Transition::Retry(Backoff::ServerError(wait)) => {
                            warn!(
                                url = url,
                                attempt = attempts,
                                status = response.status.as_u16(),
                                wait_secs = wait.as_secs_f64(),
                                "Server error, backing off"
                            );
                            self.sleeper.sleep(wait).await;
                        }
                    }
                    last = Some(response);
                }
                Err(e) => match self.policy.after_transport_error(attempts, &*self.random) {
                    Some(wait) => {
                        warn!(
                            url = url,
                            attempt = attempts,
                            error = %e,
                            wait_secs = wait.as_secs_f64(),
                            "Request failed, backing off"
                        );
                        self.sleeper.sleep(wait).await;
                    }
                    None if last.is_some() => state = FetchState::RetriesExhausted,
                    None => return Err(e),
                },
            }
        }

        let response = last.ok_or_else(|| {
            CollectError::Parse(format!("No response recorded for {}", url))
        })?;

        if state != FetchState::Success {
            warn!(
                url = url,
                status = response.status.as_u16(),
                attempts = attempts,
                state = ?state,
                "Giving up on request"
            );
        }

        Ok(FetchResponse {
            status: response.status,
            body: response.body,
            state,
            attempts,
        })
    }
}
