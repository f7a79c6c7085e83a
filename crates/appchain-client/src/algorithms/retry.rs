//! # Retry Policy
//!
//! Fixed-wait retry loop for ledger calls.
//!
//! An operation reports either a transient failure (wait, then try again) or
//! a permanent one (stop now and surface it). Policies without an attempt cap
//! retry forever; callers that need bounded latency wrap the call in their
//! own timeout.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Wait between submission attempts.
pub const SUBMIT_RETRY_WAIT: Duration = Duration::from_secs(2);

/// Wait between receipt lookups.
pub const RECEIPT_RETRY_WAIT: Duration = Duration::from_secs(2);

/// Wait between best-height queries.
pub const BEST_BLOCK_RETRY_WAIT: Duration = Duration::from_secs(10);

/// Attempts before the height oracle is declared lost.
pub const BEST_BLOCK_MAX_ATTEMPTS: u32 = 30;

/// How a failed attempt should be treated.
#[derive(Debug)]
pub enum Backoff<E> {
    /// Try again after the policy wait.
    Transient(E),
    /// Stop retrying.
    Permanent(E),
}

/// Why a retried operation gave up.
#[derive(Debug, Error)]
pub enum RetryError<E: std::fmt::Display> {
    /// Operation reported a permanent failure.
    #[error("permanent failure on attempt {attempts}: {error}")]
    Permanent {
        /// Attempts made
        attempts: u32,
        /// Reported error
        error: E,
    },

    /// Attempt cap reached.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Last transient error
        last: E,
    },
}

impl<E: std::fmt::Display> RetryError<E> {
    /// Underlying error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent { error, .. } => error,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Permanent { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Fixed-wait retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub wait: Duration,
    /// Attempt cap; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Unbounded policy with a fixed wait.
    pub const fn fixed(wait: Duration) -> Self {
        Self {
            wait,
            max_attempts: None,
        }
    }

    /// Cap the number of attempts.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Transaction submission: 2s, unbounded.
    pub const fn submission() -> Self {
        Self::fixed(SUBMIT_RETRY_WAIT)
    }

    /// Receipt lookup: 2s, unbounded.
    pub const fn receipt() -> Self {
        Self::fixed(RECEIPT_RETRY_WAIT)
    }

    /// Best-height query: 10s, capped.
    pub const fn best_block() -> Self {
        Self::fixed(BEST_BLOCK_RETRY_WAIT).with_max_attempts(BEST_BLOCK_MAX_ATTEMPTS)
    }
}

/// Run `op` until it succeeds, fails permanently or exhausts the policy.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Backoff<E>>>,
{
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(Backoff::Permanent(error)) => {
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error,
                })
            }
            Err(Backoff::Transient(error)) => {
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                debug!(
                    attempt,
                    wait_ms = policy.wait.as_millis() as u64,
                    error = %error,
                    "Transient failure, retrying"
                );
                sleep(policy.wait).await;
            }
        }
    }
}
