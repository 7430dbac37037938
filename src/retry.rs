//! Polling with backoff for the "still processing" signal
//!
//! The collection endpoint answers HTTP 202 while it prepares an export.
//! [`poll_until_ready`] drives an explicit state machine over a fallible
//! async operation: retryable failures wait and try again, everything else
//! ends the loop. Waits go through an injectable [`Sleeper`] and race the
//! caller's cancellation token.
//!
//! # Example
//!
//! ```no_run
//! use bgg_collection::config::PollConfig;
//! use bgg_collection::retry::{IsRetryable, TokioSleeper, poll_until_ready};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     NotReady,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "not ready")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::NotReady)
//!     }
//! }
//!
//! # async fn example() {
//! let cancel = CancellationToken::new();
//! let result = poll_until_ready(&PollConfig::default(), &TokioSleeper, &cancel, || async {
//!     Ok::<_, MyError>(42)
//! })
//! .await;
//! # }
//! ```

use crate::config::PollConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again after a wait
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // The export is being prepared; the service asks us to come back
            FetchError::Pending { .. } => true,
            // Network, status and body failures are terminal for this call
            FetchError::Transport(_) => false,
            FetchError::Cancelled => false,
        }
    }
}

/// Waits between poll attempts
///
/// Production code uses [`TokioSleeper`]; tests substitute sleepers that
/// record the requested durations or never complete.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why [`poll_until_ready`] gave up
#[derive(Debug)]
pub enum PollFailure<E> {
    /// The operation failed with a non-retryable error
    Failed(E),
    /// The poll budget ran out while the operation was still retryable
    Exhausted {
        /// The last retryable error observed
        last: E,
        /// Number of times the operation was invoked
        attempts: u32,
    },
    /// The cancellation token fired
    Cancelled,
}

/// States of the poll loop
#[derive(Debug)]
enum PollState<T, E> {
    /// About to invoke the operation
    Attempting,
    /// Waiting before the next attempt
    Retrying { delay: Duration },
    /// The operation produced a value
    Succeeded(T),
    /// The loop ended without a value
    Failed(PollFailure<E>),
}

/// Delay schedule: `initial_delay`, then multiplied per step and capped
#[derive(Clone, Debug)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    /// Start a schedule from a poll configuration
    pub fn new(config: &PollConfig) -> Self {
        Self {
            next: config.initial_delay.min(config.max_delay),
            max: config.max_delay,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next;
        self.next = Duration::try_from_secs_f64(base.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        if self.jitter { add_jitter(base) } else { base }
    }
}

/// Run `operation` until it succeeds, fails terminally, exhausts the poll
/// budget, or `cancel` fires
///
/// The budget is `config.max_attempts` retries after the first attempt and,
/// when set, `config.max_total_wait` of summed waits. A wait that would
/// cross the total-wait bound is not started.
///
/// Cancellation is checked before every attempt and raced against every
/// wait. Cancelling an in-flight attempt is the operation's responsibility.
pub async fn poll_until_ready<S, F, Fut, T, E>(
    config: &PollConfig,
    sleeper: &S,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, PollFailure<E>>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut backoff = Backoff::new(config);
    let mut attempts: u32 = 0;
    let mut waited = Duration::ZERO;
    let mut state = PollState::Attempting;

    loop {
        state = match state {
            PollState::Attempting => {
                if cancel.is_cancelled() {
                    PollState::Failed(PollFailure::Cancelled)
                } else {
                    attempts += 1;
                    tracing::debug!(attempt = attempts, "polling");
                    match operation().await {
                        Ok(value) => PollState::Succeeded(value),
                        Err(e) if e.is_retryable() => {
                            let delay = backoff.next_delay();
                            let over_total = config
                                .max_total_wait
                                .is_some_and(|limit| waited + delay > limit);
                            if attempts > config.max_attempts || over_total {
                                tracing::error!(
                                    error = %e,
                                    attempts,
                                    waited_ms = waited.as_millis(),
                                    "Still pending after poll budget exhausted"
                                );
                                PollState::Failed(PollFailure::Exhausted { last: e, attempts })
                            } else {
                                tracing::warn!(
                                    error = %e,
                                    attempt = attempts,
                                    max_attempts = config.max_attempts,
                                    delay_ms = delay.as_millis(),
                                    "Not ready, retrying"
                                );
                                waited += delay;
                                PollState::Retrying { delay }
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Operation failed with non-retryable error");
                            PollState::Failed(PollFailure::Failed(e))
                        }
                    }
                }
            }
            PollState::Retrying { delay } => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("cancelled while waiting to retry");
                        PollState::Failed(PollFailure::Cancelled)
                    }
                    _ = sleeper.sleep(delay) => PollState::Attempting,
                }
            }
            PollState::Succeeded(value) => {
                if attempts > 1 {
                    tracing::info!(attempts, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            PollState::Failed(failure) => return Err(failure),
        };
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
