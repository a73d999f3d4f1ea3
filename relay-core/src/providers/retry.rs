//! Bounded retry policy for single-provider forwarding
//!
//! Attempts run through an explicit state machine:
//!
//! ```text
//! Attempting --ok--> Succeeded
//! Attempting --retryable, attempts left--> Backoff --sleep--> Attempting
//! Attempting --retryable, cap reached--> ExhaustedRetryable
//! Attempting --fatal--> FailedFatal
//! ```
//!
//! Only server errors (5xx) and transport failures are retryable. The backoff
//! grows linearly: `backoff_step_ms * attempt`.

use crate::config::ValidationError;
use crate::providers::error::RelayError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts per target, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff added per failed attempt (milliseconds)
    #[serde(default = "default_backoff_step")]
    pub backoff_step_ms: u64,

    /// Jitter factor (0.0 to 1.0) to randomize delays
    #[serde(default)]
    pub jitter_factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step(),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_step_ms.saturating_mul(attempt as u64) as f64;

        let delay = if self.jitter_factor > 0.0 {
            let jitter_range = base * self.jitter_factor;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (base + jitter).max(0.0)
        } else {
            base
        };

        Duration::from_millis(delay as u64)
    }

    /// State that follows a failed attempt
    pub fn next_state(&self, attempt: u32, error: &RelayError) -> RetryState {
        if !error.is_retryable() {
            RetryState::FailedFatal { attempts: attempt }
        } else if attempt >= self.max_attempts {
            RetryState::ExhaustedRetryable { attempts: attempt }
        } else {
            RetryState::Backoff {
                attempt,
                delay: self.calculate_delay(attempt),
            }
        }
    }

    /// Validate the policy
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_attempts", path),
                "Must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ValidationError::out_of_range(
                format!("{}.jitter_factor", path),
                "Must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

/// Position in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to run attempt number `attempt` (1-based)
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed retryably; waiting `delay`
    Backoff { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    /// Retryable failures until the attempt cap
    ExhaustedRetryable { attempts: u32 },
    /// A failure that must not be retried
    FailedFatal { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. }
                | RetryState::ExhaustedRetryable { .. }
                | RetryState::FailedFatal { .. }
        )
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The value, or the error to report
    pub outcome: Result<T, RelayError>,

    /// Terminal state reached
    pub state: RetryState,

    /// Number of attempts made
    pub attempts: u32,

    /// Backoff delays slept, in order
    pub delays: Vec<Duration>,

    /// All errors encountered, in order
    pub error_history: Vec<RelayError>,
}

/// Error reported once the attempt cap is reached on retryable failures
pub fn exhausted_error(last: &RelayError, attempts: u32) -> RelayError {
    match last {
        RelayError::Transport { message, .. } => RelayError::NetworkExhausted {
            attempts,
            message: message.clone(),
        },
        _ => RelayError::UpstreamUnavailable,
    }
}

/// Executor for retry operations
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds, fails fatally or the cap is
    /// reached. The closure receives the 1-based attempt number.
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> RetryResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let mut state = RetryState::Attempting { attempt: 1 };
        let mut value = None;
        let mut delays = Vec::new();
        let mut error_history = Vec::new();

        while !state.is_terminal() {
            state = match state {
                RetryState::Attempting { attempt } => match operation(attempt).await {
                    Ok(result) => {
                        value = Some(result);
                        RetryState::Succeeded { attempts: attempt }
                    }
                    Err(error) => {
                        let next = self.policy.next_state(attempt, &error);
                        warn!("Attempt {} failed: {} -> {:?}", attempt, error, next);
                        error_history.push(error);
                        next
                    }
                },
                RetryState::Backoff { attempt, delay } => {
                    debug!("Backing off {:?} before attempt {}", delay, attempt + 1);
                    delays.push(delay);
                    tokio::time::sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                terminal => terminal,
            };
        }

        let (attempts, outcome) = match (state, value) {
            (RetryState::Succeeded { attempts }, Some(result)) => (attempts, Ok(result)),
            (RetryState::ExhaustedRetryable { attempts }, _) => {
                let error = error_history
                    .last()
                    .map(|last| exhausted_error(last, attempts))
                    .unwrap_or(RelayError::UpstreamUnavailable);
                (attempts, Err(error))
            }
            (RetryState::FailedFatal { attempts }, _) => {
                let error = error_history
                    .last()
                    .cloned()
                    .unwrap_or(RelayError::UpstreamUnavailable);
                (attempts, Err(error))
            }
            (_, _) => (0, Err(RelayError::UpstreamUnavailable)),
        };

        RetryResult {
            outcome,
            state,
            attempts,
            delays,
            error_history,
        }
    }
}
