// src/retry/strategy.rs

use crate::checker::CancelSignal;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("Cancelled before attempt {attempt}")]
    Cancelled { attempt: u32 },

    #[error("Maximum attempts ({attempts}) exceeded, last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl RetryError {
    /// Attempts that actually reached the operation.
    pub fn attempts_made(&self) -> u32 {
        match self {
            RetryError::Cancelled { attempt } => attempt.saturating_sub(1),
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `f` until it succeeds, attempts run out, or `cancel` fires.
    ///
    /// Every attempt is bounded by the attempt timeout; a timed out attempt
    /// counts as a failure. Returns the value and the attempt that produced it.
    pub async fn execute<F, Fut, T, E>(
        &self,
        cancel: &CancelSignal,
        mut f: F,
    ) -> Result<(T, u32), RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last = String::from("no attempts made");

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempt });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // the in-flight attempt is dropped
                    return Err(RetryError::Cancelled { attempt: attempt + 1 });
                }
                outcome = timeout(self.config.attempt_timeout, f(attempt)) => outcome,
            };

            match outcome {
                Ok(Ok(value)) => return Ok((value, attempt)),
                Ok(Err(error)) => {
                    debug!("Attempt {} failed: {}", attempt, error);
                    last = error.to_string();
                }
                Err(_) => {
                    debug!(
                        "Attempt {} timed out after {:?}",
                        attempt, self.config.attempt_timeout
                    );
                    last = format!("timed out after {:?}", self.config.attempt_timeout);
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.config.max_attempts,
            last,
        })
    }
}
