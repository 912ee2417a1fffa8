//! Retrying front-end to a [`GenerationService`].

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::GenerationService;
use crate::error::{GenerationError, Result};

/// Upper bound on attempts per call, including the first.
pub const MAX_ATTEMPTS: u32 = 5;

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Clamped to `1..=MAX_ATTEMPTS`
    /// when used.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Attempts actually made per call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_ATTEMPTS)
    }

    /// Delay before retry number `retry` (0-based): `base_delay * 2^retry`.
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Sends prompts to a generation service with retry and exponential backoff.
///
/// Only transport errors are retried. The orchestrator knows nothing about
/// prompt content; callers validate what comes back.
pub struct Orchestrator<G> {
    service: G,
    policy: RetryPolicy,
}

impl<G: GenerationService> Orchestrator<G> {
    pub fn new(service: G, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &G {
        &self.service
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns the service's completion, retrying transport failures.
    ///
    /// After the last attempt fails the error is wrapped in
    /// [`GenerationError::Exhausted`]. Errors that are not retryable are
    /// returned as they are, without another attempt.
    pub fn generate(&self, prompt: &str, instruction: &str) -> Result<String> {
        let max_attempts = self.policy.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.service.generate(prompt, instruction) {
                Ok(text) => {
                    debug!(attempt, completion_len = text.len(), "generation succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.delay_before_retry(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "generation failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "generation failed, giving up");
                    return Err(GenerationError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}
