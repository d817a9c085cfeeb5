//! Retry loop around fetch + extract.
//!
//! Every failure is treated as transient:
//! - Timeouts, HTTP error statuses, connection failures
//! - Pages that load but carry no readings (often mid-update)
//!
//! Attempts are separated by a fixed delay. After the last attempt the caller
//! gets the fixed exhaustion message instead of an error.

use std::sync::Arc;
use std::time::Duration;

use peramos_core::{Config, ConfigError, FailureCategory, NetworkError};
use thiserror::Error;

use crate::clock::{Clock, Delay, TokioDelay};
use crate::extractor::ReadingExtractor;
use crate::fetcher::{Fetch, HttpFetcher};
use crate::formatter::ReportFormatter;
use crate::types::{Report, ReportOutcome};

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_SECS: u64 = 2;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// At least one attempt is always made.
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Why a single attempt produced no report
#[derive(Debug, Error)]
enum AttemptFailure {
    #[error("{0}")]
    Fetch(#[from] NetworkError),
    #[error("page had no readings")]
    NoData,
}

impl AttemptFailure {
    fn category(&self) -> &'static str {
        match self {
            AttemptFailure::Fetch(e) => e.category().as_str(),
            AttemptFailure::NoData => "no-data",
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, AttemptFailure::Fetch(e) if e.category() == FailureCategory::Timeout)
    }
}

/// Fetch, extract and format a report, retrying per [`RetryPolicy`].
pub struct ReportPipeline<F = HttpFetcher, D = TokioDelay> {
    fetcher: F,
    extractor: ReadingExtractor,
    formatter: ReportFormatter,
    policy: RetryPolicy,
    delay: D,
    clock: Arc<dyn Clock>,
}

impl ReportPipeline {
    /// Pipeline against the configured station page, sleeping on the tokio timer.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            HttpFetcher::from_config(&config.station)?,
            ReadingExtractor::from_config(&config.station)?,
            ReportFormatter::from_config(&config.station),
            RetryPolicy::new(config.retry.max_attempts, config.retry.delay()),
            TokioDelay,
            clock,
        ))
    }
}

impl<F: Fetch, D: Delay> ReportPipeline<F, D> {
    pub fn new(
        fetcher: F,
        extractor: ReadingExtractor,
        formatter: ReportFormatter,
        policy: RetryPolicy,
        delay: D,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            formatter,
            policy,
            delay,
            clock,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the attempt loop and return the message to deliver.
    pub async fn get_report(&self) -> ReportOutcome {
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tracing::info!(
                    "Retry attempt {} of {}, waiting {:?}",
                    attempt,
                    attempts,
                    self.policy.delay
                );
                self.delay.wait(self.policy.delay).await;
            }

            match self.attempt().await {
                Ok(report) => {
                    if attempt > 1 {
                        tracing::info!("Report succeeded after {} retries", attempt - 1);
                    }
                    tracing::debug!("Extracted {} readings", report.len());
                    return ReportOutcome::Ready(self.formatter.render(Some(&report)));
                }
                Err(failure) => {
                    tracing::warn!(
                        category = failure.category(),
                        timeout = failure.is_timeout(),
                        "Attempt {} of {} failed: {}",
                        attempt,
                        attempts,
                        failure
                    );
                }
            }
        }

        tracing::error!("All {} report attempts exhausted", attempts);
        ReportOutcome::Exhausted
    }

    async fn attempt(&self) -> Result<Report, AttemptFailure> {
        let body = self.fetcher.fetch().await?;
        let readings = self.extractor.extract(&body);
        Report::new(readings, self.clock.now()).ok_or(AttemptFailure::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(RetryPolicy::new(5, Duration::ZERO).attempts(), 5);
    }

    #[test]
    fn test_attempt_failure_categories() {
        assert_eq!(AttemptFailure::NoData.category(), "no-data");
        let timeout = AttemptFailure::from(NetworkError::Timeout);
        assert_eq!(timeout.category(), "timeout");
        assert!(timeout.is_timeout());
    }

    #[test]
    fn test_from_default_config() {
        let pipeline = ReportPipeline::from_config(&Config::default(), Arc::new(SystemClock)).unwrap();
        assert_eq!(pipeline.policy(), RetryPolicy::default());
    }
}
