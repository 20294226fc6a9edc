use crate::auditing::domain::{Project, ScanResult, Severity};
use crate::auditing::services::VulnerabilityFilter;
use crate::ports::outbound::Scanner;
use crate::shared::error::AuditError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry and deadline settings for one scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `n * backoff_unit`
    pub backoff_unit: Duration,
    /// Deadline for a single scanner invocation
    pub scan_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration, scan_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
            scan_timeout,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(600))
    }
}

/// A job that gave up, with the number of attempts it made.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub attempts: u32,
    pub error: AuditError,
}

/// ScanJobRunner - Runs one (project, scanner) pair with retry and backoff
///
/// Only the last error is surfaced; intermediate failures are logged.
/// Successful results are filtered by the project's ignore list and the
/// global severity threshold before being returned.
#[derive(Debug, Clone)]
pub struct ScanJobRunner {
    policy: RetryPolicy,
    threshold: Severity,
}

impl ScanJobRunner {
    pub fn new(policy: RetryPolicy, threshold: Severity) -> Self {
        Self { policy, threshold }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn run(
        &self,
        project: &Project,
        scanner: &dyn Scanner,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, JobFailure> {
        let kind = scanner.kind();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(JobFailure {
                    attempts: attempt,
                    error: AuditError::Cancelled,
                });
            }
            attempt += 1;
            debug!(project = %project.name, scanner = %kind, attempt, "starting scan");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AuditError::Cancelled),
                res = tokio::time::timeout(self.policy.scan_timeout, scanner.audit(project, cancel)) => {
                    res.unwrap_or(Err(AuditError::ScanTimedOut {
                        scanner: kind,
                        timeout: self.policy.scan_timeout,
                    }))
                }
            };

            let error = match outcome {
                Ok(result) => {
                    let filter = VulnerabilityFilter::new(&project.ignore_list, self.threshold);
                    return Ok(filter.apply(result));
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                return Err(JobFailure {
                    attempts: attempt,
                    error,
                });
            }

            let delay = self.policy.backoff_unit * attempt;
            warn!(
                project = %project.name,
                scanner = %kind,
                attempt,
                max_attempts = self.policy.max_attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "scan attempt failed"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(JobFailure {
                        attempts: attempt,
                        error: AuditError::Cancelled,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
