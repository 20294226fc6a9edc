use crate::auditing::domain::{ChannelKind, ScannerKind};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes let cron jobs and CI systems tell a clean run apart from
/// one that found vulnerabilities or one that failed to run properly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// No vulnerabilities at or above the severity threshold
    Success = 0,
    /// At least one project reported vulnerabilities at or above the threshold
    VulnerabilitiesDetected = 1,
    /// Configuration, startup or run error (also used by clap for bad arguments)
    RunError = 2,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::VulnerabilitiesDetected => write!(f, "Vulnerabilities Detected (1)"),
            ExitCode::RunError => write!(f, "Run Error (2)"),
        }
    }
}

/// Why a channel refused to create a discussion thread.
///
/// Each class maps to a different fix on the operator's side, so they are
/// surfaced separately instead of as one opaque "creation failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadCreationFailure {
    /// The bot lacks the right to manage topics
    PermissionDenied,
    /// The group id is wrong or the bot is not a member
    InvalidChannel,
    /// The group exists but topics are not enabled
    ThreadsUnsupported,
    /// The channel reported a conflicting concurrent modification
    Conflict,
    /// Network trouble or an unclassified API error
    Transient,
}

impl ThreadCreationFailure {
    pub fn hint(self) -> &'static str {
        match self {
            ThreadCreationFailure::PermissionDenied => {
                "Grant the bot the 'Manage Topics' admin right in the forum group"
            }
            ThreadCreationFailure::InvalidChannel => {
                "Check telegram.group_id and make sure the bot is a member of the group"
            }
            ThreadCreationFailure::ThreadsUnsupported => {
                "Enable topics for the group (group settings > Topics)"
            }
            ThreadCreationFailure::Conflict => "Another client changed the topic; retry the run",
            ThreadCreationFailure::Transient => "Check network connectivity and retry the run",
        }
    }
}

impl fmt::Display for ThreadCreationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreadCreationFailure::PermissionDenied => "permission denied",
            ThreadCreationFailure::InvalidChannel => "invalid or unknown channel",
            ThreadCreationFailure::ThreadsUnsupported => "channel does not support threads",
            ThreadCreationFailure::Conflict => "conflicting modification",
            ThreadCreationFailure::Transient => "transient failure",
        };
        f.write_str(label)
    }
}

/// Errors raised by the audit core.
///
/// Project- and scanner-level variants are always recovered by the
/// orchestrator and attributed; only `ProjectNotFound` aborts a run.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("{scanner} is not available: {details}\n\n💡 Hint: Install {scanner} and make sure it is on PATH")]
    ScannerUnavailable {
        scanner: ScannerKind,
        details: String,
    },

    #[error("Project directory {} does not exist\n\n💡 Hint: Check the project's path in the config file", .path.display())]
    ProjectDirectoryMissing { scanner: ScannerKind, path: PathBuf },

    #[error("{scanner} audit failed{}: {details}", .exit_code.map(|c| format!(" (exit {})", c)).unwrap_or_default())]
    ScanExecutionFailed {
        scanner: ScannerKind,
        exit_code: Option<i32>,
        details: String,
    },

    #[error("{scanner} audit timed out after {}s", .timeout.as_secs())]
    ScanTimedOut {
        scanner: ScannerKind,
        timeout: Duration,
    },

    #[error("Failed to parse {scanner} audit output: {details}")]
    ScanOutputUnparseable {
        scanner: ScannerKind,
        details: String,
    },

    #[error("No applicable scanner for project '{project}': {reason}\n\n💡 Hint: Set the project's type to one of: npm, composer")]
    NoApplicableScanner { project: String, reason: String },

    #[error("{channel} notification failed: {details}")]
    ChannelSendFailed { channel: ChannelKind, details: String },

    #[error("Failed to create thread ({failure}): {details}\n\n💡 Hint: {}", .failure.hint())]
    ThreadCreationFailed {
        failure: ThreadCreationFailure,
        details: String,
    },

    #[error("Thread recovery failed for project '{project}': {details}")]
    ThreadRecoveryFailed { project: String, details: String },

    #[error("Project not found: {name}\n\n💡 Hint: Check the project names in the config file")]
    ProjectNotFound { name: String },

    #[error("Run cancelled")]
    Cancelled,
}

impl AuditError {
    /// Whether a failed scan attempt is worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuditError::ScanExecutionFailed { .. } | AuditError::ScanTimedOut { .. }
        )
    }
}
