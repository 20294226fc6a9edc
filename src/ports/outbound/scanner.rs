use crate::auditing::domain::{Project, ScanResult, ScannerKind};
use crate::shared::error::AuditError;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Scanner port for auditing one project's dependencies in one ecosystem
///
/// Implementations shell out to a package manager's own audit command and
/// translate its JSON output into `Vulnerability` values. A non-zero exit
/// status that only means "vulnerabilities found" must not be reported as
/// an execution failure.
#[async_trait]
pub trait Scanner: Send + Sync {
    fn kind(&self) -> ScannerKind;

    /// Whether the project at `path` looks like it uses this ecosystem.
    fn detect(&self, path: &Path) -> bool;

    /// Runs the audit. Must stop promptly once `cancel` fires.
    ///
    /// # Errors
    /// - `ScannerUnavailable` when the tool is not installed
    /// - `ScanExecutionFailed` for an unexpected exit status
    /// - `ScanOutputUnparseable` when the JSON does not have the expected shape
    /// - `Cancelled` when the token fired mid-scan
    async fn audit(
        &self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, AuditError>;
}
