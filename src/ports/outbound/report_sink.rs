use crate::shared::Result;
use std::path::PathBuf;

/// ReportSink port for persisting rendered report artifacts
///
/// This port abstracts the destination (a report directory on disk) where
/// formatted reports are stored.
pub trait ReportSink: Send + Sync {
    /// Stores `content` under `file_name` and returns where it ended up
    ///
    /// # Errors
    /// Returns an error if:
    /// - The destination is not writable or is a symbolic link
    /// - `file_name` tries to escape the destination
    fn write_artifact(&self, file_name: &str, content: &str) -> Result<PathBuf>;
}
