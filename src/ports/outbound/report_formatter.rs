use crate::auditing::domain::{CombinedReport, RunSummary};
use crate::shared::Result;

/// ReportFormatter port for rendering on-disk report artifacts
///
/// One implementation per output format (JSON, Markdown).
pub trait ReportFormatter: Send + Sync {
    /// File extension without the leading dot.
    fn extension(&self) -> &'static str;

    /// Renders one project's combined report.
    fn format_report(&self, report: &CombinedReport) -> Result<String>;

    /// Renders the run-wide summary.
    fn format_summary(&self, summary: &RunSummary) -> Result<String>;
}
