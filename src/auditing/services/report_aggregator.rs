use crate::auditing::domain::{CombinedReport, ScanResult};
use chrono::Utc;
use std::path::Path;

/// ReportAggregator - Merges per-scanner results into one combined report
///
/// Combining is order-insensitive for the totals; scanner order only affects
/// how equal-severity items are ranked in the top-N view.
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn combine(project_name: &str, project_path: &Path, results: Vec<ScanResult>) -> CombinedReport {
        CombinedReport::new(project_name, project_path, results, Utc::now())
    }
}
