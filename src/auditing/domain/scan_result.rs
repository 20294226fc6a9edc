use super::{ScannerKind, SeverityCounts, Vulnerability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scanner's findings for one project.
///
/// Counts are derived from the vulnerability list at construction time, so
/// they can never drift from it. Filtering produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    scanner: ScannerKind,
    project_name: String,
    vulnerabilities: Vec<Vulnerability>,
    counts: SeverityCounts,
    scanned_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(
        scanner: ScannerKind,
        project_name: impl Into<String>,
        vulnerabilities: Vec<Vulnerability>,
    ) -> Self {
        Self::at(scanner, project_name, vulnerabilities, Utc::now())
    }

    pub fn at(
        scanner: ScannerKind,
        project_name: impl Into<String>,
        vulnerabilities: Vec<Vulnerability>,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        let counts = vulnerabilities.iter().map(Vulnerability::severity).collect();
        Self {
            scanner,
            project_name: project_name.into(),
            vulnerabilities,
            counts,
            scanned_at,
        }
    }

    /// Keeps only the vulnerabilities for which `keep` returns true.
    pub fn retain(self, keep: impl Fn(&Vulnerability) -> bool) -> Self {
        let kept = self
            .vulnerabilities
            .into_iter()
            .filter(|v| keep(v))
            .collect();
        Self::at(self.scanner, self.project_name, kept, self.scanned_at)
    }

    pub fn scanner(&self) -> ScannerKind {
        self.scanner
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        &self.vulnerabilities
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty()
    }
}
