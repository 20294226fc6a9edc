use super::{ScanResult, ScannerKind, Severity, SeverityCounts, Vulnerability};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-scanner slice of a combined report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannerBreakdown {
    pub scanner: ScannerKind,
    pub counts: SeverityCounts,
}

/// One project's merged view across every scanner that ran for it.
///
/// `counts` is the per-bucket sum of the constituents' counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedReport {
    project_name: String,
    project_path: PathBuf,
    results: Vec<ScanResult>,
    counts: SeverityCounts,
    generated_at: DateTime<Utc>,
}

impl CombinedReport {
    pub fn new(
        project_name: impl Into<String>,
        project_path: impl Into<PathBuf>,
        results: Vec<ScanResult>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let counts = results.iter().map(ScanResult::counts).sum();
        Self {
            project_name: project_name.into(),
            project_path: project_path.into(),
            results,
            counts,
            generated_at,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// True iff at least one constituent result is non-empty.
    pub fn has_vulnerabilities(&self) -> bool {
        self.results.iter().any(|r| !r.is_empty())
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.counts.highest()
    }

    /// All vulnerabilities in scanner order, then within-scanner order.
    pub fn vulnerabilities(&self) -> impl Iterator<Item = &Vulnerability> {
        self.results.iter().flat_map(|r| r.vulnerabilities())
    }

    /// The `n` most severe vulnerabilities across all scanners.
    ///
    /// Equal severities keep their original relative order (`sort_by` is stable).
    pub fn top_vulnerabilities(&self, n: usize) -> Vec<&Vulnerability> {
        let mut all: Vec<&Vulnerability> = self.vulnerabilities().collect();
        all.sort_by(|a, b| b.severity().cmp(&a.severity()));
        all.truncate(n);
        all
    }

    pub fn breakdown(&self) -> Vec<ScannerBreakdown> {
        self.results
            .iter()
            .map(|r| ScannerBreakdown {
                scanner: r.scanner(),
                counts: r.counts(),
            })
            .collect()
    }

    pub fn scanners(&self) -> Vec<ScannerKind> {
        self.results.iter().map(ScanResult::scanner).collect()
    }
}
