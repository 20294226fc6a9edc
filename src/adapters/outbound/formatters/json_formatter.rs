use crate::auditing::domain::{CombinedReport, RunSummary, Severity, SeverityCounts};
use crate::ports::outbound::ReportFormatter;
use crate::shared::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    project: &'a str,
    path: String,
    generated_at: String,
    scanners: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    highest_severity: Option<Severity>,
    summary: Summary,
    breakdown: Vec<Breakdown>,
    vulnerabilities: Vec<VulnerabilityEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    #[serde(flatten)]
    counts: SeverityCounts,
}

impl From<SeverityCounts> for Summary {
    fn from(counts: SeverityCounts) -> Self {
        Self {
            total: counts.total(),
            counts,
        }
    }
}

#[derive(Debug, Serialize)]
struct Breakdown {
    scanner: &'static str,
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct VulnerabilityEntry<'a> {
    scanner: &'static str,
    package_name: &'a str,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<&'a str>,
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    vulnerable_versions: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    patched_versions: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    url: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    recommendation: &'a str,
}

/// JsonReportFormatter adapter for machine-readable report artifacts
///
/// Project reports use a flattened document with one entry per
/// vulnerability tagged by scanner; the run summary is the same shape
/// printed by `--json-output`.
pub struct JsonReportFormatter;

impl JsonReportFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonReportFormatter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn format_report(&self, report: &CombinedReport) -> Result<String> {
        let vulnerabilities = report
            .results()
            .iter()
            .flat_map(|result| {
                let scanner = result.scanner().as_str();
                result.vulnerabilities().iter().map(move |v| VulnerabilityEntry {
                    scanner,
                    package_name: v.package_name(),
                    severity: v.severity(),
                    identifier: v.identifier(),
                    title: v.title(),
                    vulnerable_versions: v.affected_range(),
                    patched_versions: v.fixed_range(),
                    url: v.reference_url(),
                    recommendation: v.remediation_text(),
                })
            })
            .collect();

        let document = ReportDocument {
            project: report.project_name(),
            path: report.project_path().display().to_string(),
            generated_at: report.generated_at().to_rfc3339(),
            scanners: report.scanners().iter().map(|s| s.as_str()).collect(),
            highest_severity: report.highest_severity(),
            summary: report.counts().into(),
            breakdown: report
                .breakdown()
                .into_iter()
                .map(|b| Breakdown {
                    scanner: b.scanner.as_str(),
                    summary: b.counts.into(),
                })
                .collect(),
            vulnerabilities,
        };

        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        Ok(serde_json::to_string_pretty(summary)?)
    }
}
