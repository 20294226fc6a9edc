use super::{ChannelKind, CombinedReport, ScannerKind, SeverityCounts};
use crate::shared::error::{AuditError, ExitCode};
use serde::Serialize;
use std::fmt;

/// Which stage of the run an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Failed before any scanner ran (e.g. no applicable scanner)
    Project,
    Scanner(ScannerKind),
    Channel(ChannelKind),
}

/// An error attributed to the project (and scanner or channel) it came from.
#[derive(Debug, Clone)]
pub struct RunError {
    pub project: String,
    pub origin: ErrorOrigin,
    /// Attempts made before giving up; only set for scanner errors
    pub attempts: Option<u32>,
    pub error: AuditError,
}

impl RunError {
    pub fn project(project: impl Into<String>, error: AuditError) -> Self {
        Self {
            project: project.into(),
            origin: ErrorOrigin::Project,
            attempts: None,
            error,
        }
    }

    pub fn scanner(
        project: impl Into<String>,
        scanner: ScannerKind,
        attempts: u32,
        error: AuditError,
    ) -> Self {
        Self {
            project: project.into(),
            origin: ErrorOrigin::Scanner(scanner),
            attempts: Some(attempts),
            error,
        }
    }

    pub fn channel(project: impl Into<String>, channel: ChannelKind, error: AuditError) -> Self {
        Self {
            project: project.into(),
            origin: ErrorOrigin::Channel(channel),
            attempts: None,
            error,
        }
    }

    /// `project`, `project:scanner` or `project:channel`.
    pub fn attribution(&self) -> String {
        match self.origin {
            ErrorOrigin::Project => self.project.clone(),
            ErrorOrigin::Scanner(scanner) => format!("{}:{}", self.project, scanner),
            ErrorOrigin::Channel(channel) => format!("{}:{}", self.project, channel),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.attribution())?;
        if let Some(attempts) = self.attempts {
            write!(f, "after {} attempt(s): ", attempts)?;
        }
        write!(f, "{}", self.error)
    }
}

/// Everything one invocation produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub reports: Vec<CombinedReport>,
    pub errors: Vec<RunError>,
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn has_vulnerabilities(&self) -> bool {
        self.reports.iter().any(CombinedReport::has_vulnerabilities)
    }

    pub fn report_for(&self, project: &str) -> Option<&CombinedReport> {
        self.reports.iter().find(|r| r.project_name() == project)
    }

    /// Vulnerabilities take precedence over run errors.
    pub fn exit_code(&self) -> ExitCode {
        if self.has_vulnerabilities() {
            ExitCode::VulnerabilitiesDetected
        } else if !self.errors.is_empty() || self.cancelled {
            ExitCode::RunError
        } else {
            ExitCode::Success
        }
    }

    pub fn summary(&self) -> RunSummary {
        let mut projects: Vec<ProjectSummary> = self
            .reports
            .iter()
            .map(|r| ProjectSummary {
                name: r.project_name().to_string(),
                scanners: r.scanners().iter().map(|s| s.to_string()).collect(),
                counts: r.counts(),
            })
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));

        RunSummary {
            total_projects: self.reports.len(),
            projects_with_vulnerabilities: self
                .reports
                .iter()
                .filter(|r| r.has_vulnerabilities())
                .count(),
            counts: self.reports.iter().map(CombinedReport::counts).sum(),
            projects,
            errors: self.errors.iter().map(|e| e.to_string()).collect(),
            cancelled: self.cancelled,
            exit_code: self.exit_code().as_i32(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub scanners: Vec<String>,
    pub counts: SeverityCounts,
}

/// Serializable digest of a run, printed with `--json-output`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_projects: usize,
    pub projects_with_vulnerabilities: usize,
    pub counts: SeverityCounts,
    pub projects: Vec<ProjectSummary>,
    pub errors: Vec<String>,
    pub cancelled: bool,
    pub exit_code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auditing::domain::{ScanResult, Severity, Vulnerability};
    use chrono::Utc;

    fn report(name: &str, vulns: usize) -> CombinedReport {
        let vulnerabilities = (0..vulns)
            .map(|i| Vulnerability::new(format!("pkg-{}", i), Severity::High, "t"))
            .collect();
        CombinedReport::new(
            name,
            "/tmp",
            vec![ScanResult::new(ScannerKind::Npm, name, vulnerabilities)],
            Utc::now(),
        )
    }

    fn scan_error() -> AuditError {
        AuditError::ScanExecutionFailed {
            scanner: ScannerKind::Npm,
            exit_code: Some(2),
            details: "boom".to_string(),
        }
    }

    #[test]
    fn test_attribution() {
        let err = RunError::scanner("web", ScannerKind::Composer, 3, scan_error());
        assert_eq!(err.attribution(), "web:composer");
        assert!(err.to_string().starts_with("[web:composer] after 3 attempt(s): "));

        let err = RunError::project("api", AuditError::Cancelled);
        assert_eq!(err.attribution(), "api");

        let err = RunError::channel("api", ChannelKind::Email, AuditError::Cancelled);
        assert_eq!(err.attribution(), "api:email");
    }

    #[test]
    fn test_exit_code_clean_run() {
        let outcome = RunOutcome {
            reports: vec![report("a", 0)],
            ..Default::default()
        };
        assert_eq!(outcome.exit_code(), ExitCode::Success);
    }

    #[test]
    fn test_exit_code_vulnerabilities_win_over_errors() {
        let outcome = RunOutcome {
            reports: vec![report("a", 2)],
            errors: vec![RunError::scanner("b", ScannerKind::Npm, 3, scan_error())],
            cancelled: false,
        };
        assert_eq!(outcome.exit_code(), ExitCode::VulnerabilitiesDetected);
    }

    #[test]
    fn test_exit_code_errors_only() {
        let outcome = RunOutcome {
            reports: vec![report("a", 0)],
            errors: vec![RunError::scanner("b", ScannerKind::Npm, 3, scan_error())],
            cancelled: false,
        };
        assert_eq!(outcome.exit_code(), ExitCode::RunError);
    }

    #[test]
    fn test_summary_totals() {
        let outcome = RunOutcome {
            reports: vec![report("b", 2), report("a", 0), report("c", 1)],
            ..Default::default()
        };
        let summary = outcome.summary();
        assert_eq!(summary.total_projects, 3);
        assert_eq!(summary.projects_with_vulnerabilities, 2);
        assert_eq!(summary.counts.high, 3);
        assert_eq!(summary.projects[0].name, "a");
        assert_eq!(summary.exit_code, 1);
    }
}
