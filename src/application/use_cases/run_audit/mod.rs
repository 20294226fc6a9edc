use crate::application::dto::RunRequest;
use crate::application::services::{Dispatcher, ScanJobRunner, ScannerRegistry};
use crate::auditing::domain::{CombinedReport, Project, RunError, RunOutcome};
use crate::auditing::services::ReportAggregator;
use crate::ports::outbound::{ProgressReporter, ProjectRepository, ReportFormatter, ReportSink};
use crate::shared::error::AuditError;
use crate::shared::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    Scheduling,
    Running,
    Draining,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Scheduling => "scheduling",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Where rendered reports go, and in which formats.
pub struct ReportArtifacts {
    sink: Box<dyn ReportSink>,
    formatters: Vec<Box<dyn ReportFormatter>>,
}

impl ReportArtifacts {
    pub fn new(sink: Box<dyn ReportSink>, formatters: Vec<Box<dyn ReportFormatter>>) -> Self {
        Self { sink, formatters }
    }
}

/// Per-project result collected from a worker.
struct ProjectAudit {
    project: Project,
    report: Option<CombinedReport>,
    errors: Vec<RunError>,
}

/// RunAuditUseCase - Orchestrates one audit run across all projects
///
/// Projects are audited concurrently up to `RunRequest::max_concurrency`;
/// scanners within a project run one after another. Every failure is
/// attributed and collected, never propagated to sibling work. Only a
/// missing target project (or an unreadable project store) aborts the run.
///
/// Notifications go out after every project has finished, one dispatch per
/// project with vulnerabilities, and still happen when the run was
/// cancelled part-way.
///
/// # Type Parameters
/// * `PS` - ProjectRepository implementation
/// * `PR` - ProgressReporter implementation
pub struct RunAuditUseCase<PS, PR> {
    registry: ScannerRegistry,
    job_runner: ScanJobRunner,
    dispatcher: Dispatcher,
    store: PS,
    progress_reporter: PR,
    artifacts: Option<ReportArtifacts>,
}

impl<PS, PR> RunAuditUseCase<PS, PR>
where
    PS: ProjectRepository,
    PR: ProgressReporter,
{
    /// Creates a new RunAuditUseCase with injected dependencies
    pub fn new(
        registry: ScannerRegistry,
        job_runner: ScanJobRunner,
        dispatcher: Dispatcher,
        store: PS,
        progress_reporter: PR,
    ) -> Self {
        Self {
            registry,
            job_runner,
            dispatcher,
            store,
            progress_reporter,
            artifacts: None,
        }
    }

    /// Enables on-disk report artifacts
    pub fn with_artifacts(mut self, artifacts: ReportArtifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Loads projects from the store and runs them
    pub async fn execute(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let projects = self.store.load_projects()?;
        self.run(projects, request, cancel).await
    }

    /// Runs the given projects
    ///
    /// # Errors
    /// `ProjectNotFound` when `request.target` names no known project.
    pub async fn run(
        &self,
        projects: Vec<Project>,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let mut phase = RunPhase::Idle;

        Self::enter(&mut phase, RunPhase::Scheduling);
        let selected = Self::select_projects(projects, request.target.as_deref())?;
        info!(projects = selected.len(), max_concurrency = request.max_concurrency, "selected projects");
        self.progress_reporter.begin(selected.len());

        Self::enter(&mut phase, RunPhase::Running);
        let audits: Vec<ProjectAudit> = stream::iter(selected)
            .map(|project| self.audit_project(project, cancel))
            .buffer_unordered(request.max_concurrency.max(1))
            .collect()
            .await;

        Self::enter(&mut phase, RunPhase::Draining);
        let mut outcome = RunOutcome {
            cancelled: cancel.is_cancelled(),
            ..Default::default()
        };
        let mut audited: Vec<(Project, CombinedReport)> = Vec::new();
        for audit in audits {
            outcome.errors.extend(audit.errors);
            if let Some(report) = audit.report {
                audited.push((audit.project, report));
            }
        }
        audited.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        if outcome.cancelled {
            warn!(reports = audited.len(), "run cancelled, reporting partial results");
        }

        if request.report_only {
            info!("report-only mode, notifications skipped");
        } else {
            let channel_errors = self.dispatch_all(&audited, request).await;
            outcome.errors.extend(channel_errors);
        }

        outcome.reports = audited.into_iter().map(|(_, report)| report).collect();
        self.write_summary(&outcome);

        Self::enter(&mut phase, RunPhase::Done);
        self.progress_reporter.report_completion(&format!(
            "Audited {} project(s): {} with vulnerabilities, {} error(s)",
            outcome.reports.len(),
            outcome
                .reports
                .iter()
                .filter(|r| r.has_vulnerabilities())
                .count(),
            outcome.errors.len()
        ));
        Ok(outcome)
    }

    fn enter(phase: &mut RunPhase, next: RunPhase) {
        debug!(from = %phase, to = %next, "run phase");
        *phase = next;
    }

    /// A named target runs regardless of `enabled`; otherwise only enabled projects run.
    fn select_projects(projects: Vec<Project>, target: Option<&str>) -> Result<Vec<Project>> {
        match target {
            Some(name) => {
                let project = projects
                    .into_iter()
                    .find(|p| p.name == name)
                    .ok_or_else(|| AuditError::ProjectNotFound {
                        name: name.to_string(),
                    })?;
                Ok(vec![project])
            }
            None => Ok(projects.into_iter().filter(|p| p.enabled).collect()),
        }
    }

    async fn audit_project(&self, project: Project, cancel: &CancellationToken) -> ProjectAudit {
        let mut errors = Vec::new();

        if cancel.is_cancelled() {
            debug!(project = %project.name, "run cancelled, project skipped");
            self.progress_reporter.project_finished(&project.name, 0);
            return ProjectAudit {
                project,
                report: None,
                errors,
            };
        }

        let scanners = match self.registry.resolve(&project) {
            Ok(scanners) => scanners,
            Err(e) => {
                warn!(project = %project.name, error = %e, "project skipped");
                self.progress_reporter
                    .report_error(&format!("⚠️  {}: {}", project.name, e));
                errors.push(RunError::project(&project.name, e));
                self.progress_reporter.project_finished(&project.name, 0);
                return ProjectAudit {
                    project,
                    report: None,
                    errors,
                };
            }
        };

        let mut results = Vec::with_capacity(scanners.len());
        let mut attempted = false;
        for scanner in scanners {
            let kind = scanner.kind();
            match self.job_runner.run(&project, scanner.as_ref(), cancel).await {
                Ok(result) => {
                    attempted = true;
                    info!(
                        project = %project.name,
                        scanner = %kind,
                        vulnerabilities = result.vulnerabilities().len(),
                        "scan complete"
                    );
                    if let Err(e) = self.store.save_audit_result(&result) {
                        warn!(project = %project.name, scanner = %kind, error = %e, "failed to save audit result");
                    }
                    results.push(result);
                }
                Err(failure) if matches!(failure.error, AuditError::Cancelled) => {
                    attempted |= failure.attempts > 0;
                    debug!(project = %project.name, scanner = %kind, "scan cancelled");
                }
                Err(failure) => {
                    attempted = true;
                    error!(
                        project = %project.name,
                        scanner = %kind,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "scan failed"
                    );
                    self.progress_reporter.report_error(&format!(
                        "❌ {}:{} failed after {} attempt(s)",
                        project.name, kind, failure.attempts
                    ));
                    errors.push(RunError::scanner(
                        &project.name,
                        kind,
                        failure.attempts,
                        failure.error,
                    ));
                }
            }
        }

        if !attempted {
            self.progress_reporter.project_finished(&project.name, 0);
            return ProjectAudit {
                project,
                report: None,
                errors,
            };
        }

        let report = ReportAggregator::combine(&project.name, &project.path, results);
        self.write_project_artifacts(&report);
        self.progress_reporter
            .project_finished(&project.name, report.counts().total());

        ProjectAudit {
            project,
            report: Some(report),
            errors,
        }
    }

    async fn dispatch_all(
        &self,
        audited: &[(Project, CombinedReport)],
        request: &RunRequest,
    ) -> Vec<RunError> {
        let dispatches: Vec<_> = stream::iter(
            audited
                .iter()
                .filter(|(_, report)| report.has_vulnerabilities()),
        )
        .map(|(project, report)| async move {
            let outcome = self
                .dispatcher
                .dispatch_combined(report, project, request.dry_run)
                .await;
            (project, outcome)
        })
        .buffer_unordered(request.max_concurrency.max(1))
        .collect()
        .await;

        let mut errors = Vec::new();
        for (project, outcome) in dispatches {
            if let Some(thread) = outcome.thread_update {
                match self.store.update_thread_id(&project.name, thread) {
                    Ok(()) => debug!(project = %project.name, thread = %thread, "thread id persisted"),
                    Err(e) => warn!(project = %project.name, error = %e, "failed to persist thread id"),
                }
            }
            for (channel, error) in outcome.failures {
                errors.push(RunError::channel(&project.name, channel, error));
            }
        }
        errors
    }

    fn write_project_artifacts(&self, report: &CombinedReport) {
        let Some(artifacts) = &self.artifacts else {
            return;
        };
        for formatter in &artifacts.formatters {
            let file_name = format!(
                "{}-{}.{}",
                artifact_stem(report.project_name()),
                timestamp(report.generated_at()),
                formatter.extension()
            );
            let written = formatter
                .format_report(report)
                .and_then(|content| artifacts.sink.write_artifact(&file_name, &content));
            match written {
                Ok(path) => debug!(project = %report.project_name(), path = %path.display(), "report written"),
                Err(e) => warn!(project = %report.project_name(), file = %file_name, error = %e, "failed to write report"),
            }
        }
    }

    fn write_summary(&self, outcome: &RunOutcome) {
        let Some(artifacts) = &self.artifacts else {
            return;
        };
        let summary = outcome.summary();
        for formatter in &artifacts.formatters {
            let file_name = format!("summary-{}.{}", timestamp(Utc::now()), formatter.extension());
            let written = formatter
                .format_summary(&summary)
                .and_then(|content| artifacts.sink.write_artifact(&file_name, &content));
            match written {
                Ok(path) => info!(path = %path.display(), "summary written"),
                Err(e) => warn!(file = %file_name, error = %e, "failed to write summary"),
            }
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// File-name-safe version of a project name.
fn artifact_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
