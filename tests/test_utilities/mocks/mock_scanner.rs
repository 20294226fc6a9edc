use async_trait::async_trait;
use audit_checks::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Outcome = std::result::Result<Vec<Vulnerability>, AuditError>;

/// Scripted Scanner: detects projects by a marker file name, returns canned findings
#[derive(Clone)]
pub struct MockScanner {
    kind: ScannerKind,
    marker: &'static str,
    findings: Arc<Mutex<HashMap<String, Outcome>>>,
    pub calls: Arc<AtomicUsize>,
}

impl MockScanner {
    pub fn new(kind: ScannerKind, marker: &'static str) -> Self {
        Self {
            kind,
            marker,
            findings: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn npm() -> Self {
        Self::new(ScannerKind::Npm, "package.json")
    }

    pub fn composer() -> Self {
        Self::new(ScannerKind::Composer, "composer.json")
    }

    /// Findings returned for `project` on every attempt
    pub fn with_findings(self, project: &str, vulnerabilities: Vec<Vulnerability>) -> Self {
        self.findings
            .lock()
            .unwrap()
            .insert(project.to_string(), Ok(vulnerabilities));
        self
    }

    /// Error returned for `project` on every attempt
    pub fn failing(self, project: &str, error: AuditError) -> Self {
        self.findings
            .lock()
            .unwrap()
            .insert(project.to_string(), Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn kind(&self) -> ScannerKind {
        self.kind
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join(self.marker).is_file()
    }

    async fn audit(
        &self,
        project: &Project,
        _cancel: &CancellationToken,
    ) -> std::result::Result<ScanResult, AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .findings
            .lock()
            .unwrap()
            .get(&project.name)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        outcome.map(|vulns| ScanResult::new(self.kind, project.name.clone(), vulns))
    }
}
