use crate::auditing::domain::{Project, ScannerKind, ScannerSelector};
use crate::ports::outbound::Scanner;
use crate::shared::error::AuditError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of the scanners available to a run, keyed by kind.
///
/// Owned by the orchestrator and built once at startup. Iteration follows
/// `ScannerKind` order so auto-detection is deterministic.
#[derive(Default, Clone)]
pub struct ScannerRegistry {
    scanners: BTreeMap<ScannerKind, Arc<dyn Scanner>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scanner, replacing any previous one of the same kind.
    pub fn with_scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.scanners.insert(scanner.kind(), scanner);
        self
    }

    pub fn get(&self, kind: ScannerKind) -> Option<Arc<dyn Scanner>> {
        self.scanners.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ScannerKind> {
        self.scanners.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Works out which scanners apply to `project`.
    ///
    /// Explicit selectors must name only registered scanners; auto selectors
    /// must match at least one detection predicate.
    ///
    /// # Errors
    /// `NoApplicableScanner` in either failure case, before any scan runs.
    pub fn resolve(&self, project: &Project) -> Result<Vec<Arc<dyn Scanner>>, AuditError> {
        match &project.selector {
            ScannerSelector::Explicit(names) => {
                let mut selected: Vec<Arc<dyn Scanner>> = Vec::with_capacity(names.len());
                for name in names {
                    let kind = name
                        .parse::<ScannerKind>()
                        .map_err(|reason| AuditError::NoApplicableScanner {
                            project: project.name.clone(),
                            reason,
                        })?;
                    let scanner = self.get(kind).ok_or_else(|| AuditError::NoApplicableScanner {
                        project: project.name.clone(),
                        reason: format!("scanner '{}' is not registered", kind),
                    })?;
                    if !selected.iter().any(|s| s.kind() == kind) {
                        selected.push(scanner);
                    }
                }
                Ok(selected)
            }
            ScannerSelector::Auto => {
                let detected: Vec<Arc<dyn Scanner>> = self
                    .scanners
                    .values()
                    .filter(|scanner| scanner.detect(&project.path))
                    .cloned()
                    .collect();
                if detected.is_empty() {
                    return Err(AuditError::NoApplicableScanner {
                        project: project.name.clone(),
                        reason: format!("no supported manifest found in {}", project.path.display()),
                    });
                }
                Ok(detected)
            }
        }
    }
}

impl std::fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerRegistry")
            .field("scanners", &self.kinds())
            .finish()
    }
}
