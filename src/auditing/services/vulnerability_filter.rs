use crate::auditing::domain::{ScanResult, Severity};
use crate::auditing::policies::SeverityPolicy;
use std::collections::HashSet;

/// VulnerabilityFilter - Drops ignored and below-threshold findings
///
/// Ignore tokens match a vulnerability's package name or identifier exactly.
/// Both checks are plain membership tests, so their order does not matter and
/// applying the filter twice is the same as applying it once.
#[derive(Debug, Clone)]
pub struct VulnerabilityFilter {
    ignored: HashSet<String>,
    policy: SeverityPolicy,
}

impl VulnerabilityFilter {
    pub fn new(ignore_list: &[String], threshold: Severity) -> Self {
        Self {
            ignored: ignore_list
                .iter()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect(),
            policy: SeverityPolicy::new(threshold),
        }
    }

    pub fn apply(&self, result: ScanResult) -> ScanResult {
        result.retain(|v| {
            self.policy.retains(v) && !self.ignored.iter().any(|token| v.matches_token(token))
        })
    }
}
