use crate::auditing::domain::{Severity, Vulnerability};

/// SeverityPolicy decides which vulnerabilities are worth reporting
///
/// A vulnerability is retained when its severity is at or above the
/// configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityPolicy {
    threshold: Severity,
}

impl SeverityPolicy {
    pub fn new(threshold: Severity) -> Self {
        Self { threshold }
    }

    /// Ordinal of a raw scanner label (critical=4 ... info=0).
    pub fn ordinal(label: &str) -> u8 {
        Severity::from_label(label).ordinal()
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn meets_threshold(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }

    pub fn retains(&self, vulnerability: &Vulnerability) -> bool {
        self.meets_threshold(vulnerability.severity())
    }
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::new(Severity::Moderate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_of_labels() {
        assert_eq!(SeverityPolicy::ordinal("critical"), 4);
        assert_eq!(SeverityPolicy::ordinal("high"), 3);
        assert_eq!(SeverityPolicy::ordinal("medium"), 2);
        assert_eq!(SeverityPolicy::ordinal("low"), 1);
        assert_eq!(SeverityPolicy::ordinal("unknown"), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = SeverityPolicy::new(Severity::High);
        assert!(policy.meets_threshold(Severity::Critical));
        assert!(policy.meets_threshold(Severity::High));
        assert!(!policy.meets_threshold(Severity::Moderate));
    }

    #[test]
    fn test_info_threshold_retains_everything() {
        let policy = SeverityPolicy::new(Severity::Info);
        for severity in Severity::DESCENDING {
            assert!(policy.meets_threshold(severity));
        }
    }

    #[test]
    fn test_default_threshold_is_moderate() {
        assert_eq!(SeverityPolicy::default().threshold(), Severity::Moderate);
    }
}
