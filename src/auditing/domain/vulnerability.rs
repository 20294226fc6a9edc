use super::Severity;
use serde::{Deserialize, Serialize};

/// A single advisory affecting one package, as reported by a scanner.
///
/// Built once by a scanner adapter and never mutated afterwards; the
/// `with_*` methods consume and return the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    package_name: String,
    severity: Severity,
    identifier: Option<String>,
    title: String,
    affected_range: String,
    fixed_range: Option<String>,
    reference_url: String,
    remediation_text: String,
}

impl Vulnerability {
    pub fn new(package_name: impl Into<String>, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            severity,
            identifier: None,
            title: title.into(),
            affected_range: String::new(),
            fixed_range: None,
            reference_url: String::new(),
            remediation_text: String::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        self.identifier = (!identifier.is_empty()).then_some(identifier);
        self
    }

    pub fn with_affected_range(mut self, range: impl Into<String>) -> Self {
        self.affected_range = range.into();
        self
    }

    pub fn with_fixed_range(mut self, range: impl Into<String>) -> Self {
        let range = range.into();
        self.fixed_range = (!range.is_empty()).then_some(range);
        self
    }

    pub fn with_reference_url(mut self, url: impl Into<String>) -> Self {
        self.reference_url = url.into();
        self
    }

    pub fn with_remediation(mut self, text: impl Into<String>) -> Self {
        self.remediation_text = text.into();
        self
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn affected_range(&self) -> &str {
        &self.affected_range
    }

    pub fn fixed_range(&self) -> Option<&str> {
        self.fixed_range.as_deref()
    }

    pub fn reference_url(&self) -> &str {
        &self.reference_url
    }

    pub fn remediation_text(&self) -> &str {
        &self.remediation_text
    }

    /// True when `token` names this vulnerability's package or identifier exactly.
    pub fn matches_token(&self, token: &str) -> bool {
        self.package_name == token || self.identifier.as_deref() == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let vuln = Vulnerability::new("lodash", Severity::High, "Prototype Pollution")
            .with_identifier("CVE-2020-8203")
            .with_affected_range("<4.17.19")
            .with_fixed_range("4.17.19")
            .with_reference_url("https://github.com/advisories/GHSA-p6mc-m468-83gw")
            .with_remediation("Upgrade lodash");

        assert_eq!(vuln.package_name(), "lodash");
        assert_eq!(vuln.severity(), Severity::High);
        assert_eq!(vuln.identifier(), Some("CVE-2020-8203"));
        assert_eq!(vuln.affected_range(), "<4.17.19");
        assert_eq!(vuln.fixed_range(), Some("4.17.19"));
        assert_eq!(vuln.remediation_text(), "Upgrade lodash");
    }

    #[test]
    fn test_empty_optional_fields_are_none() {
        let vuln = Vulnerability::new("pkg", Severity::Low, "t")
            .with_identifier("")
            .with_fixed_range("");
        assert_eq!(vuln.identifier(), None);
        assert_eq!(vuln.fixed_range(), None);
    }

    #[test]
    fn test_matches_token() {
        let vuln =
            Vulnerability::new("axios", Severity::Moderate, "SSRF").with_identifier("CVE-2023-45857");
        assert!(vuln.matches_token("axios"));
        assert!(vuln.matches_token("CVE-2023-45857"));
        assert!(!vuln.matches_token("ax"));
        assert!(!vuln.matches_token("cve-2023-45857"));
    }
}
