use super::command::run_audit_command;
use crate::auditing::domain::{Project, ScanResult, ScannerKind, Severity, Vulnerability};
use crate::ports::outbound::Scanner;
use crate::shared::error::AuditError;
use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// `composer audit` exits 1 for advisories and 3 when the lock file is stale.
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1, 3];

const CRITICAL_KEYWORDS: &[&str] = &["remote code execution", "rce", "sql injection"];
const HIGH_KEYWORDS: &[&str] = &["xss", "cross-site", "authentication bypass"];

/// ComposerScanner runs `composer audit --format=json` inside a project directory
pub struct ComposerScanner {
    program: String,
}

impl ComposerScanner {
    pub fn new() -> Self {
        Self {
            program: "composer".to_string(),
        }
    }

    /// Overrides the composer executable (absolute path or name on PATH).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for ComposerScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for ComposerScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Composer
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join("composer.json").is_file() || project_dir.join("composer.lock").is_file()
    }

    async fn audit(
        &self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, AuditError> {
        let stdout = run_audit_command(
            ScannerKind::Composer,
            &self.program,
            &["audit", "--format=json", "--no-interaction"],
            &project.path,
            ACCEPTED_EXIT_CODES,
            cancel,
        )
        .await?;

        let vulnerabilities = parse_composer_audit(&stdout)?;
        tracing::debug!(
            project = %project.name,
            count = vulnerabilities.len(),
            "composer audit parsed"
        );
        Ok(ScanResult::new(
            ScannerKind::Composer,
            project.name.clone(),
            vulnerabilities,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ComposerAuditOutput {
    #[serde(default)]
    advisories: ComposerAdvisories,
}

/// PHP serializes an empty map as `[]`, so both shapes must be accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComposerAdvisories {
    ByPackage(BTreeMap<String, AdvisoryList>),
    Empty(#[allow(dead_code)] Vec<IgnoredAny>),
}

impl Default for ComposerAdvisories {
    fn default() -> Self {
        ComposerAdvisories::Empty(Vec::new())
    }
}

/// Per-package advisories are a list, or an index-keyed map after filtering.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdvisoryList {
    List(Vec<ComposerAdvisory>),
    Indexed(BTreeMap<String, ComposerAdvisory>),
}

impl AdvisoryList {
    fn into_vec(self) -> Vec<ComposerAdvisory> {
        match self {
            AdvisoryList::List(list) => list,
            AdvisoryList::Indexed(map) => map.into_values().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposerAdvisory {
    #[serde(default)]
    advisory_id: String,
    #[serde(default)]
    package_name: String,
    #[serde(default)]
    affected_versions: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    cve: Option<String>,
    #[serde(default)]
    link: String,
    #[serde(default)]
    sources: Vec<AdvisorySource>,
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdvisorySource {
    #[serde(default)]
    name: String,
}

/// Parses `composer audit --format=json` output.
pub(crate) fn parse_composer_audit(output: &str) -> Result<Vec<Vulnerability>, AuditError> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "{}" || trimmed == "[]" {
        return Ok(Vec::new());
    }

    let parsed: ComposerAuditOutput =
        serde_json::from_str(trimmed).map_err(|e| AuditError::ScanOutputUnparseable {
            scanner: ScannerKind::Composer,
            details: e.to_string(),
        })?;

    let ComposerAdvisories::ByPackage(by_package) = parsed.advisories else {
        return Ok(Vec::new());
    };

    Ok(by_package
        .into_iter()
        .flat_map(|(package, list)| {
            list.into_vec()
                .into_iter()
                .map(move |advisory| to_vulnerability(&package, advisory))
        })
        .collect())
}

fn to_vulnerability(package_key: &str, advisory: ComposerAdvisory) -> Vulnerability {
    let package = if advisory.package_name.is_empty() {
        package_key.to_string()
    } else {
        advisory.package_name.clone()
    };
    let severity = infer_severity(&advisory);
    let identifier = advisory
        .cve
        .filter(|cve| !cve.is_empty())
        .unwrap_or(advisory.advisory_id);

    let mut remediation = format!(
        "Update {} to a patched version. Affected versions: {}. Run 'composer update {}' to update the package.",
        package, advisory.affected_versions, package
    );
    if !advisory.link.is_empty() {
        remediation.push_str(&format!(" See {} for more details.", advisory.link));
    }

    Vulnerability::new(&package, severity, advisory.title)
        .with_identifier(identifier)
        .with_affected_range(advisory.affected_versions)
        .with_reference_url(advisory.link)
        .with_remediation(remediation)
}

/// Older composer releases omit `severity`; fall back to source names, then title keywords.
fn infer_severity(advisory: &ComposerAdvisory) -> Severity {
    if let Some(label) = advisory.severity.as_deref().filter(|s| !s.trim().is_empty()) {
        return Severity::from_label(label);
    }

    for source in &advisory.sources {
        let name = source.name.to_lowercase();
        if name.contains("critical") {
            return Severity::Critical;
        }
        if name.contains("high") {
            return Severity::High;
        }
    }

    let title = advisory.title.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|k| title.contains(k)) {
        Severity::Critical
    } else if HIGH_KEYWORDS.iter().any(|k| title.contains(k)) {
        Severity::High
    } else {
        Severity::Moderate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
      "advisories": {
        "symfony/http-kernel": [
          {
            "advisoryId": "PKSA-1234",
            "packageName": "symfony/http-kernel",
            "affectedVersions": ">=4.4.0,<4.4.50",
            "title": "CVE-2022-24894: Prevent storing cookie headers in HttpCache",
            "cve": "CVE-2022-24894",
            "link": "https://symfony.com/cve-2022-24894",
            "reportedAt": "2023-02-01T08:00:00+00:00",
            "sources": [{ "name": "GitHub", "remoteId": "GHSA-h7vf-5wrv-9fhv" }],
            "severity": "medium"
          }
        ],
        "guzzlehttp/guzzle": {
          "3": {
            "advisoryId": "PKSA-9999",
            "packageName": "guzzlehttp/guzzle",
            "affectedVersions": "<7.4.5",
            "title": "Cross-site cookie leakage",
            "cve": null,
            "link": "",
            "sources": []
          }
        }
      },
      "abandoned": []
    }"#;

    #[test]
    fn test_parse_advisories() {
        let vulns = parse_composer_audit(SAMPLE).unwrap();
        assert_eq!(vulns.len(), 2);

        let guzzle = &vulns[0];
        assert_eq!(guzzle.package_name(), "guzzlehttp/guzzle");
        assert_eq!(guzzle.severity(), Severity::High);
        assert_eq!(guzzle.identifier(), Some("PKSA-9999"));
        assert!(!guzzle.remediation_text().contains("See "));

        let kernel = &vulns[1];
        assert_eq!(kernel.package_name(), "symfony/http-kernel");
        assert_eq!(kernel.severity(), Severity::Moderate);
        assert_eq!(kernel.identifier(), Some("CVE-2022-24894"));
        assert_eq!(kernel.affected_range(), ">=4.4.0,<4.4.50");
        assert_eq!(
            kernel.remediation_text(),
            "Update symfony/http-kernel to a patched version. Affected versions: >=4.4.0,<4.4.50. \
             Run 'composer update symfony/http-kernel' to update the package. \
             See https://symfony.com/cve-2022-24894 for more details."
        );
    }

    #[test]
    fn test_parse_empty_shapes() {
        for output in ["", "  ", "{}", "[]", r#"{"advisories": []}"#, r#"{"advisories": {}}"#] {
            assert!(parse_composer_audit(output).unwrap().is_empty(), "{output}");
        }
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_composer_audit("Composer could not find a composer.json").unwrap_err();
        assert!(matches!(err, AuditError::ScanOutputUnparseable { .. }));
    }

    fn advisory(title: &str, severity: Option<&str>, sources: &[&str]) -> ComposerAdvisory {
        ComposerAdvisory {
            advisory_id: "PKSA-1".to_string(),
            package_name: "vendor/pkg".to_string(),
            affected_versions: "<1.0".to_string(),
            title: title.to_string(),
            cve: None,
            link: String::new(),
            sources: sources
                .iter()
                .map(|name| AdvisorySource {
                    name: name.to_string(),
                })
                .collect(),
            severity: severity.map(str::to_string),
        }
    }

    #[test]
    fn test_infer_severity_precedence() {
        assert_eq!(
            infer_severity(&advisory("SQL injection", Some("low"), &[])),
            Severity::Low
        );
        assert_eq!(
            infer_severity(&advisory("Info leak", None, &["critical-db"])),
            Severity::Critical
        );
        assert_eq!(
            infer_severity(&advisory("Info leak", None, &["HighSec"])),
            Severity::High
        );
        assert_eq!(
            infer_severity(&advisory("Possible SQL Injection in query builder", None, &[])),
            Severity::Critical
        );
        assert_eq!(
            infer_severity(&advisory("Authentication bypass via header", Some(""), &[])),
            Severity::High
        );
        assert_eq!(
            infer_severity(&advisory("Open redirect", None, &["GitHub"])),
            Severity::Moderate
        );
    }

    #[test]
    fn test_detect() {
        let scanner = ComposerScanner::new();
        let dir = TempDir::new().unwrap();
        assert!(!scanner.detect(dir.path()));

        fs::write(dir.path().join("composer.lock"), "{}").unwrap();
        assert!(scanner.detect(dir.path()));
    }

    #[tokio::test]
    async fn test_audit_missing_binary_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let scanner = ComposerScanner::new().with_program("no-such-composer-binary");
        let project = Project::new("billing", dir.path());

        let err = scanner
            .audit(&project, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::ScannerUnavailable {
                scanner: ScannerKind::Composer,
                ..
            }
        ));
    }
}
