use super::command::run_audit_command;
use crate::auditing::domain::{Project, ScanResult, ScannerKind, Severity, Vulnerability};
use crate::ports::outbound::Scanner;
use crate::shared::error::AuditError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// `npm audit` exits 1 when it finds vulnerabilities.
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1];

/// NpmScanner runs `npm audit --json` inside a project directory
pub struct NpmScanner {
    program: String,
}

impl NpmScanner {
    pub fn new() -> Self {
        Self {
            program: "npm".to_string(),
        }
    }

    /// Overrides the npm executable (absolute path or name on PATH).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for NpmScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for NpmScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Npm
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join("package.json").is_file() || project_dir.join("package-lock.json").is_file()
    }

    async fn audit(
        &self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, AuditError> {
        let stdout = run_audit_command(
            ScannerKind::Npm,
            &self.program,
            &["audit", "--json"],
            &project.path,
            ACCEPTED_EXIT_CODES,
            cancel,
        )
        .await?;

        let vulnerabilities = parse_npm_audit(&stdout)?;
        tracing::debug!(
            project = %project.name,
            count = vulnerabilities.len(),
            "npm audit parsed"
        );
        Ok(ScanResult::new(
            ScannerKind::Npm,
            project.name.clone(),
            vulnerabilities,
        ))
    }
}

/// Top-level shape of `npm audit --json` (lockfile v2+ format).
#[derive(Debug, Deserialize)]
struct NpmAuditOutput {
    #[serde(default)]
    vulnerabilities: BTreeMap<String, NpmVulnerability>,
    #[serde(default)]
    error: Option<NpmError>,
}

#[derive(Debug, Deserialize)]
struct NpmError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct NpmVulnerability {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    severity: String,
    #[serde(default, rename = "isDirect")]
    is_direct: bool,
    #[serde(default)]
    via: Vec<NpmVia>,
    #[serde(default)]
    range: String,
    #[serde(default, rename = "fixAvailable")]
    fix_available: Option<NpmFix>,
}

/// `via` entries are either the name of a vulnerable dependency or an advisory.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NpmVia {
    Dependency(String),
    Advisory(NpmAdvisory),
}

#[derive(Debug, Deserialize)]
struct NpmAdvisory {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

/// `fixAvailable` is either a flag or the upgrade npm would apply.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NpmFix {
    Flag(bool),
    Upgrade {
        #[serde(default)]
        version: String,
    },
}

impl NpmFix {
    fn is_available(&self) -> bool {
        match self {
            NpmFix::Flag(flag) => *flag,
            NpmFix::Upgrade { .. } => true,
        }
    }

    fn version(&self) -> Option<&str> {
        match self {
            NpmFix::Upgrade { version } if !version.is_empty() => Some(version),
            _ => None,
        }
    }
}

/// Parses `npm audit --json` output into vulnerabilities, one per affected package.
pub(crate) fn parse_npm_audit(output: &str) -> Result<Vec<Vulnerability>, AuditError> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parsed: NpmAuditOutput =
        serde_json::from_str(output).map_err(|e| AuditError::ScanOutputUnparseable {
            scanner: ScannerKind::Npm,
            details: e.to_string(),
        })?;

    if let Some(error) = parsed.error {
        return Err(AuditError::ScanExecutionFailed {
            scanner: ScannerKind::Npm,
            exit_code: None,
            details: format!("{}: {}", error.code, error.summary),
        });
    }

    Ok(parsed
        .vulnerabilities
        .into_iter()
        .map(|(key, vuln)| to_vulnerability(key, vuln))
        .collect())
}

fn to_vulnerability(key: String, vuln: NpmVulnerability) -> Vulnerability {
    let package = vuln.name.filter(|n| !n.is_empty()).unwrap_or(key);

    // Later advisories override earlier ones, matching npm's own ordering.
    let mut title = String::new();
    let mut url = String::new();
    let mut dependency = None;
    for via in &vuln.via {
        match via {
            NpmVia::Advisory(advisory) => {
                if !advisory.title.is_empty() {
                    title = advisory.title.clone();
                }
                if !advisory.url.is_empty() {
                    url = advisory.url.clone();
                }
            }
            NpmVia::Dependency(name) => {
                dependency.get_or_insert(name.as_str());
            }
        }
    }
    if title.is_empty() {
        title = match dependency {
            Some(dep) => format!("Vulnerability via dependency: {}", dep),
            None => format!("Vulnerable versions: {}", vuln.range),
        };
    }

    let fix = vuln.fix_available.as_ref();
    let remediation = remediation_text(&package, fix, vuln.is_direct);

    let mut vulnerability = Vulnerability::new(&package, Severity::from_label(&vuln.severity), title)
        .with_affected_range(vuln.range)
        .with_remediation(remediation);
    if let Some(id) = advisory_identifier(&url) {
        vulnerability = vulnerability.with_identifier(id);
    }
    if let Some(version) = fix.and_then(NpmFix::version) {
        vulnerability = vulnerability.with_fixed_range(version);
    }
    vulnerability.with_reference_url(url)
}

/// Pulls a CVE (preferred) or GHSA id out of an advisory URL path.
fn advisory_identifier(url: &str) -> Option<&str> {
    let segments = || url.split('/').filter(|s| !s.is_empty());
    segments()
        .find(|s| s.starts_with("CVE-"))
        .or_else(|| segments().find(|s| s.starts_with("GHSA-")))
}

fn remediation_text(package: &str, fix: Option<&NpmFix>, is_direct: bool) -> String {
    let mut text = String::new();
    if let Some(version) = fix.and_then(NpmFix::version) {
        text.push_str(&format!("Update {} to version {}. ", package, version));
    }
    if fix.is_some_and(NpmFix::is_available) {
        text.push_str("Run 'npm audit fix' to automatically update. ");
    } else {
        text.push_str("No automatic fix available. Manual intervention required. ");
    }
    text.push_str(if is_direct {
        "This is a direct dependency."
    } else {
        "This is a transitive dependency."
    });
    text
}
