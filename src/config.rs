//! Configuration file support for audit-checks.
//!
//! Provides YAML-based configuration through `audit-checks.config.yml` files:
//! the raw file schema, loading and validation, environment overrides for
//! secrets, and resolution into the typed [`Settings`] the binary runs with.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::dto::ReportFormat;
use crate::application::services::RetryPolicy;
use crate::auditing::domain::{NotificationTargets, Project, ScannerKind, ScannerSelector, Severity};
use crate::shared::security::{validate_regular_file, MAX_CONFIG_FILE_SIZE};
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "audit-checks.config.yml";

const DEFAULT_MAX_CONCURRENT: usize = 3;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 600;
const DEFAULT_REPORT_OUTPUT_DIR: &str = "./storage/reports";
const DEFAULT_STATE_DIR: &str = "./storage";

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub severity_threshold: Option<String>,
    pub max_concurrent: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub scan_timeout_secs: Option<u64>,
    pub report_formats: Option<Vec<String>>,
    pub report_output_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub telegram: Option<TelegramSection>,
    pub email: Option<EmailSection>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TelegramSection {
    #[serde(default)]
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub group_id: Option<i64>,
    pub api_base: Option<String>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EmailSection {
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub api_url: Option<String>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// One entry of the `projects:` list.
#[derive(Debug, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub path: PathBuf,
    /// `auto` or a comma-separated list of scanner names
    #[serde(rename = "type")]
    pub scanner_type: Option<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub notifications: NotificationsEntry,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NotificationsEntry {
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub telegram: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub group_id: i64,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub api_key: String,
    pub from: String,
    pub api_url: Option<String>,
}

/// Fully resolved run settings: defaults applied, secrets merged, values validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub severity_threshold: Severity,
    pub max_concurrent: usize,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub scan_timeout: Duration,
    pub report_formats: Vec<ReportFormat>,
    pub report_output_dir: PathBuf,
    pub state_dir: PathBuf,
    pub telegram: Option<TelegramSettings>,
    pub email: Option<EmailSettings>,
    pub projects: Vec<Project>,
}

impl Settings {
    /// Resolves a loaded config file using the process environment for secrets.
    pub fn resolve(config: ConfigFile) -> Result<Self> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolves a loaded config file with an explicit environment lookup.
    pub fn resolve_with<F>(config: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let severity_threshold = match config.severity_threshold.as_deref() {
            None => Severity::Moderate,
            Some(label) => label.parse::<Severity>().map_err(|e| {
                anyhow::anyhow!(
                    "Invalid config: severity_threshold: {}\n\n\
                     💡 Hint: Use one of: critical, high, moderate, low, info",
                    e
                )
            })?,
        };

        let max_concurrent = config.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT);
        if max_concurrent == 0 {
            bail!(
                "Invalid config: max_concurrent must be at least 1.\n\n\
                 💡 Hint: Remove the field to use the default ({}).",
                DEFAULT_MAX_CONCURRENT
            );
        }

        let retry_attempts = config.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        if retry_attempts == 0 {
            bail!(
                "Invalid config: retry_attempts must be at least 1 (it counts the first attempt).\n\n\
                 💡 Hint: Use 1 to disable retries."
            );
        }

        let report_formats = match config.report_formats {
            None => vec![ReportFormat::Json, ReportFormat::Markdown],
            Some(names) => names
                .iter()
                .map(|name| {
                    name.parse::<ReportFormat>()
                        .map_err(|e| anyhow::anyhow!("Invalid config: report_formats: {}", e))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let telegram = resolve_telegram(config.telegram.unwrap_or_default(), &env)?;
        let email = resolve_email(config.email.unwrap_or_default(), &env)?;
        let projects = resolve_projects(config.projects)?;

        Ok(Self {
            severity_threshold,
            max_concurrent,
            retry_attempts,
            retry_backoff: Duration::from_millis(
                config.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            ),
            scan_timeout: Duration::from_secs(
                config.scan_timeout_secs.unwrap_or(DEFAULT_SCAN_TIMEOUT_SECS),
            ),
            report_formats,
            report_output_dir: config
                .report_output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_OUTPUT_DIR)),
            state_dir: config
                .state_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            telegram,
            email,
            projects,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_backoff, self.scan_timeout)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_telegram<F>(section: TelegramSection, env: &F) -> Result<Option<TelegramSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    if !section.enabled {
        return Ok(None);
    }

    let bot_token = non_empty(env("TELEGRAM_BOT_TOKEN")).or_else(|| non_empty(section.bot_token));
    let group_id = match non_empty(env("TELEGRAM_GROUP_ID")) {
        Some(raw) => Some(raw.parse::<i64>().with_context(|| {
            format!("Invalid TELEGRAM_GROUP_ID '{}': expected an integer chat id", raw)
        })?),
        None => section.group_id,
    };

    match (bot_token, group_id) {
        (Some(bot_token), Some(group_id)) => Ok(Some(TelegramSettings {
            bot_token,
            group_id,
            api_base: non_empty(section.api_base),
        })),
        _ => bail!(
            "Invalid config: telegram is enabled but bot_token or group_id is missing.\n\n\
             💡 Hint: Set telegram.bot_token and telegram.group_id, or the TELEGRAM_BOT_TOKEN \
             and TELEGRAM_GROUP_ID environment variables."
        ),
    }
}

fn resolve_email<F>(section: EmailSection, env: &F) -> Result<Option<EmailSettings>>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = non_empty(env("RESEND_API_KEY")).or_else(|| non_empty(section.api_key));
    let from = non_empty(env("RESEND_FROM_EMAIL")).or_else(|| non_empty(section.from));

    match (api_key, from) {
        (Some(api_key), Some(from)) => Ok(Some(EmailSettings {
            api_key,
            from,
            api_url: non_empty(section.api_url),
        })),
        (None, None) => Ok(None),
        _ => bail!(
            "Invalid config: e-mail needs both an API key and a sender address.\n\n\
             💡 Hint: Set email.api_key and email.from, or the RESEND_API_KEY and \
             RESEND_FROM_EMAIL environment variables."
        ),
    }
}

fn resolve_projects(entries: Vec<ProjectEntry>) -> Result<Vec<Project>> {
    let mut seen = HashSet::new();
    let mut projects = Vec::with_capacity(entries.len());

    for (i, entry) in entries.into_iter().enumerate() {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            bail!(
                "Invalid config: projects[{}].name must not be empty.\n\n\
                 💡 Hint: Each project needs a unique, non-empty 'name'.",
                i
            );
        }
        if !seen.insert(name.clone()) {
            bail!(
                "Invalid config: duplicate project name '{}'.\n\n\
                 💡 Hint: Project names identify saved thread ids and must be unique.",
                name
            );
        }
        if entry.path.as_os_str().is_empty() {
            bail!("Invalid config: projects[{}] ('{}') has an empty path.", i, name);
        }

        let selector = ScannerSelector::parse(entry.scanner_type.as_deref().unwrap_or("auto"));
        if let ScannerSelector::Explicit(names) = &selector {
            for unknown in names.iter().filter(|n| n.parse::<ScannerKind>().is_err()) {
                tracing::warn!(
                    project = %name,
                    scanner = %unknown,
                    "unknown scanner type; the project will fail at scan time"
                );
            }
        }

        let mut project = Project::new(name, entry.path)
            .with_selector(selector)
            .with_ignore_list(entry.ignore)
            .with_notifications(NotificationTargets {
                email: entry.notifications.email,
                telegram: entry.notifications.telegram,
            });
        if entry.enabled == Some(false) {
            project = project.disabled();
        }
        projects.push(project);
    }

    Ok(projects)
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        validate_regular_file(path, "config file", MAX_CONFIG_FILE_SIZE)?;
    }

    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Collects unknown field paths at every level of the file.
fn unknown_field_paths(config: &ConfigFile) -> Vec<String> {
    let mut paths: Vec<String> = config.unknown_fields.keys().cloned().collect();
    if let Some(telegram) = &config.telegram {
        paths.extend(telegram.unknown_fields.keys().map(|k| format!("telegram.{}", k)));
    }
    if let Some(email) = &config.email {
        paths.extend(email.unknown_fields.keys().map(|k| format!("email.{}", k)));
    }
    for (i, project) in config.projects.iter().enumerate() {
        paths.extend(
            project
                .unknown_fields
                .keys()
                .map(|k| format!("projects[{}].{}", i, k)),
        );
    }
    paths.sort();
    paths
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for path in unknown_field_paths(config) {
        tracing::warn!(field = %path, "unknown config field will be ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
severity_threshold: high
max_concurrent: 5
retry_attempts: 2
retry_backoff_ms: 250
scan_timeout_secs: 120
report_formats: [json]
report_output_dir: /var/lib/audit/reports
state_dir: /var/lib/audit
telegram:
  enabled: true
  bot_token: "123:abc"
  group_id: -100200300
email:
  api_key: re_file_key
  from: alerts@example.com
projects:
  - name: shop
    path: /srv/shop
    type: npm,composer
    ignore: [CVE-2021-23337, minimist]
    notifications:
      email: [ops@example.com]
      telegram: true
  - name: legacy
    path: /srv/legacy
    enabled: false
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(yaml: &str) -> ConfigFile {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.severity_threshold.as_deref(), Some("high"));
        assert_eq!(config.max_concurrent, Some(5));
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.projects[0].scanner_type.as_deref(), Some("npm,composer"));
        assert!(config.unknown_fields.is_empty());
    }

    #[test]
    fn test_resolve_full_config() {
        let settings = Settings::resolve_with(parse(FULL_CONFIG), no_env).unwrap();

        assert_eq!(settings.severity_threshold, Severity::High);
        assert_eq!(settings.max_concurrent, 5);
        assert_eq!(settings.report_formats, vec![ReportFormat::Json]);
        assert_eq!(settings.state_dir, PathBuf::from("/var/lib/audit"));

        let retry = settings.retry_policy();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.backoff_unit, Duration::from_millis(250));
        assert_eq!(retry.scan_timeout, Duration::from_secs(120));

        let telegram = settings.telegram.unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.group_id, -100200300);
        assert_eq!(settings.email.unwrap().from, "alerts@example.com");

        let shop = &settings.projects[0];
        assert_eq!(
            shop.selector,
            ScannerSelector::Explicit(vec!["npm".to_string(), "composer".to_string()])
        );
        assert_eq!(shop.ignore_list.len(), 2);
        assert!(shop.notifications.telegram);
        assert_eq!(shop.notifications.email, vec!["ops@example.com".to_string()]);
        assert!(shop.enabled);
        assert!(!settings.projects[1].enabled);
        assert_eq!(settings.projects[1].selector, ScannerSelector::Auto);
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve_with(ConfigFile::default(), no_env).unwrap();
        assert_eq!(settings.severity_threshold, Severity::Moderate);
        assert_eq!(settings.max_concurrent, 3);
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.retry_backoff, Duration::from_secs(1));
        assert_eq!(settings.scan_timeout, Duration::from_secs(600));
        assert_eq!(
            settings.report_formats,
            vec![ReportFormat::Json, ReportFormat::Markdown]
        );
        assert_eq!(settings.report_output_dir, PathBuf::from("./storage/reports"));
        assert_eq!(settings.state_dir, PathBuf::from("./storage"));
        assert!(settings.telegram.is_none());
        assert!(settings.email.is_none());
        assert!(settings.projects.is_empty());
    }

    #[test]
    fn test_environment_overrides_secrets() {
        let env = |key: &str| match key {
            "TELEGRAM_BOT_TOKEN" => Some("999:env".to_string()),
            "TELEGRAM_GROUP_ID" => Some("-42".to_string()),
            "RESEND_API_KEY" => Some("re_env_key".to_string()),
            _ => None,
        };
        let settings = Settings::resolve_with(parse(FULL_CONFIG), env).unwrap();

        let telegram = settings.telegram.unwrap();
        assert_eq!(telegram.bot_token, "999:env");
        assert_eq!(telegram.group_id, -42);
        let email = settings.email.unwrap();
        assert_eq!(email.api_key, "re_env_key");
        assert_eq!(email.from, "alerts@example.com");
    }

    #[test]
    fn test_environment_only_secrets() {
        let yaml = "telegram:\n  enabled: true\n";
        let env = |key: &str| match key {
            "TELEGRAM_BOT_TOKEN" => Some("1:t".to_string()),
            "TELEGRAM_GROUP_ID" => Some("-7".to_string()),
            "RESEND_API_KEY" => Some("key".to_string()),
            "RESEND_FROM_EMAIL" => Some("a@example.com".to_string()),
            _ => None,
        };
        let settings = Settings::resolve_with(parse(yaml), env).unwrap();
        assert_eq!(settings.telegram.unwrap().group_id, -7);
        assert_eq!(settings.email.unwrap().api_key, "key");
    }

    #[test]
    fn test_disabled_telegram_ignores_missing_credentials() {
        let settings =
            Settings::resolve_with(parse("telegram:\n  enabled: false\n"), no_env).unwrap();
        assert!(settings.telegram.is_none());
    }

    #[test]
    fn test_enabled_telegram_requires_credentials() {
        let err = Settings::resolve_with(parse("telegram:\n  enabled: true\n"), no_env)
            .unwrap_err();
        assert!(err.to_string().contains("bot_token or group_id is missing"));
    }

    #[test]
    fn test_invalid_group_id_env() {
        let env = |key: &str| (key == "TELEGRAM_GROUP_ID").then(|| "general".to_string());
        let err = Settings::resolve_with(parse(FULL_CONFIG), env).unwrap_err();
        assert!(err.to_string().contains("Invalid TELEGRAM_GROUP_ID"));
    }

    #[test]
    fn test_partial_email_config_is_rejected() {
        let err = Settings::resolve_with(parse("email:\n  api_key: re_x\n"), no_env).unwrap_err();
        assert!(err.to_string().contains("both an API key and a sender address"));
    }

    #[test]
    fn test_invalid_severity_threshold() {
        let err = Settings::resolve_with(parse("severity_threshold: urgent\n"), no_env)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("severity_threshold"));
        assert!(message.contains("💡 Hint:"));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = Settings::resolve_with(parse("max_concurrent: 0\n"), no_env).unwrap_err();
        assert!(err.to_string().contains("max_concurrent must be at least 1"));
    }

    #[test]
    fn test_zero_retry_attempts_is_rejected() {
        let err = Settings::resolve_with(parse("retry_attempts: 0\n"), no_env).unwrap_err();
        assert!(err.to_string().contains("retry_attempts must be at least 1"));
    }

    #[test]
    fn test_invalid_report_format() {
        let err = Settings::resolve_with(parse("report_formats: [json, pdf]\n"), no_env)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid report format: pdf"));
    }

    #[test]
    fn test_duplicate_project_names() {
        let yaml = r#"
projects:
  - name: shop
    path: /a
  - name: shop
    path: /b
"#;
        let err = Settings::resolve_with(parse(yaml), no_env).unwrap_err();
        assert!(err.to_string().contains("duplicate project name 'shop'"));
    }

    #[test]
    fn test_empty_project_name() {
        let yaml = "projects:\n  - name: \"  \"\n    path: /a\n";
        let err = Settings::resolve_with(parse(yaml), no_env).unwrap_err();
        assert!(err.to_string().contains("projects[0].name must not be empty"));
    }

    #[test]
    fn test_unknown_scanner_type_is_kept_for_scan_time() {
        let yaml = "projects:\n  - name: api\n    path: /srv/api\n    type: yarn\n";
        let settings = Settings::resolve_with(parse(yaml), no_env).unwrap();
        assert_eq!(
            settings.projects[0].selector,
            ScannerSelector::Explicit(vec!["yarn".to_string()])
        );
    }

    #[test]
    fn test_unknown_field_paths_cover_nested_sections() {
        let yaml = r#"
colour: blue
telegram:
  enabled: false
  chat: 1
projects:
  - name: shop
    path: /srv/shop
    owner: team-a
"#;
        let paths = unknown_field_paths(&parse(yaml));
        assert_eq!(
            paths,
            vec![
                "colour".to_string(),
                "projects[0].owner".to_string(),
                "telegram.chat".to_string(),
            ]
        );
    }

    #[test]
    fn test_discover_config_found() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "max_concurrent: 1\n").unwrap();

        let config = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_concurrent, Some(1));
    }

    #[test]
    fn test_discover_config_not_found() {
        let dir = TempDir::new().unwrap();
        let config = discover_config(dir.path()).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config_from_path(Path::new("/nonexistent/config.yml"));
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("bad.yml");
        fs::write(&config_path, "invalid: yaml: [[[broken").unwrap();

        let err = format!("{}", load_config_from_path(&config_path).unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_config_rejects_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.yml");
        let link = dir.path().join(CONFIG_FILENAME);
        fs::write(&real, "projects: []\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let err = load_config_from_path(&link).unwrap_err();
        assert!(err.to_string().contains("symbolic link"));
    }
}
