use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The package ecosystems we know how to audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    Npm,
    Composer,
}

impl ScannerKind {
    pub const ALL: [ScannerKind; 2] = [ScannerKind::Npm, ScannerKind::Composer];

    pub fn as_str(self) -> &'static str {
        match self {
            ScannerKind::Npm => "npm",
            ScannerKind::Composer => "composer",
        }
    }

    /// Command an operator can run to apply the ecosystem's own fixes.
    pub fn fix_hint(self) -> &'static str {
        match self {
            ScannerKind::Npm => "npm audit fix",
            ScannerKind::Composer => "composer update",
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScannerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(ScannerKind::Npm),
            "composer" => Ok(ScannerKind::Composer),
            other => Err(format!("unknown scanner '{}'", other)),
        }
    }
}

/// Notification channels a report can be delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Telegram,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Telegram => write!(f, "telegram"),
        }
    }
}

/// Identifier of a discussion thread on a threaded channel. Zero means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(i64);

impl ThreadId {
    pub const NONE: ThreadId = ThreadId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which scanners apply to a project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerSelector {
    /// Probe every registered scanner's detection predicate.
    #[default]
    Auto,
    /// Exactly these scanner names, in this order.
    Explicit(Vec<String>),
}

impl ScannerSelector {
    /// Parses `auto` or a comma-separated list such as `npm,composer`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return ScannerSelector::Auto;
        }
        let names = trimmed
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if names.is_empty() {
            ScannerSelector::Auto
        } else {
            ScannerSelector::Explicit(names)
        }
    }
}

impl fmt::Display for ScannerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerSelector::Auto => write!(f, "auto"),
            ScannerSelector::Explicit(names) => write!(f, "{}", names.join(",")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationTargets {
    pub email: Vec<String>,
    pub telegram: bool,
}

/// A project whose dependencies are audited on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub selector: ScannerSelector,
    pub ignore_list: Vec<String>,
    pub enabled: bool,
    pub notifications: NotificationTargets,
    pub thread_id: Option<ThreadId>,
}

impl Project {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            selector: ScannerSelector::Auto,
            ignore_list: Vec::new(),
            enabled: true,
            notifications: NotificationTargets::default(),
            thread_id: None,
        }
    }

    pub fn with_selector(mut self, selector: ScannerSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_ignore_list(mut self, ignore_list: Vec<String>) -> Self {
        self.ignore_list = ignore_list;
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationTargets) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_thread_id(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = (!thread_id.is_none()).then_some(thread_id);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
