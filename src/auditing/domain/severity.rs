use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Vulnerability severity, ordered from least to most severe.
///
/// The derived `Ord` follows declaration order, so `Critical > High > ... > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// All severities from most to least severe.
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Moderate,
        Severity::Low,
        Severity::Info,
    ];

    pub fn ordinal(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Moderate => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Maps a scanner-provided label onto the fixed scale.
    ///
    /// Matching is case-insensitive, `medium` is an alias for `moderate`, and
    /// anything unrecognised becomes `Info`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "moderate" | "medium" => Severity::Moderate,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Severity::Critical => "🚨",
            Severity::High => "⚠️",
            Severity::Moderate => "🟡",
            Severity::Low | Severity::Info => "🟢",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing used for configuration values, where a typo should be
/// reported rather than silently downgraded to `info`.
impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "moderate" | "medium" => Ok(Severity::Moderate),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!(
                "Invalid severity '{}'. Expected one of: critical, high, moderate, low, info",
                other
            )),
        }
    }
}

/// Per-severity vulnerability counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Moderate => self.moderate,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.moderate + self.low + self.info
    }

    /// Highest severity with a non-zero count.
    pub fn highest(&self) -> Option<Severity> {
        Severity::DESCENDING
            .into_iter()
            .find(|severity| self.get(*severity) > 0)
    }
}

impl FromIterator<Severity> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        let mut counts = SeverityCounts::default();
        for severity in iter {
            counts.record(severity);
        }
        counts
    }
}

impl Add for SeverityCounts {
    type Output = SeverityCounts;

    fn add(self, rhs: SeverityCounts) -> SeverityCounts {
        SeverityCounts {
            critical: self.critical + rhs.critical,
            high: self.high + rhs.high,
            moderate: self.moderate + rhs.moderate,
            low: self.low + rhs.low,
            info: self.info + rhs.info,
        }
    }
}

impl AddAssign for SeverityCounts {
    fn add_assign(&mut self, rhs: SeverityCounts) {
        *self = *self + rhs;
    }
}

impl Sum for SeverityCounts {
    fn sum<I: Iterator<Item = SeverityCounts>>(iter: I) -> Self {
        iter.fold(SeverityCounts::default(), Add::add)
    }
}
