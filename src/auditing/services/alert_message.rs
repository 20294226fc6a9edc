use crate::auditing::domain::{CombinedReport, ScannerKind, Severity};

/// Number of individual vulnerabilities listed in an alert.
pub const TOP_ISSUES: usize = 5;

/// One alert rendered for every channel flavour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    /// Telegram legacy Markdown
    pub markdown: String,
    /// Fallback when the Markdown variant is rejected
    pub plain: String,
    pub html: String,
}

/// AlertMessageBuilder - Renders a combined report as a chat/e-mail alert
pub struct AlertMessageBuilder;

impl AlertMessageBuilder {
    pub fn build(report: &CombinedReport) -> NotificationMessage {
        NotificationMessage {
            subject: Self::subject(report),
            markdown: Self::markdown(report),
            plain: Self::plain(report),
            html: Self::html(report),
        }
    }

    fn header_emoji(report: &CombinedReport) -> &'static str {
        report
            .highest_severity()
            .map(Severity::emoji)
            .unwrap_or(Severity::Info.emoji())
    }

    fn subject(report: &CombinedReport) -> String {
        let label = match report.highest_severity() {
            Some(Severity::Critical) => "CRITICAL",
            Some(Severity::High) => "HIGH",
            _ => "MODERATE",
        };
        format!(
            "[{}] Security Alert: {} - {} vulnerabilities found",
            label,
            report.project_name(),
            report.counts().total()
        )
    }

    fn markdown(report: &CombinedReport) -> String {
        let counts = report.counts();
        let mut out = String::new();

        out.push_str(&format!(
            "{} *Security Alert: {}*\n\n",
            Self::header_emoji(report),
            escape_markdown(report.project_name())
        ));

        out.push_str("*Combined Vulnerabilities:*\n");
        for severity in [Severity::Critical, Severity::High, Severity::Moderate, Severity::Low] {
            let count = counts.get(severity);
            if count > 0 {
                out.push_str(&format!("  - {}: {}\n", capitalize(severity.as_str()), count));
            }
        }
        out.push_str(&format!("  - *Total: {}*\n\n", counts.total()));

        out.push_str("*Breakdown by Package Manager:*\n");
        out.push_str(&Self::breakdown_lines(report));
        out.push('\n');

        out.push_str(&Self::top_issues(report, "*Top Issues:*", escape_markdown));

        let fixes = fix_commands(report)
            .iter()
            .map(|cmd| format!("`{}`", cmd))
            .collect::<Vec<_>>();
        if !fixes.is_empty() {
            out.push_str(&format!("_Run {} to fix issues_", fixes.join(" and ")));
        }

        out
    }

    fn plain(report: &CombinedReport) -> String {
        let counts = report.counts();
        let mut out = String::new();

        out.push_str(&format!(
            "{} Security Alert: {}\n\n",
            Self::header_emoji(report),
            report.project_name()
        ));

        out.push_str("Combined Vulnerabilities:\n");
        for severity in [Severity::Critical, Severity::High, Severity::Moderate, Severity::Low] {
            out.push_str(&format!(
                "  - {}: {}\n",
                capitalize(severity.as_str()),
                counts.get(severity)
            ));
        }
        out.push_str(&format!("  - Total: {}\n\n", counts.total()));

        out.push_str("Breakdown by Package Manager:\n");
        out.push_str(&Self::breakdown_lines(report));
        out.push('\n');

        out.push_str(&Self::top_issues(report, "Top Issues:", |s| s.to_string()));

        let fixes = fix_commands(report);
        if !fixes.is_empty() {
            out.push_str(&format!("Run {} to fix issues", fixes.join(" and ")));
        }

        out
    }

    /// One line per scanner that found something.
    fn breakdown_lines(report: &CombinedReport) -> String {
        report
            .breakdown()
            .iter()
            .filter(|entry| entry.counts.total() > 0)
            .map(|entry| {
                format!(
                    "  - {}: {} vulnerabilities\n",
                    entry.scanner.as_str().to_uppercase(),
                    entry.counts.total()
                )
            })
            .collect()
    }

    fn top_issues(
        report: &CombinedReport,
        heading: &str,
        escape: impl Fn(&str) -> String,
    ) -> String {
        let top = report.top_vulnerabilities(TOP_ISSUES);
        if top.is_empty() {
            return String::new();
        }

        let mut out = format!("{}\n", heading);
        for (i, vuln) in top.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} ({})",
                i + 1,
                escape(vuln.package_name()),
                vuln.severity().as_str().to_uppercase()
            ));
            if let Some(id) = vuln.identifier() {
                out.push_str(&format!(" {}", escape(id)));
            }
            out.push('\n');
        }

        let total = report.vulnerabilities().count();
        if total > TOP_ISSUES {
            out.push_str(&format!("... and {} more\n", total - TOP_ISSUES));
        }
        out.push('\n');
        out
    }

    fn html(report: &CombinedReport) -> String {
        let counts = report.counts();
        let mut out = format!(
            "<h2>Security Alert: {}</h2><p>Generated at {}</p>",
            escape_html(report.project_name()),
            report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
        );

        out.push_str("<ul>");
        for severity in Severity::DESCENDING {
            out.push_str(&format!(
                "<li>{}: {}</li>",
                capitalize(severity.as_str()),
                counts.get(severity)
            ));
        }
        out.push_str(&format!("<li><strong>Total: {}</strong></li></ul>", counts.total()));

        out.push_str(
            "<table><thead><tr><th>Package</th><th>Severity</th><th>ID</th><th>Title</th><th>Fixed in</th></tr></thead><tbody>",
        );
        for vuln in report.vulnerabilities() {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(vuln.package_name()),
                vuln.severity(),
                escape_html(vuln.identifier().unwrap_or("-")),
                escape_html(vuln.title()),
                escape_html(vuln.fixed_range().unwrap_or("-"))
            ));
        }
        out.push_str("</tbody></table>");

        let fixes = fix_commands(report);
        if !fixes.is_empty() {
            let cmds = fixes
                .iter()
                .map(|cmd| format!("<code>{}</code>", cmd))
                .collect::<Vec<_>>()
                .join(" and ");
            out.push_str(&format!("<p>Run {} to fix issues.</p>", cmds));
        }

        out
    }
}

/// One fix command per distinct scanner kind, in report order.
fn fix_commands(report: &CombinedReport) -> Vec<&'static str> {
    let mut seen: Vec<ScannerKind> = Vec::new();
    for scanner in report.scanners() {
        if !seen.contains(&scanner) {
            seen.push(scanner);
        }
    }
    seen.into_iter().map(ScannerKind::fix_hint).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escapes the characters Telegram's legacy Markdown treats as markup.
fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
