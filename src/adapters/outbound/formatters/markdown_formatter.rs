use crate::auditing::domain::{CombinedReport, RunSummary, Severity, SeverityCounts, Vulnerability};
use crate::ports::outbound::ReportFormatter;
use crate::shared::Result;

/// Markdown table header for severity counts
const COUNTS_TABLE_HEADER: &str = "| Severity | Count |\n";

/// Markdown table separator line for severity counts
const COUNTS_TABLE_SEPARATOR: &str = "|----------|-------|\n";

/// Markdown table header for vulnerability information
const VULN_TABLE_HEADER: &str =
    "| Package | Severity | ID | Title | Vulnerable Versions | Fixed Version |\n";

/// Markdown table separator line for vulnerability table
const VULN_TABLE_SEPARATOR: &str =
    "|---------|----------|----|-------|---------------------|---------------|\n";

/// MarkdownReportFormatter adapter for human-readable report artifacts
///
/// Renders one project's combined report (summary, per-scanner breakdown,
/// full vulnerability table, remediation hints) or the run-wide summary.
pub struct MarkdownReportFormatter;

impl MarkdownReportFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Escapes pipe characters and newlines for safe Markdown table rendering
    fn escape_markdown_table_cell(text: &str) -> String {
        text.replace('|', "\\|").replace('\n', " ")
    }

    fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
        if count == 1 {
            singular
        } else {
            plural
        }
    }
}

impl Default for MarkdownReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper methods for rendering sections
impl MarkdownReportFormatter {
    fn render_report_header(&self, output: &mut String, report: &CombinedReport) {
        output.push_str(&format!(
            "# Security Audit Report: {}\n\n",
            report.project_name()
        ));
        output.push_str(&format!(
            "- **Path:** `{}`\n",
            report.project_path().display()
        ));
        let scanners: Vec<&str> = report.scanners().iter().map(|s| s.as_str()).collect();
        output.push_str(&format!("- **Scanners:** {}\n", scanners.join(", ")));
        output.push_str(&format!(
            "- **Generated:** {}\n\n",
            report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    /// Renders a severity/count table, skipping the info bucket when empty
    fn render_counts(&self, output: &mut String, counts: &SeverityCounts) {
        output.push_str(COUNTS_TABLE_HEADER);
        output.push_str(COUNTS_TABLE_SEPARATOR);
        for severity in Severity::DESCENDING {
            let count = counts.get(severity);
            if severity == Severity::Info && count == 0 {
                continue;
            }
            output.push_str(&format!(
                "| {} {} | {} |\n",
                severity.emoji(),
                severity.as_str(),
                count
            ));
        }
        output.push_str(&format!("| **Total** | **{}** |\n\n", counts.total()));
    }

    fn render_breakdown(&self, output: &mut String, report: &CombinedReport) {
        output.push_str("## Breakdown by Package Manager\n\n");
        output.push_str("| Scanner | Critical | High | Moderate | Low | Total |\n");
        output.push_str("|---------|----------|------|----------|-----|-------|\n");
        for entry in report.breakdown() {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                entry.scanner,
                entry.counts.critical,
                entry.counts.high,
                entry.counts.moderate,
                entry.counts.low,
                entry.counts.total()
            ));
        }
        output.push('\n');
    }

    fn render_vulnerabilities(&self, output: &mut String, report: &CombinedReport) {
        let total = report.counts().total();
        output.push_str("## Vulnerabilities\n\n");
        if total == 0 {
            output.push_str("*No vulnerabilities found.*\n\n");
            return;
        }

        output.push_str(&format!(
            "**Found {} {}.**\n\n",
            total,
            Self::plural(total, "vulnerability", "vulnerabilities")
        ));
        output.push_str(VULN_TABLE_HEADER);
        output.push_str(VULN_TABLE_SEPARATOR);

        // Sort by severity (Critical first)
        for vuln in report.top_vulnerabilities(total) {
            self.render_vulnerability_row(output, vuln);
        }
        output.push('\n');
    }

    fn render_vulnerability_row(&self, output: &mut String, vuln: &Vulnerability) {
        let id = match (vuln.identifier(), vuln.reference_url()) {
            (Some(id), "") => Self::escape_markdown_table_cell(id),
            (Some(id), url) => format!("[{}]({})", Self::escape_markdown_table_cell(id), url),
            (None, "") => "-".to_string(),
            (None, url) => format!("[link]({})", url),
        };
        output.push_str(&format!(
            "| {} | {} {} | {} | {} | {} | {} |\n",
            Self::escape_markdown_table_cell(vuln.package_name()),
            vuln.severity().emoji(),
            vuln.severity().as_str(),
            id,
            Self::escape_markdown_table_cell(vuln.title()),
            Self::escape_markdown_table_cell(vuln.affected_range()),
            Self::escape_markdown_table_cell(vuln.fixed_range().unwrap_or("-"))
        ));
    }

    fn render_remediation(&self, output: &mut String, report: &CombinedReport) {
        if !report.has_vulnerabilities() {
            return;
        }
        output.push_str("## Remediation\n\n");
        for scanner in report.scanners() {
            output.push_str(&format!("- Run `{}`\n", scanner.fix_hint()));
        }
        output.push('\n');
    }

    fn render_run_overview(&self, output: &mut String, summary: &RunSummary) {
        output.push_str("# Audit Run Summary\n\n");
        output.push_str(&format!(
            "**{} {} audited, {} with vulnerabilities.**\n\n",
            summary.total_projects,
            Self::plural(summary.total_projects, "project", "projects"),
            summary.projects_with_vulnerabilities
        ));
        if summary.cancelled {
            output.push_str("> ⚠️ The run was cancelled; results are partial.\n\n");
        }
    }

    fn render_project_table(&self, output: &mut String, summary: &RunSummary) {
        output.push_str("## Projects\n\n");
        if summary.projects.is_empty() {
            output.push_str("*No projects were audited.*\n\n");
            return;
        }
        output.push_str("| Project | Scanners | Critical | High | Moderate | Low | Total |\n");
        output.push_str("|---------|----------|----------|------|----------|-----|-------|\n");
        for project in &summary.projects {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                Self::escape_markdown_table_cell(&project.name),
                project.scanners.join(", "),
                project.counts.critical,
                project.counts.high,
                project.counts.moderate,
                project.counts.low,
                project.counts.total()
            ));
        }
        output.push('\n');
    }

    fn render_errors(&self, output: &mut String, errors: &[String]) {
        if errors.is_empty() {
            return;
        }
        output.push_str("## Errors\n\n");
        for error in errors {
            // Hints span several lines; the first one carries the attribution.
            let first_line = error.lines().next().unwrap_or_default();
            output.push_str(&format!("- {}\n", first_line));
        }
        output.push('\n');
    }
}

impl ReportFormatter for MarkdownReportFormatter {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn format_report(&self, report: &CombinedReport) -> Result<String> {
        let mut output = String::new();
        self.render_report_header(&mut output, report);
        output.push_str("## Summary\n\n");
        self.render_counts(&mut output, &report.counts());
        self.render_breakdown(&mut output, report);
        self.render_vulnerabilities(&mut output, report);
        self.render_remediation(&mut output, report);
        Ok(output)
    }

    fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        let mut output = String::new();
        self.render_run_overview(&mut output, summary);
        output.push_str("## Combined Severity Counts\n\n");
        self.render_counts(&mut output, &summary.counts);
        self.render_project_table(&mut output, summary);
        self.render_errors(&mut output, &summary.errors);
        Ok(output)
    }
}
