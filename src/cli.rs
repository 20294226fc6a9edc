use clap::Parser;
use std::path::PathBuf;

/// Audit npm and composer dependencies across many projects and alert on findings
#[derive(Parser, Debug)]
#[command(name = "audit-checks")]
#[command(version)]
#[command(
    about = "Audit npm and composer dependencies across many projects and alert on findings",
    long_about = None
)]
pub struct Args {
    /// Path to the config file (defaults to ./audit-checks.config.yml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Audit only this project (runs it even when disabled in the config)
    #[arg(short, long, value_name = "NAME")]
    pub app: Option<String>,

    /// Scan and write reports, but log notifications instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Scan and write reports without dispatching any notifications
    #[arg(long, conflicts_with = "dry_run")]
    pub report_only: bool,

    /// Print the run summary as JSON to stdout
    #[arg(long)]
    pub json_output: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter when RUST_LOG is not set.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
