mod cli;

use anyhow::anyhow;
use audit_checks::adapters::outbound::channels::{ResendEmailChannel, TelegramChannel};
use audit_checks::adapters::outbound::console::StderrProgressReporter;
use audit_checks::adapters::outbound::filesystem::{FileProjectStore, ReportDirectoryWriter};
use audit_checks::adapters::outbound::scanners::{ComposerScanner, NpmScanner};
use audit_checks::application::dto::RunRequest;
use audit_checks::application::factories::FormatterFactory;
use audit_checks::application::services::{Dispatcher, ScanJobRunner, ScannerRegistry, TopicDirectory};
use audit_checks::application::use_cases::{ReportArtifacts, RunAuditUseCase};
use audit_checks::auditing::domain::{RunSummary, Severity};
use audit_checks::config::{discover_config, load_config_from_path, Settings, CONFIG_FILENAME};
use audit_checks::shared::error::ExitCode;
use audit_checks::shared::shutdown::ShutdownStack;
use audit_checks::shared::Result;
use cli::Args;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse_args();
    init_tracing(args.log_level());

    let code = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => match runtime.block_on(run(args)) {
            Ok(code) => code,
            Err(e) => {
                report_error(&e);
                ExitCode::RunError
            }
        },
        Err(e) => {
            report_error(&anyhow!("Failed to start async runtime: {}", e));
            ExitCode::RunError
        }
    };

    process::exit(code.as_i32());
}

/// Logs go to stderr; RUST_LOG wins over the CLI level.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(e: &anyhow::Error) {
    eprintln!("\n❌ An error occurred:\n");
    eprintln!("{}", e);

    // Display error chain
    for cause in e.chain().skip(1) {
        eprintln!("\nCaused by: {}", cause);
    }
    eprintln!();
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            discover_config(&cwd)?.ok_or_else(|| {
                anyhow!(
                    "No config file found: {} in {}\n\n💡 Hint: Create one or pass --config PATH.",
                    CONFIG_FILENAME,
                    cwd.display()
                )
            })?
        }
    };
    let settings = Settings::resolve(config)?;
    info!(
        projects = settings.projects.len(),
        threshold = %settings.severity_threshold,
        telegram = settings.telegram.is_some(),
        email = settings.email.is_some(),
        "configuration loaded"
    );

    let cancel = CancellationToken::new();
    let mut shutdown = ShutdownStack::new();
    let signal_task = tokio::spawn(cancel_on_signal(cancel.clone()));
    shutdown.push("signal listener", move || signal_task.abort());
    let run_token = cancel.clone();
    shutdown.push("run token", move || run_token.cancel());

    let registry = ScannerRegistry::new()
        .with_scanner(Arc::new(NpmScanner::new()))
        .with_scanner(Arc::new(ComposerScanner::new()));
    let job_runner = ScanJobRunner::new(settings.retry_policy(), settings.severity_threshold);
    let dispatcher = build_dispatcher(&settings)?;
    let store = FileProjectStore::open(&settings.state_dir, settings.projects.clone())?;
    let artifacts = ReportArtifacts::new(
        Box::new(ReportDirectoryWriter::new(&settings.report_output_dir)),
        FormatterFactory::create_all(&settings.report_formats),
    );

    let use_case = RunAuditUseCase::new(
        registry,
        job_runner,
        dispatcher,
        store,
        StderrProgressReporter::new(),
    )
    .with_artifacts(artifacts);

    let request = RunRequest::new(settings.max_concurrent)
        .with_target(args.app.clone())
        .with_dry_run(args.dry_run)
        .with_report_only(args.report_only);

    let outcome = use_case.execute(&request, &cancel).await;
    shutdown.release();
    let outcome = outcome?;

    let summary = outcome.summary();
    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(outcome.exit_code())
}

fn build_dispatcher(settings: &Settings) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();

    if let Some(email) = &settings.email {
        let mut channel = ResendEmailChannel::new(&email.api_key, &email.from)?;
        if let Some(url) = &email.api_url {
            channel = channel.with_api_url(url);
        }
        dispatcher = dispatcher.with_plain_channel(Arc::new(channel));
    }

    if let Some(telegram) = &settings.telegram {
        let mut channel = TelegramChannel::new(&telegram.bot_token, telegram.group_id)?;
        if let Some(base) = &telegram.api_base {
            channel = channel.with_api_base(base);
        }
        dispatcher = dispatcher.with_threaded_channel(TopicDirectory::new(Arc::new(channel)));
    }

    if dispatcher.channel_count() == 0 {
        info!("no notification channels configured");
    }
    Ok(dispatcher)
}

/// Cancels `token` on Ctrl-C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    warn!("shutdown signal received, finishing with partial results");
    token.cancel();
}

fn print_summary(summary: &RunSummary) {
    let color = std::io::stdout().is_terminal();
    let paint = |text: String, severity: Severity| -> String {
        if !color {
            return text;
        }
        match severity {
            Severity::Critical => text.red().bold().to_string(),
            Severity::High => text.red().to_string(),
            Severity::Moderate => text.yellow().to_string(),
            Severity::Low | Severity::Info => text.green().to_string(),
        }
    };

    println!();
    println!(
        "📊 Audited {} project(s), {} with vulnerabilities",
        summary.total_projects, summary.projects_with_vulnerabilities
    );
    for severity in Severity::DESCENDING {
        let count = summary.counts.get(severity);
        if count > 0 {
            println!(
                "   {} {}",
                severity.emoji(),
                paint(format!("{}: {}", severity, count), severity)
            );
        }
    }
    for project in &summary.projects {
        let total = project.counts.total();
        let line = format!(
            "   • {} [{}]: {} vulnerabilities",
            project.name,
            project.scanners.join(", "),
            total
        );
        match project.counts.highest() {
            Some(highest) => println!("{}", paint(line, highest)),
            None => println!("{}", line),
        }
    }
    if !summary.errors.is_empty() {
        println!("\n⚠️  {} error(s):", summary.errors.len());
        for error in &summary.errors {
            println!("   - {}", error.lines().next().unwrap_or_default());
        }
    }
    if summary.cancelled {
        println!("\n⏹  Run was cancelled; results are partial.");
    }

    let exit = match summary.exit_code {
        0 => ExitCode::Success,
        1 => ExitCode::VulnerabilitiesDetected,
        _ => ExitCode::RunError,
    };
    println!("\nExit: {}", exit);
}
