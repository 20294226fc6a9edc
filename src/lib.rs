//! audit-checks - scheduled dependency audits across many projects
//!
//! This library runs package-manager audits (`npm audit`, `composer audit`)
//! for a fleet of projects, merges each project's findings into one report,
//! and alerts once per project through e-mail and per-project Telegram forum
//! topics. It follows hexagonal architecture and Domain-Driven Design
//! principles.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`auditing`): Severity model, reports, policies and pure services
//! - **Application Layer** (`application`): The audit use case and its orchestration services
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Concrete implementations of ports
//! - **Shared** (`shared`): Common utilities and error types
//! - **Config** (`config`): YAML configuration and resolved settings
//!
//! # Example
//!
//! ```no_run
//! use audit_checks::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let registry = ScannerRegistry::new()
//!     .with_scanner(Arc::new(NpmScanner::new()))
//!     .with_scanner(Arc::new(ComposerScanner::new()));
//! let job_runner = ScanJobRunner::new(RetryPolicy::default(), Severity::Moderate);
//! let store = FileProjectStore::open("./storage", vec![Project::new("shop", "/srv/shop")])?;
//!
//! let use_case = RunAuditUseCase::new(
//!     registry,
//!     job_runner,
//!     Dispatcher::new(),
//!     store,
//!     StderrProgressReporter::new(),
//! );
//!
//! let outcome = use_case
//!     .execute(&RunRequest::new(3), &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod auditing;
pub mod config;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::channels::{ResendEmailChannel, TelegramChannel};
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::filesystem::{FileProjectStore, ReportDirectoryWriter};
    pub use crate::adapters::outbound::formatters::{JsonReportFormatter, MarkdownReportFormatter};
    pub use crate::adapters::outbound::scanners::{ComposerScanner, NpmScanner};
    pub use crate::application::dto::{ReportFormat, RunRequest};
    pub use crate::application::factories::FormatterFactory;
    pub use crate::application::services::{
        Delivery, DispatchOutcome, Dispatcher, JobFailure, RetryPolicy, ScanJobRunner,
        ScannerRegistry, TopicDirectory,
    };
    pub use crate::application::use_cases::{ReportArtifacts, RunAuditUseCase};
    pub use crate::auditing::domain::{
        ChannelKind, CombinedReport, ErrorOrigin, NotificationTargets, Project, RunError,
        RunOutcome, RunSummary, ScanResult, ScannerKind, ScannerSelector, Severity,
        SeverityCounts, ThreadId, Vulnerability,
    };
    pub use crate::auditing::policies::SeverityPolicy;
    pub use crate::auditing::services::{
        AlertMessageBuilder, NotificationMessage, ReportAggregator, VulnerabilityFilter,
    };
    pub use crate::ports::outbound::{
        PlainChannel, ProgressReporter, ProjectRepository, ReportFormatter, ReportSink, Scanner,
        ThreadedChannel,
    };
    pub use crate::shared::error::{AuditError, ExitCode, ThreadCreationFailure};
    pub use crate::shared::shutdown::ShutdownStack;
    pub use crate::shared::Result;
    pub use tokio_util::sync::CancellationToken;
}
