//! Jira Issue Link Graph
//!
//! Renders the issues matched by a JQL filter, plus every issue reachable
//! from them through issue links, as a self-contained interactive page.
//!
//! # Features
//!
//! - Transitive link closure with batched `id in (...)` queries
//! - Status exclusion applied to seed and linked issues alike
//! - Project icons embedded as data URIs, downloaded concurrently
//! - HTML, JSON, DOT and Mermaid output

use anyhow::{Context, Result};
use clap::Parser;
use jira_graph::cli::Cli;
use jira_graph::config::{self, ReportSettings};
use jira_graph::errors::{remediation_for, ConfigError, TrackerError};
use jira_graph::output::{self, ExitCode};
use jira_graph::report::ReportGenerator;
use jira_graph::tracker::JiraClient;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Map an error chain to an exit code by the typed errors it carries.
fn error_to_exit_code(error: &anyhow::Error) -> ExitCode {
    for cause in error.chain() {
        if let Some(tracker_error) = cause.downcast_ref::<TrackerError>() {
            return match tracker_error {
                e if e.is_permission_denied() => ExitCode::PermissionDenied,
                TrackerError::MalformedResponse { .. } => ExitCode::MalformedResponse,
                _ => ExitCode::ExternalError,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCode::InvalidArgument;
        }
        // Filesystem failures while writing the report
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCode::ExternalError;
        }
    }
    ExitCode::GenericError
}

/// Error text for stderr, with remediation when the user can act on it.
fn error_message(error: &anyhow::Error) -> String {
    let message = format!("{:#}", error);
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<TrackerError>())
        .and_then(|tracker_error| remediation_for(tracker_error, message.clone()))
        .map(|actionable| actionable.to_error_message())
        .unwrap_or(message)
}

fn main() {
    let exit_code = match run() {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("Error: {}", error_message(&e));
            error_to_exit_code(&e)
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,jira_graph={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let defaults = config::load_defaults(&cli)?;
    let settings = ReportSettings::resolve(&cli, &defaults)?;

    let client = JiraClient::new(&settings.base_url, settings.credentials(), settings.timeout);
    info!(base_url = client.base_url(), jql = %settings.jql, "generating report");

    let generator = ReportGenerator::new(&client, &settings);
    let report = generator.generate()?;
    let rendered = generator.render(&report)?;

    let target = if settings.writes_to_stdout() {
        output::write_stdout(&rendered)?
    } else {
        output::write_file(Path::new(&settings.output), &rendered)
            .context("Failed to write report")?
    };

    info!(
        output = %target,
        format = %settings.format,
        nodes = report.elements.nodes.len(),
        edges = report.elements.edges.len(),
        unresolved = report.unresolved.len(),
        passes = report.passes,
        "report written"
    );
    Ok(())
}
