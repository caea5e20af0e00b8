//! This module implements the CLI interface for copr-fetch: flag parsing, config
//! resolution, and the user-visible run summary.
//!
//! All discovery and download logic lives in the [`copr-fetch-core`] crate.
//! This module is strictly CLI glue.
//!
//! ## How To Use
//! - For command-line users: run the installed `copr-fetch` binary with `--help`.
//! - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
//!
//! ## Exit status
//! Discovery and setup failures are returned as errors (non-zero exit from
//! `main`). Failed individual downloads are reported but still exit 0.
//!
//! [`copr-fetch-core`]: ../../copr-fetch-core/
use crate::load_config::resolve_config;
use crate::progress::ProgressRenderer;
use anyhow::Result;
use clap::Parser;
use copr_fetch_core::download::DownloadReport;
use copr_fetch_core::fetch::HttpPageFetcher;
use copr_fetch_core::pipeline;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// CLI for copr-fetch: download the packages of the most recent COPR build.
#[derive(Parser, Debug)]
#[clap(
    name = "copr-fetch",
    version,
    about = "Download the package files produced by the most recent build of a COPR repository"
)]
pub struct Cli {
    /// COPR user or group owning the repository
    #[clap(long)]
    pub user: Option<String>,

    /// COPR repository name
    #[clap(long)]
    pub repo: Option<String>,

    /// Destination directory (a temporary directory when omitted or empty)
    #[clap(long)]
    pub dest: Option<PathBuf>,

    /// Number of concurrent downloads; 0 starts one per file [default: 6]
    #[clap(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. `30s` or `2m` [default: 1m]
    #[clap(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// File-name suffix of the artifacts to download [default: .rpm]
    #[clap(long)]
    pub extension: Option<String>,

    /// Base URL of the COPR frontend
    #[clap(long)]
    pub base_url: Option<String>,

    /// Render a progress bar per file on stderr
    #[clap(long)]
    pub progress: bool,

    /// Print the run report as JSON on stdout instead of the text summary
    #[clap(long)]
    pub json: bool,

    /// Path to a YAML config file; flags take precedence over its values
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<DownloadReport> {
    tracing::info!("trace_initialised");

    let config = resolve_config(&cli)?;
    let fetcher = HttpPageFetcher::with_timeout(config.timeout)?;

    let (events, renderer) = if cli.progress {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(ProgressRenderer::stderr().drain(rx));
        (Some(tx), Some(handle))
    } else {
        (None, None)
    };

    let result = pipeline::run(&fetcher, &config, events).await;

    if let Some(handle) = renderer {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Progress renderer stopped unexpectedly");
        }
    }

    match result {
        Ok(report) => {
            print_summary(&report, cli.json)?;
            tracing::info!(
                command = "fetch",
                downloaded = report.downloaded.len(),
                failed = report.failed.len(),
                "Fetch complete"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "fetch", error = %e, "Fetch failed");
            Err(anyhow::Error::new(e))
        }
    }
}

fn print_summary(report: &DownloadReport, json: bool) -> Result<()> {
    for failed in &report.failed {
        eprintln!("[ERROR] {}: {}", failed.location, failed.error);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "downloaded {} of {} files to {}",
        report.downloaded.len(),
        report.total,
        report.destination.display()
    );
    if !report.failed.is_empty() {
        println!("{} downloads failed", report.failed.len());
    }
    Ok(())
}
