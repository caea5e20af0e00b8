//! `load_config` module: reads the optional YAML config file and merges it with CLI flags
//! into the core [`FetchConfig`].
//!
//! # Responsibilities
//! - Parse a user-supplied YAML file into loosely-typed optional fields
//! - Parse human-friendly durations (`30s`, `1m`) with `humantime`
//! - Apply precedence: CLI flag, then config file, then built-in default
//! - Fail with a clear message when `user` or `repo` is missing from both
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.
//!
//! Example file:
//!
//! ```yaml
//! user: alice
//! repo: tools
//! dest: ./rpms
//! concurrency: 4
//! timeout: 90s
//! extension: .rpm
//! base_url: https://copr.fedorainfracloud.org
//! ```
use anyhow::{anyhow, Context, Result};
use copr_fetch_core::config::FetchConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cli::Cli;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub user: Option<String>,
    pub repo: Option<String>,
    pub dest: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub timeout: Option<String>,
    pub extension: Option<String>,
    pub base_url: Option<String>,
}

/// Loads a YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    match serde_yaml::from_str::<FileConfig>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Merge CLI flags over the config file (if any) into a [`FetchConfig`].
pub fn resolve_config(cli: &Cli) -> Result<FetchConfig> {
    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let user = cli
        .user
        .clone()
        .or(file.user)
        .ok_or_else(|| anyhow!("missing user: pass --user or set `user` in the config file"))?;
    let repository = cli
        .repo
        .clone()
        .or(file.repo)
        .ok_or_else(|| anyhow!("missing repository: pass --repo or set `repo` in the config file"))?;

    let mut config = FetchConfig::new(user, repository);
    if let Some(base_url) = cli.base_url.clone().or(file.base_url) {
        config.base_url = base_url;
    }
    if let Some(extension) = cli.extension.clone().or(file.extension) {
        config.extension = extension;
    }
    if let Some(concurrency) = cli.concurrency.or(file.concurrency) {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    } else if let Some(timeout) = file.timeout {
        config.timeout = humantime::parse_duration(&timeout)
            .with_context(|| format!("invalid timeout {timeout:?} in config file"))?;
    }
    config.destination = cli
        .dest
        .clone()
        .or(file.dest)
        .filter(|dest| !dest.as_os_str().is_empty());

    config.trace_loaded();
    Ok(config)
}
