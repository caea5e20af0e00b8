use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::download::{DownloadOptions, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use crate::layout::{DEFAULT_BASE_URL, DEFAULT_EXTENSION};

/// Everything one run of the pipeline needs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub user: String,
    pub repository: String,
    /// Suffix an artifact's file name must end with.
    pub extension: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub destination: Option<PathBuf>,
}

impl FetchConfig {
    pub fn new(user: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user: user.into(),
            repository: repository.into(),
            extension: DEFAULT_EXTENSION.to_owned(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            destination: None,
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            concurrency: self.concurrency,
            timeout: self.timeout,
            destination: self.destination.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            user = %self.user,
            repository = %self.repository,
            concurrency = self.concurrency,
            "Loaded FetchConfig"
        );
        debug!(?self, "FetchConfig loaded (full debug)");
    }
}
