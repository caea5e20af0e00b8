//! Bounded concurrent retrieval of discovered artifacts.
//!
//! A single producer pushes every [`ArtifactReference`] onto an unbounded
//! multi-consumer queue and closes it. A fixed number of workers, each owning
//! its own HTTP client, drain the queue one job at a time. A failed job is
//! logged, reported and abandoned; it never stops the pool or fails the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::contract::ArtifactReference;
use crate::error::{DownloadJobError, SetupError};

/// Workers used when the caller does not choose.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Per-request timeout used when the caller does not choose.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix of the temporary destination created when none is given.
pub const TEMP_DIR_PREFIX: &str = "copr";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Number of workers. `0` starts one worker per artifact.
    pub concurrency: usize,
    /// Applied to every request, including streaming of the body.
    pub timeout: Duration,
    /// Created if missing. A fresh temporary directory is used when `None`.
    pub destination: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            destination: None,
        }
    }
}

/// Progress of individual jobs, for an optional external renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started {
        file_name: String,
        total_bytes: Option<u64>,
    },
    Progress {
        file_name: String,
        downloaded: u64,
    },
    Finished {
        file_name: String,
        bytes: u64,
    },
    /// `file_name` is absent when the location has no usable final segment.
    Failed {
        location: String,
        file_name: Option<String>,
        error: String,
    },
}

pub type EventSender = mpsc::UnboundedSender<DownloadEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDownload {
    pub location: String,
    pub error: String,
}

/// Outcome of [`download_all`]. Jobs appear in completion order per worker.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub destination: PathBuf,
    pub total: usize,
    pub downloaded: Vec<DownloadedFile>,
    pub failed: Vec<FailedDownload>,
}

impl DownloadReport {
    fn empty(destination: PathBuf, total: usize) -> Self {
        Self {
            destination,
            total,
            downloaded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.downloaded.len() == self.total
    }
}

/// Create `destination` (and its parents), or a kept temporary directory if `None`.
pub fn prepare_destination(destination: Option<&Path>) -> Result<PathBuf, SetupError> {
    match destination {
        Some(path) => {
            let mut builder = std::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder
                .create(path)
                .map_err(|source| SetupError::CreateDir {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), "Prepared destination directory");
            Ok(path.to_path_buf())
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix(TEMP_DIR_PREFIX)
                .tempdir()
                .map_err(SetupError::TempDir)?
                .keep();
            debug!(path = %dir.display(), "Created temporary destination directory");
            Ok(dir)
        }
    }
}

fn worker_count(concurrency: usize, jobs: usize) -> usize {
    if concurrency == 0 {
        jobs
    } else {
        concurrency.min(jobs)
    }
}

fn build_client(timeout: Duration) -> Result<Client, SetupError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SetupError::Client)
}

fn emit(events: &Option<EventSender>, event: DownloadEvent) {
    if let Some(tx) = events {
        // A gone renderer must not affect downloads.
        let _ = tx.send(event);
    }
}

/// Download every artifact into the destination with a bounded worker pool.
///
/// Only setup failures are returned as errors; per-artifact failures are
/// collected in [`DownloadReport::failed`].
pub async fn download_all(
    artifacts: Vec<ArtifactReference>,
    options: &DownloadOptions,
    events: Option<EventSender>,
) -> Result<DownloadReport, SetupError> {
    let destination = prepare_destination(options.destination.as_deref())?;
    let total = artifacts.len();
    let workers = worker_count(options.concurrency, total);

    let clients = (0..workers)
        .map(|_| build_client(options.timeout))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        destination = %destination.display(),
        artifacts = total,
        workers,
        timeout = ?options.timeout,
        "Starting downloads"
    );

    let (queue, jobs) = async_channel::unbounded::<ArtifactReference>();
    for artifact in artifacts {
        if let Err(e) = queue.try_send(artifact) {
            warn!(location = %e.into_inner(), "Download queue closed, dropping job");
        }
    }
    queue.close();

    let shared_destination: Arc<Path> = Arc::from(destination.as_path());
    let handles: Vec<_> = clients
        .into_iter()
        .enumerate()
        .map(|(id, client)| {
            let worker = Worker {
                id,
                client,
                jobs: jobs.clone(),
                destination: shared_destination.clone(),
                events: events.clone(),
            };
            tokio::spawn(worker.run())
        })
        .collect();
    drop(jobs);

    let mut report = DownloadReport::empty(destination, total);
    for joined in join_all(handles).await {
        match joined {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome {
                        Ok(file) => report.downloaded.push(file),
                        Err(failed) => report.failed.push(failed),
                    }
                }
            }
            Err(e) => error!(error = %e, "Download worker aborted"),
        }
    }

    info!(
        destination = %report.destination.display(),
        total = report.total,
        downloaded = report.downloaded.len(),
        failed = report.failed.len(),
        "Downloads finished"
    );
    Ok(report)
}

type JobOutcome = Result<DownloadedFile, FailedDownload>;

struct Worker {
    id: usize,
    client: Client,
    jobs: async_channel::Receiver<ArtifactReference>,
    destination: Arc<Path>,
    events: Option<EventSender>,
}

impl Worker {
    async fn run(self) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(artifact) = self.jobs.recv().await {
            debug!(worker = self.id, location = %artifact, "Picked up job");
            let outcome = match self.download(&artifact).await {
                Ok(file) => {
                    info!(
                        worker = self.id,
                        file = %file.path.display(),
                        bytes = file.bytes,
                        "Downloaded artifact"
                    );
                    emit(
                        &self.events,
                        DownloadEvent::Finished {
                            file_name: file.file_name.clone(),
                            bytes: file.bytes,
                        },
                    );
                    Ok(file)
                }
                Err(e) => {
                    error!(
                        worker = self.id,
                        location = %artifact,
                        error = %e,
                        cause = ?std::error::Error::source(&e),
                        "Download failed, abandoning job"
                    );
                    let error = match std::error::Error::source(&e) {
                        Some(cause) => format!("{e}: {cause}"),
                        None => e.to_string(),
                    };
                    let failed = FailedDownload {
                        location: artifact.to_string(),
                        error,
                    };
                    emit(
                        &self.events,
                        DownloadEvent::Failed {
                            location: failed.location.clone(),
                            file_name: artifact.file_name().map(str::to_owned),
                            error: failed.error.clone(),
                        },
                    );
                    Err(failed)
                }
            };
            outcomes.push(outcome);
        }
        debug!(worker = self.id, jobs = outcomes.len(), "Queue drained, worker exiting");
        outcomes
    }

    async fn download(&self, artifact: &ArtifactReference) -> Result<DownloadedFile, DownloadJobError> {
        let file_name = artifact
            .file_name()
            .ok_or_else(|| DownloadJobError::EmptyFileName {
                location: artifact.to_string(),
            })?
            .to_owned();
        let path = self.destination.join(&file_name);

        let mut file = File::create(&path)
            .await
            .map_err(|source| DownloadJobError::CreateFile {
                path: path.clone(),
                source,
            })?;

        match self.stream_into(artifact, &file_name, &path, &mut file).await {
            Ok(bytes) => Ok(DownloadedFile {
                file_name,
                path,
                bytes,
            }),
            Err(e) => {
                drop(file);
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    debug!(file = %path.display(), error = %remove, "Could not remove partial file");
                }
                Err(e)
            }
        }
    }

    async fn stream_into(
        &self,
        artifact: &ArtifactReference,
        file_name: &str,
        path: &Path,
        file: &mut File,
    ) -> Result<u64, DownloadJobError> {
        let request_error = |source: reqwest::Error| DownloadJobError::Request {
            location: artifact.to_string(),
            source,
        };
        let write_error = |source: std::io::Error| DownloadJobError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut response = self
            .client
            .get(artifact.url().clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(request_error)?;

        emit(
            &self.events,
            DownloadEvent::Started {
                file_name: file_name.to_owned(),
                total_bytes: response.content_length(),
            },
        );

        let mut downloaded: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            file.write_all(&chunk).await.map_err(write_error)?;
            downloaded += chunk.len() as u64;
            emit(
                &self.events,
                DownloadEvent::Progress {
                    file_name: file_name.to_owned(),
                    downloaded,
                },
            );
        }
        file.flush().await.map_err(write_error)?;

        Ok(downloaded)
    }
}
