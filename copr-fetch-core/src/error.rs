//! Error taxonomy for the fetch pipeline.
//!
//! Discovery errors ([`FetchError`], [`ResolveError`], [`DiscoveryError`]) and
//! setup errors ([`SetupError`]) abort a run. [`DownloadJobError`] is confined
//! to a single artifact and only ever logged and tallied in the report.

use std::io;
use std::path::PathBuf;

/// Retrieving a page failed before it could be queried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {location} failed")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read body of {location}")]
    Body {
        location: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A page was fetched but the expected structure was missing.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

impl ResolveError {
    pub fn last_build_not_found() -> Self {
        ResolveError("last build not found".into())
    }

    pub fn no_results_found() -> Self {
        ResolveError("no results found".into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid location {location:?}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },
}

/// The destination or the HTTP clients could not be prepared.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("could not create destination directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not create temporary destination directory")]
    TempDir(#[source] io::Error),

    #[error("could not build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Failure of one download job. Never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum DownloadJobError {
    #[error("{location} has no file name")]
    EmptyFileName { location: String },

    #[error("could not create {path:?}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request for {location} failed")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that aborts [`crate::pipeline::run`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("download setup failed: {0}")]
    Setup(#[from] SetupError),
}
