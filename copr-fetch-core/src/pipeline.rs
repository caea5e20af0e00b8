//! End-to-end run: discovery stages in sequence, then the download pool.
//!
//! Each stage consumes the complete output of the previous one. Discovery and
//! setup errors abort the run; download failures end up in the report.

use tracing::info;

use crate::config::FetchConfig;
use crate::contract::PageFetcher;
use crate::discovery::{list_artifacts, resolve_last_build, resolve_result_indexes};
use crate::download::{download_all, DownloadReport, EventSender};
use crate::error::PipelineError;

pub async fn run<F>(
    fetcher: &F,
    config: &FetchConfig,
    events: Option<EventSender>,
) -> Result<DownloadReport, PipelineError>
where
    F: PageFetcher + ?Sized,
{
    info!(user = %config.user, repository = %config.repository, "[FETCH] Starting discovery");

    let build = resolve_last_build(fetcher, &config.base_url, &config.user, &config.repository)
        .await?;
    let indexes = resolve_result_indexes(fetcher, &build).await?;
    let artifacts = list_artifacts(fetcher, &indexes, &config.extension).await?;

    info!(
        build = %build,
        indexes = indexes.len(),
        artifacts = artifacts.len(),
        "[FETCH] Discovery complete, starting downloads"
    );

    let report = download_all(artifacts, &config.download_options(), events).await?;
    Ok(report)
}
