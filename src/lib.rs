pub mod api;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod playback;
pub mod progress;
pub mod session;

#[cfg(test)]
mod test_helpers;

use crate::api::{LectureApi, YuketangApi};
use crate::catalog::{CatalogFetcher, DurationProbe, FfprobeProbe, NoProbe};
use crate::config::AppConfig;
use crate::coordinator::{Coordinator, RunReport};
use crate::error::{CatalogError, RunError};
use crate::playback::TokioClock;
use crate::progress::ProgressReporter;
use crate::session::{provider_for, SessionClient, SessionSettings};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lists the classroom's videos and plays them all. Fails only when the
/// catalog cannot be fetched; per-video failures end up in the report.
pub async fn run_classroom(
    api: Arc<dyn LectureApi>,
    probe: Arc<dyn DurationProbe>,
    reporter: Arc<ProgressReporter>,
    config: &AppConfig,
    cancel: CancellationToken,
) -> Result<RunReport, CatalogError> {
    let fetcher = CatalogFetcher::new(api.clone(), probe);
    let tasks = fetcher.list_videos(config.classroom_id).await?;

    let coordinator = Coordinator::new(
        api,
        Arc::new(TokioClock),
        reporter,
        config.playback_policy(),
        cancel,
    );
    Ok(coordinator.run(tasks, config.max_parallel).await)
}

/// Resolves the cookie, connects to the platform and runs the configured classroom.
pub async fn run(
    config: &AppConfig,
    reporter: Arc<ProgressReporter>,
    cancel: CancellationToken,
) -> Result<RunReport, RunError> {
    let provider = provider_for(config);
    info!(source = %provider.describe(), "loading cookie");
    let cookie = provider.get_credential().await?;

    let settings = SessionSettings {
        base_url: config.base_url.clone(),
        user_agent: config.user_agent.clone(),
        request_timeout: config.request_timeout(),
    };
    let session = SessionClient::new(&settings, &cookie)?;
    let api: Arc<dyn LectureApi> = Arc::new(YuketangApi::new(session));

    let probe: Arc<dyn DurationProbe> = if config.probe_duration {
        Arc::new(FfprobeProbe::new())
    } else {
        Arc::new(NoProbe)
    };

    Ok(run_classroom(api, probe, reporter, config, cancel).await?)
}
