use super::types::RunReport;
use crate::api::LectureApi;
use crate::catalog::VideoTask;
use crate::config::PlaybackPolicy;
use crate::playback::{Clock, FailureKind, PlaybackSimulator, PlaybackStatus, RunFailure, RunResult};
use crate::progress::ProgressReporter;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Runs one simulator per video with at most `max_parallel` alive at once.
pub struct Coordinator {
    api: Arc<dyn LectureApi>,
    clock: Arc<dyn Clock>,
    reporter: Arc<ProgressReporter>,
    policy: PlaybackPolicy,
    cancel: CancellationToken,
}

enum Scheduled {
    Spawned {
        video_id: u64,
        title: String,
        start_position: f64,
        handle: JoinHandle<RunResult>,
    },
    Skipped(RunResult),
}

/// Keeps the running-simulator count honest even when a simulator panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(active.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Coordinator {
    pub fn new(
        api: Arc<dyn LectureApi>,
        clock: Arc<dyn Clock>,
        reporter: Arc<ProgressReporter>,
        policy: PlaybackPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            clock,
            reporter,
            policy,
            cancel,
        }
    }

    pub async fn run(&self, tasks: Vec<VideoTask>, max_parallel: usize) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let max_parallel = max_parallel.clamp(1, Semaphore::MAX_PERMITS);
        info!(%run_id, videos = tasks.len(), max_parallel, "starting run");

        for task in &tasks {
            self.reporter
                .register(task.id, &task.title, task.initial_progress, task.total_duration);
        }

        let semaphore = Arc::new(Semaphore::new(max_parallel));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut scheduled = Vec::with_capacity(tasks.len());

        // Permits are taken in catalog order, so earlier videos start first.
        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                scheduled.push(Scheduled::Skipped(RunResult::not_started(
                    task.id,
                    task.title,
                    RunFailure::new(FailureKind::Cancelled, "run cancelled before this video started"),
                )));
                continue;
            };

            let video_id = task.id;
            let title = task.title.clone();
            let start_position = task.initial_progress;
            let simulator = PlaybackSimulator::new(
                task,
                self.api.clone(),
                self.clock.clone(),
                self.reporter.clone(),
                self.policy.clone(),
                self.cancel.clone(),
            );
            let active = active.clone();
            let peak = peak.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let _guard = ActiveGuard::enter(&active, &peak);
                simulator.run().await
            });
            scheduled.push(Scheduled::Spawned {
                video_id,
                title,
                start_position,
                handle,
            });
        }

        let reporter = &self.reporter;
        let results = join_all(scheduled.into_iter().map(|entry| async move {
            match entry {
                Scheduled::Skipped(result) => result,
                Scheduled::Spawned {
                    video_id,
                    title,
                    start_position,
                    handle,
                } => match handle.await {
                    Ok(result) => result,
                    Err(err) => {
                        error!(video_id, error = %err, "simulator task died");
                        reporter.finish(video_id, PlaybackStatus::Failed);
                        let mut result = RunResult::not_started(
                            video_id,
                            title,
                            RunFailure::new(FailureKind::Internal, err.to_string()),
                        );
                        result.final_position =
                            reporter.last_position(video_id).unwrap_or(start_position);
                        result
                    }
                },
            }
        }))
        .await;

        let report = RunReport {
            run_id,
            results,
            peak_parallel: peak.load(Ordering::SeqCst),
        };
        info!(
            run_id = %report.run_id,
            completed = report.completed_count(),
            total = report.results.len(),
            "run finished"
        );
        report
    }
}
