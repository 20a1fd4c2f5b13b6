use super::clock::Clock;
use super::heartbeat::{HeartbeatBuilder, HeartbeatRequest};
use super::types::*;
use crate::api::{LectureApi, WatchProgressQuery};
use crate::catalog::VideoTask;
use crate::config::PlaybackPolicy;
use crate::error::{ApiError, ClientError};
use crate::progress::ProgressReporter;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Plays one video by sending paced heartbeats until it is complete or fails.
pub struct PlaybackSimulator {
    task: VideoTask,
    api: Arc<dyn LectureApi>,
    clock: Arc<dyn Clock>,
    reporter: Arc<ProgressReporter>,
    policy: PlaybackPolicy,
    cancel: CancellationToken,
}

impl PlaybackSimulator {
    pub fn new(
        task: VideoTask,
        api: Arc<dyn LectureApi>,
        clock: Arc<dyn Clock>,
        reporter: Arc<ProgressReporter>,
        policy: PlaybackPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            api,
            clock,
            reporter,
            policy,
            cancel,
        }
    }

    pub async fn run(self) -> RunResult {
        let mut state = PlaybackState::new(self.task.id, self.task.initial_progress);
        let total = self.task.total_duration;

        if self.task.is_already_watched() {
            state.complete();
            info!(video_id = self.task.id, "already watched, nothing to send");
            self.reporter.observe(self.task.id, state.cursor, total);
            return self.finish(state, None);
        }

        state.start();
        info!(video_id = self.task.id, title = %self.task.title, from = state.cursor, total, "starting playback");

        let failure = self.play(&mut state).await;
        if failure.is_none() {
            self.confirm_with_platform().await;
        }
        self.finish(state, failure)
    }

    /// Tick loop; returns the failure that ended playback, if any.
    async fn play(&self, state: &mut PlaybackState) -> Option<RunFailure> {
        let total = self.task.total_duration;
        let tick = self.policy.tick_interval;
        let mut builder = HeartbeatBuilder::new(&self.task, tick);
        let mut last_tick = self.clock.now();

        loop {
            let deadline = last_tick + tick;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    state.fail();
                    return Some(RunFailure::new(FailureKind::Cancelled, "run cancelled"));
                }
                _ = self.clock.sleep_until(deadline) => {}
            }

            let now = self.clock.now();
            let elapsed = now.saturating_duration_since(last_tick);
            last_tick = now;

            let cursor = state.advance(elapsed.as_secs_f64(), total);
            self.reporter.observe(self.task.id, cursor, total);

            let request = builder.next(cursor, self.clock.wall_millis());
            if let Err(failure) = self.deliver(&builder, &request).await {
                state.fail();
                return Some(failure);
            }
            state.record_heartbeat(now);

            if cursor >= total {
                state.complete();
                return None;
            }
        }
    }

    /// Sends one heartbeat, retrying transient failures with backoff. The
    /// report is resent unchanged, so a retry never moves the cursor.
    async fn deliver(
        &self,
        builder: &HeartbeatBuilder,
        request: &HeartbeatRequest,
    ) -> Result<(), RunFailure> {
        let events = [builder.to_event(request)];
        let classroom_id = self.task.context.classroom_id;
        let mut retries = 0;

        loop {
            let err = match self.api.send_heartbeat(classroom_id, &events).await {
                Ok(()) => {
                    debug!(video_id = request.video_id, sequence = request.sequence, position = request.reported_position, "heartbeat accepted");
                    return Ok(());
                }
                Err(err) => err,
            };

            match err {
                ApiError::Client(ClientError::Auth { status }) => {
                    warn!(video_id = request.video_id, status, "heartbeat rejected: cookie expired or invalid");
                    return Err(RunFailure::new(
                        FailureKind::Auth,
                        format!("authentication rejected (HTTP {status}); refresh the cookie"),
                    ));
                }
                ApiError::Client(ref client_err) if client_err.is_retryable() => {
                    if retries >= self.policy.max_retries {
                        return Err(RunFailure::new(
                            FailureKind::Transport,
                            format!("gave up after {} retries: {client_err}", retries),
                        ));
                    }
                    retries += 1;
                    let backoff = self.policy.backoff_for(retries);
                    warn!(
                        video_id = request.video_id,
                        sequence = request.sequence,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %client_err,
                        "heartbeat failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return Err(RunFailure::new(FailureKind::Cancelled, "run cancelled during retry backoff"));
                        }
                        _ = self.clock.sleep_until(self.clock.now() + backoff) => {}
                    }
                }
                other => {
                    return Err(RunFailure::new(FailureKind::Rejected, other.to_string()));
                }
            }
        }
    }

    /// Logs what the platform recorded after the final heartbeat. Best effort.
    async fn confirm_with_platform(&self) {
        let query = WatchProgressQuery {
            user_id: self.task.context.user_id,
            course_id: self.task.context.course_id,
            classroom_id: self.task.context.classroom_id,
            video_id: self.task.id,
        };

        match self.api.get_watch_progress(query).await {
            Ok(Some(progress)) => info!(
                video_id = self.task.id,
                watch_length = progress.watch_length,
                rate = progress.rate,
                completed = progress.is_completed(),
                "platform progress"
            ),
            Ok(None) => debug!(video_id = self.task.id, "platform has no progress record yet"),
            Err(err) => debug!(video_id = self.task.id, error = %err, "could not read platform progress"),
        }
    }

    fn finish(&self, state: PlaybackState, error: Option<RunFailure>) -> RunResult {
        let result = RunResult {
            video_id: self.task.id,
            title: self.task.title.clone(),
            status: state.status,
            error,
            final_position: state.cursor,
            heartbeats_sent: state.heartbeats_sent,
            finished_at: Utc::now(),
        };
        self.reporter.finish(result.video_id, result.status);

        match &result.error {
            None => info!(video_id = result.video_id, heartbeats = result.heartbeats_sent, "finished sending heartbeats"),
            Some(failure) => warn!(video_id = result.video_id, %failure, "playback failed"),
        }
        result
    }
}
