use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Pending,
    Playing,
    Completed,
    Failed,
}

impl PlaybackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackStatus::Completed | PlaybackStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Cookie rejected; refreshing it is the only fix.
    Auth,
    /// Retries for one heartbeat ran out.
    Transport,
    /// The platform refused the report outright.
    Rejected,
    Cancelled,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Auth => "auth",
            FailureKind::Transport => "transport",
            FailureKind::Rejected => "rejected",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RunFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Per-video playback state, owned by exactly one simulator.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub video_id: u64,
    pub cursor: f64,
    pub last_heartbeat_time: Option<Instant>,
    pub status: PlaybackStatus,
    pub heartbeats_sent: u32,
}

impl PlaybackState {
    pub fn new(video_id: u64, initial_progress: f64) -> Self {
        Self {
            video_id,
            cursor: initial_progress,
            last_heartbeat_time: None,
            status: PlaybackStatus::Pending,
            heartbeats_sent: 0,
        }
    }

    pub fn start(&mut self) {
        if self.status == PlaybackStatus::Pending {
            self.status = PlaybackStatus::Playing;
        }
    }

    /// Moves the cursor forward by `elapsed_secs`, never past `total` and never backwards.
    pub fn advance(&mut self, elapsed_secs: f64, total: f64) -> f64 {
        if self.status == PlaybackStatus::Playing && elapsed_secs.is_finite() && elapsed_secs > 0.0 {
            self.cursor = (self.cursor + elapsed_secs).min(total).max(self.cursor);
        }
        self.cursor
    }

    pub fn record_heartbeat(&mut self, at: Instant) {
        self.heartbeats_sent += 1;
        self.last_heartbeat_time = Some(at);
    }

    /// Returns false if the state was already terminal.
    pub fn complete(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PlaybackStatus::Completed;
        true
    }

    /// Returns false if the state was already terminal.
    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PlaybackStatus::Failed;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub video_id: u64,
    pub title: String,
    pub status: PlaybackStatus,
    pub error: Option<RunFailure>,
    pub final_position: f64,
    pub heartbeats_sent: u32,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        self.status == PlaybackStatus::Completed
    }

    /// A video that never got to run.
    pub fn not_started(video_id: u64, title: impl Into<String>, failure: RunFailure) -> Self {
        Self {
            video_id,
            title: title.into(),
            status: PlaybackStatus::Failed,
            error: Some(failure),
            final_position: 0.0,
            heartbeats_sent: 0,
            finished_at: Utc::now(),
        }
    }
}
