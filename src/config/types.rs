use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sentinel `cookie` value asking for the Firefox cookie store instead of a literal string.
pub const FIREFOX_SENTINEL: &str = "FIREFOX";

pub const DEFAULT_BASE_URL: &str = "https://pro.yuketang.cn";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub cookie: String,
    pub user_agent: String,
    pub classroom_id: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: f64,
    #[serde(default = "default_probe_duration")]
    pub probe_duration: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_max_parallel() -> usize {
    3
}

fn default_tick_interval_secs() -> f64 {
    5.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> f64 {
    20.0
}

fn default_probe_duration() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Pacing and retry knobs handed to every playback simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPolicy {
    pub tick_interval: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(default_tick_interval_secs()),
            max_retries: default_max_retries(),
            retry_backoff: Duration::from_millis(default_retry_backoff_ms()),
            max_backoff: Duration::from_millis(default_max_backoff_ms()),
        }
    }
}

impl PlaybackPolicy {
    /// Backoff before retry number `retry` (1-based), doubling up to the cap.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl AppConfig {
    pub fn uses_firefox_cookies(&self) -> bool {
        self.cookie.trim() == FIREFOX_SENTINEL
    }

    pub fn playback_policy(&self) -> PlaybackPolicy {
        PlaybackPolicy {
            tick_interval: Duration::try_from_secs_f64(self.tick_interval_secs)
                .unwrap_or_else(|_| Duration::from_secs_f64(default_tick_interval_secs())),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_request_timeout_secs()))
    }
}
