use async_trait::async_trait;
use tokio::time::Instant;

/// Time source for playback pacing. The tokio-backed clock honours a paused
/// test runtime, so simulated minutes pass without real waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Wall-clock time in milliseconds, stamped into heartbeats.
    fn wall_millis(&self) -> i64;

    async fn sleep_until(&self, deadline: Instant);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}
