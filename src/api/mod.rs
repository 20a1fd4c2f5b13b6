pub mod client;
pub mod types;

pub use client::YuketangApi;
pub use types::*;

use crate::error::ApiError;
use async_trait::async_trait;

/// Typed view of the platform endpoints the catalog and the simulators need.
#[async_trait]
pub trait LectureApi: Send + Sync {
    async fn get_classroom(&self, classroom_id: u64) -> Result<ClassroomInfo, ApiError>;

    async fn get_course_chapter(
        &self,
        classroom_id: u64,
        sign: &str,
        uv_id: u64,
    ) -> Result<CourseChapters, ApiError>;

    async fn get_leaf_info(&self, classroom_id: u64, leaf_id: u64) -> Result<LeafInfo, ApiError>;

    /// `None` when the platform has no record for this video yet.
    async fn get_watch_progress(
        &self,
        query: WatchProgressQuery,
    ) -> Result<Option<WatchProgress>, ApiError>;

    async fn get_play_url(&self, classroom_id: u64, ccid: &str) -> Result<PlayUrl, ApiError>;

    async fn send_heartbeat(
        &self,
        classroom_id: u64,
        events: &[HeartbeatEvent],
    ) -> Result<(), ApiError>;
}
