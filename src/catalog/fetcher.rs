use super::probe::DurationProbe;
use super::types::*;
use crate::api::{
    CourseChapters, LeafInfo, LectureApi, WatchProgress, WatchProgressQuery, VIDEO_LEAF_TYPE,
};
use crate::error::{ApiError, CatalogError, ClientError};
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CatalogFetcher {
    api: Arc<dyn LectureApi>,
    probe: Arc<dyn DurationProbe>,
}

impl CatalogFetcher {
    pub fn new(api: Arc<dyn LectureApi>, probe: Arc<dyn DurationProbe>) -> Self {
        Self { api, probe }
    }

    /// Enumerates the classroom's videos in course order with their server-side progress.
    pub async fn list_videos(&self, classroom_id: u64) -> Result<Vec<VideoTask>, CatalogError> {
        if classroom_id == 0 {
            return Err(CatalogError::InvalidClassroom {
                classroom_id,
                reason: "classroom id must be positive".to_string(),
            });
        }

        let leaf_ids = self.collect_leaf_ids(classroom_id).await?;
        info!(count = leaf_ids.len(), "total video count");

        let mut tasks = Vec::with_capacity(leaf_ids.len());
        for leaf_id in leaf_ids {
            tasks.push(self.build_task(classroom_id, leaf_id).await?);
        }
        Ok(tasks)
    }

    async fn collect_leaf_ids(&self, classroom_id: u64) -> Result<Vec<u64>, CatalogError> {
        let classroom = self
            .api
            .get_classroom(classroom_id)
            .await
            .map_err(|err| classroom_error(classroom_id, err))?;

        info!(
            course_name = %classroom.course_name,
            name = %classroom.name,
            teacher_name = %classroom.teacher_name,
            "classroom"
        );

        let chapters = self
            .api
            .get_course_chapter(classroom_id, &classroom.course_sign, classroom.uv_id)
            .await?;

        Ok(video_leaf_ids(&chapters))
    }

    async fn build_task(&self, classroom_id: u64, leaf_id: u64) -> Result<VideoTask, CatalogError> {
        let leaf = self.api.get_leaf_info(classroom_id, leaf_id).await?;
        let progress = self
            .api
            .get_watch_progress(WatchProgressQuery {
                user_id: leaf.user_id,
                course_id: leaf.course_id,
                classroom_id,
                video_id: leaf_id,
            })
            .await?;
        let play_url = self
            .api
            .get_play_url(classroom_id, &leaf.content_info.media.ccid)
            .await?;

        let media_url = play_url.first_source().ok_or_else(|| {
            CatalogError::Malformed(format!("no play url source for video {leaf_id}"))
        })?;
        info!(leaf_id, name = %leaf.name, %media_url, "video");

        let context = LeafContext {
            user_id: leaf.user_id,
            course_id: leaf.course_id,
            classroom_id,
            sku_id: leaf.sku_id,
            ccid: leaf.content_info.media.ccid.clone(),
            cdn_domain: cdn_domain(media_url),
        };

        let task = match progress {
            Some(progress) if progress.is_completed() => {
                info!(leaf_id, name = %leaf.name, "already finished");
                let duration = self.known_duration(&leaf, &progress, media_url).await?;
                VideoTask::new(leaf_id, leaf.name.clone(), duration, duration, context)
            }
            Some(progress) => {
                let duration = self.known_duration(&leaf, &progress, media_url).await?;
                info!(leaf_id, last_point = progress.last_point, duration, "resuming");
                VideoTask::new(leaf_id, leaf.name.clone(), duration, progress.last_point, context)
            }
            None => {
                let duration = self.resolve_duration(&leaf, media_url).await?;
                info!(leaf_id, duration, "not started yet");
                VideoTask::new(leaf_id, leaf.name.clone(), duration, 0.0, context)
            }
        };

        Ok(task)
    }

    async fn known_duration(
        &self,
        leaf: &LeafInfo,
        progress: &WatchProgress,
        media_url: &str,
    ) -> Result<f64, CatalogError> {
        if progress.video_length > 0.0 {
            return Ok(progress.video_length);
        }
        self.resolve_duration(leaf, media_url).await
    }

    /// Probed duration first, then the platform's advertised one.
    async fn resolve_duration(&self, leaf: &LeafInfo, media_url: &str) -> Result<f64, CatalogError> {
        match self.probe.probe(media_url).await {
            Ok(duration) => return Ok(duration),
            Err(err) => warn!(leaf_id = leaf.id, error = %err, "duration probe failed, using advertised duration"),
        }

        leaf.content_info
            .media
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| CatalogError::Malformed(format!("no usable duration for video {}", leaf.id)))
    }
}

/// Video leaves in document order, whether nested in a section or sitting in the chapter.
pub fn video_leaf_ids(chapters: &CourseChapters) -> Vec<u64> {
    let mut leaf_ids = Vec::new();

    for chapter in &chapters.course_chapter {
        debug!(id = chapter.id, name = %chapter.name, "chapter");

        for item in &chapter.section_leaf_list {
            match &item.leaf_list {
                Some(leaves) => {
                    debug!(id = item.id, name = %item.name, "section");
                    for leaf in leaves {
                        debug!(id = leaf.id, name = %leaf.name, leaf_type = leaf.leaf_type, "leaf");
                        if leaf.leaf_type == VIDEO_LEAF_TYPE {
                            leaf_ids.push(leaf.id);
                        }
                    }
                }
                None => {
                    debug!(id = item.id, name = %item.name, leaf_type = ?item.leaf_type, "leaf");
                    if item.leaf_type == Some(VIDEO_LEAF_TYPE) {
                        leaf_ids.push(item.id);
                    }
                }
            }
        }
    }

    leaf_ids
}

fn classroom_error(classroom_id: u64, err: ApiError) -> CatalogError {
    match err {
        ApiError::Platform(reason) => CatalogError::InvalidClassroom { classroom_id, reason },
        ApiError::Client(ClientError::Rejected { status, .. }) if status == 404 || status == 400 => {
            CatalogError::InvalidClassroom {
                classroom_id,
                reason: format!("HTTP {status}"),
            }
        }
        other => other.into(),
    }
}

fn cdn_domain(media_url: &str) -> String {
    Url::parse(media_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
