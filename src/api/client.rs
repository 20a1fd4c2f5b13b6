use super::types::*;
use super::LectureApi;
use crate::error::ApiError;
use crate::session::{ApiRequest, SessionClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Host passed back to the play URL endpoint; the platform expects its own domain here.
const PLAYER_DOMAIN: &str = "pro.yuketang.cn";

pub struct YuketangApi {
    session: SessionClient,
}

impl YuketangApi {
    pub fn new(session: SessionClient) -> Self {
        Self { session }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.session.send_json(request).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

fn unwrap_success<T>(envelope: SuccessEnvelope<T>) -> Result<T, ApiError> {
    if !envelope.success {
        return Err(ApiError::Platform(
            envelope.msg.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Malformed("missing `data` field".to_string()))
}

#[async_trait]
impl LectureApi for YuketangApi {
    async fn get_classroom(&self, classroom_id: u64) -> Result<ClassroomInfo, ApiError> {
        let request = ApiRequest::get(format!("/v2/api/web/classrooms/{classroom_id}"))
            .with_query("role", 5)
            .for_classroom(classroom_id);

        let envelope: ErrcodeEnvelope<ClassroomInfo> = self.fetch(request).await?;
        if envelope.errcode != 0 {
            return Err(ApiError::Platform(
                envelope.errmsg.unwrap_or_else(|| format!("errcode {}", envelope.errcode)),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Malformed("missing classroom `data`".to_string()))
    }

    async fn get_course_chapter(
        &self,
        classroom_id: u64,
        sign: &str,
        uv_id: u64,
    ) -> Result<CourseChapters, ApiError> {
        let request = ApiRequest::get("/mooc-api/v1/lms/learn/course/chapter")
            .with_query("cid", classroom_id)
            .with_query("term", "latest")
            .with_query("uv_id", uv_id)
            .with_query("sign", sign)
            .for_classroom(classroom_id);

        unwrap_success(self.fetch(request).await?)
    }

    async fn get_leaf_info(&self, classroom_id: u64, leaf_id: u64) -> Result<LeafInfo, ApiError> {
        let request = ApiRequest::get(format!(
            "/mooc-api/v1/lms/learn/leaf_info/{classroom_id}/{leaf_id}/"
        ))
        .for_classroom(classroom_id);

        unwrap_success(self.fetch(request).await?)
    }

    async fn get_watch_progress(
        &self,
        query: WatchProgressQuery,
    ) -> Result<Option<WatchProgress>, ApiError> {
        let request = ApiRequest::get("/video-log/get_video_watch_progress/")
            .with_query("cid", query.course_id)
            .with_query("user_id", query.user_id)
            .with_query("classroom_id", query.classroom_id)
            .with_query("video_type", "video")
            .with_query("vtype", "rate")
            .with_query("video_id", query.video_id)
            .with_query("snapshot", 1)
            .for_classroom(query.classroom_id);

        let envelope: CodeEnvelope<serde_json::Value> = self.fetch(request).await?;
        if envelope.code != 0 {
            return Err(ApiError::Platform(
                envelope.msg.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let Some(entry) = envelope
            .data
            .as_ref()
            .and_then(|data| data.get(query.video_id.to_string()))
        else {
            return Ok(None);
        };
        if entry.is_null() {
            return Ok(None);
        }

        serde_json::from_value(entry.clone())
            .map(Some)
            .map_err(|e| ApiError::Malformed(format!("watch progress: {e}")))
    }

    async fn get_play_url(&self, classroom_id: u64, ccid: &str) -> Result<PlayUrl, ApiError> {
        let request = ApiRequest::get("/api/open/audiovideo/playurl")
            .with_query("video_id", ccid)
            .with_query("provider", "cc")
            .with_query("file_type", 1)
            .with_query("is_single", 0)
            .with_query("domain", PLAYER_DOMAIN)
            .for_classroom(classroom_id);

        let data: PlayUrlData = unwrap_success(self.fetch(request).await?)?;
        Ok(data.playurl)
    }

    async fn send_heartbeat(
        &self,
        classroom_id: u64,
        events: &[HeartbeatEvent],
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post("/video-log/heartbeat/", json!({ "heart_data": events }))
            .for_classroom(classroom_id);

        self.session.send(request).await?;
        Ok(())
    }
}
