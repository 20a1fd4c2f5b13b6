use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{success, msg, data}` envelope used by the mooc-api endpoints.
#[derive(Debug, Deserialize)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// `{code, msg, data}` envelope used by the video-log endpoints.
#[derive(Debug, Deserialize)]
pub struct CodeEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// `{errcode, errmsg, data}` envelope used by the v2 web API.
#[derive(Debug, Deserialize)]
pub struct ErrcodeEnvelope<T> {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomInfo {
    pub course_name: String,
    pub name: String,
    #[serde(default)]
    pub teacher_name: String,
    pub course_sign: String,
    pub uv_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChapters {
    pub course_chapter: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub section_leaf_list: Vec<ChapterItem>,
}

/// Either a section (has `leaf_list`) or a leaf sitting directly in the chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterItem {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub leaf_type: Option<i64>,
    #[serde(default)]
    pub leaf_list: Option<Vec<Leaf>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    pub id: u64,
    pub name: String,
    pub leaf_type: i64,
}

pub const VIDEO_LEAF_TYPE: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafInfo {
    pub id: u64,
    pub name: String,
    pub user_id: u64,
    pub course_id: u64,
    pub classroom_id: u64,
    pub sku_id: u64,
    pub content_info: ContentInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentInfo {
    pub media: Media,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub ccid: String,
    /// Advertised by the platform but often wrong; only a fallback.
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchProgress {
    #[serde(default)]
    pub completed: i64,
    #[serde(default)]
    pub last_point: f64,
    #[serde(default)]
    pub video_length: f64,
    #[serde(default)]
    pub watch_length: f64,
    #[serde(default)]
    pub rate: f64,
}

impl WatchProgress {
    pub fn is_completed(&self) -> bool {
        self.completed == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchProgressQuery {
    pub user_id: u64,
    pub course_id: u64,
    pub classroom_id: u64,
    pub video_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayUrlData {
    pub playurl: PlayUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayUrl {
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<String>>,
}

impl PlayUrl {
    pub fn first_source(&self) -> Option<&str> {
        self.sources
            .values()
            .find_map(|urls| urls.first())
            .map(String::as_str)
    }
}

/// One entry of the `heart_data` array, field names as the web player sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub i: f64,
    pub et: String,
    pub p: String,
    pub n: String,
    pub lob: String,
    pub cp: f64,
    pub fp: u32,
    pub tp: u32,
    pub sp: f64,
    pub ts: String,
    pub u: u64,
    pub uip: String,
    pub c: u64,
    pub v: u64,
    pub skuid: u64,
    pub classroomid: u64,
    pub cc: String,
    pub d: f64,
    pub pg: String,
    pub sq: u64,
    pub t: String,
    pub cards_id: u64,
    pub slide: u64,
    pub v_url: String,
}
