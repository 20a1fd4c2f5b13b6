use crate::api::HeartbeatEvent;
use crate::catalog::{LeafContext, VideoTask};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::Duration;

/// Simulated playback never runs faster than real time.
pub const PLAYBACK_SPEED: f64 = 1.0;

const PAGE_SUFFIX_LEN: usize = 4;

/// One progress report, built fresh for every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatRequest {
    pub video_id: u64,
    pub reported_position: f64,
    /// Player page token (`<video_id>_<suffix>`) shared by all reports of one playback.
    pub session_token: String,
    pub sequence: u64,
    pub timestamp_ms: i64,
}

/// Produces sequenced heartbeats for one playback of one video.
pub struct HeartbeatBuilder {
    video_id: u64,
    duration: f64,
    interval_secs: f64,
    context: LeafContext,
    page_token: String,
    sequence: u64,
}

impl HeartbeatBuilder {
    pub fn new(task: &VideoTask, interval: Duration) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PAGE_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        Self {
            video_id: task.id,
            duration: task.total_duration,
            interval_secs: interval.as_secs_f64(),
            context: task.context.clone(),
            page_token: format!("{}_{}", task.id, suffix),
            sequence: 0,
        }
    }

    pub fn next(&mut self, position: f64, timestamp_ms: i64) -> HeartbeatRequest {
        self.sequence += 1;
        HeartbeatRequest {
            video_id: self.video_id,
            reported_position: position,
            session_token: self.page_token.clone(),
            sequence: self.sequence,
            timestamp_ms,
        }
    }

    pub fn to_event(&self, request: &HeartbeatRequest) -> HeartbeatEvent {
        HeartbeatEvent {
            i: self.interval_secs,
            et: "heartbeat".to_string(),
            p: "web".to_string(),
            n: self.context.cdn_domain.clone(),
            lob: "ykt".to_string(),
            cp: request.reported_position,
            fp: 0,
            tp: 0,
            sp: PLAYBACK_SPEED,
            ts: request.timestamp_ms.to_string(),
            u: self.context.user_id,
            uip: String::new(),
            c: self.context.course_id,
            v: request.video_id,
            skuid: self.context.sku_id,
            classroomid: self.context.classroom_id,
            cc: self.context.ccid.clone(),
            d: self.duration,
            pg: request.session_token.clone(),
            sq: request.sequence,
            t: "video".to_string(),
            cards_id: 0,
            slide: 0,
            v_url: String::new(),
        }
    }
}
