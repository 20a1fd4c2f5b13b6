#[cfg(test)]
pub mod mocks {
    use crate::api::*;
    use crate::error::{ApiError, ClientError};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    pub const FAKE_USER_ID: u64 = 9;
    pub const FAKE_COURSE_ID: u64 = 77;
    pub const FAKE_SKU_ID: u64 = 33;

    /// Writer that keeps everything in memory so tests can read the lines back.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    pub struct FakeVideo {
        pub id: u64,
        pub duration: f64,
        /// `(last_point, completed)` as the platform would report it.
        pub progress: Option<(f64, bool)>,
    }

    impl FakeVideo {
        pub fn new(id: u64, duration: f64) -> Self {
            Self {
                id,
                duration,
                progress: None,
            }
        }

        pub fn with_progress(mut self, last_point: f64, completed: bool) -> Self {
            self.progress = Some((last_point, completed));
            self
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum HeartbeatOutcome {
        Ok,
        Auth,
        Transport,
        Rejected,
    }

    #[derive(Debug, Clone)]
    pub struct RecordedHeartbeat {
        pub video_id: u64,
        pub position: f64,
        pub sequence: u64,
        pub at: Instant,
    }

    #[derive(Default)]
    struct Traffic {
        log: Vec<RecordedHeartbeat>,
        in_flight: HashMap<u64, usize>,
        max_in_flight_per_video: usize,
    }

    /// In-memory platform: one classroom, a flat list of videos, scripted heartbeat answers.
    pub struct FakeLectureApi {
        classroom_id: u64,
        videos: Vec<FakeVideo>,
        reject_auth: bool,
        send_delay: Option<Duration>,
        scripts: Mutex<HashMap<u64, VecDeque<HeartbeatOutcome>>>,
        traffic: Mutex<Traffic>,
    }

    impl FakeLectureApi {
        pub fn new(classroom_id: u64) -> Self {
            Self {
                classroom_id,
                videos: Vec::new(),
                reject_auth: false,
                send_delay: None,
                scripts: Mutex::new(HashMap::new()),
                traffic: Mutex::new(Traffic::default()),
            }
        }

        pub fn with_video(mut self, video: FakeVideo) -> Self {
            self.videos.push(video);
            self
        }

        /// Every call answers 401, as with an expired cookie.
        pub fn rejecting_auth(mut self) -> Self {
            self.reject_auth = true;
            self
        }

        pub fn with_send_delay(mut self, delay: Duration) -> Self {
            self.send_delay = Some(delay);
            self
        }

        /// Answers for successive heartbeat attempts of one video; `Ok` once the script runs out.
        pub fn with_heartbeat_script(mut self, video_id: u64, outcomes: Vec<HeartbeatOutcome>) -> Self {
            self.scripts
                .get_mut()
                .unwrap()
                .insert(video_id, outcomes.into());
            self
        }

        /// Every heartbeat attempt in arrival order, failed ones included.
        pub fn heartbeats(&self) -> Vec<RecordedHeartbeat> {
            self.traffic.lock().unwrap().log.clone()
        }

        pub fn positions(&self, video_id: u64) -> Vec<f64> {
            self.heartbeats()
                .into_iter()
                .filter(|h| h.video_id == video_id)
                .map(|h| h.position)
                .collect()
        }

        pub fn max_in_flight_per_video(&self) -> usize {
            self.traffic.lock().unwrap().max_in_flight_per_video
        }

        fn video(&self, id: u64) -> Result<&FakeVideo, ApiError> {
            self.videos
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| ApiError::Platform(format!("no such leaf {id}")))
        }

        fn check_auth(&self) -> Result<(), ApiError> {
            if self.reject_auth {
                return Err(ClientError::Auth { status: 401 }.into());
            }
            Ok(())
        }

        fn next_outcome(&self, video_id: u64) -> HeartbeatOutcome {
            self.scripts
                .lock()
                .unwrap()
                .get_mut(&video_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or(HeartbeatOutcome::Ok)
        }
    }

    #[async_trait]
    impl LectureApi for FakeLectureApi {
        async fn get_classroom(&self, classroom_id: u64) -> Result<ClassroomInfo, ApiError> {
            self.check_auth()?;
            if classroom_id != self.classroom_id {
                return Err(ApiError::Platform(format!("classroom {classroom_id} not found")));
            }
            Ok(ClassroomInfo {
                course_name: "Fake Course".to_string(),
                name: "Spring".to_string(),
                teacher_name: "Teacher".to_string(),
                course_sign: "sign".to_string(),
                uv_id: 1,
            })
        }

        async fn get_course_chapter(
            &self,
            _classroom_id: u64,
            _sign: &str,
            _uv_id: u64,
        ) -> Result<CourseChapters, ApiError> {
            self.check_auth()?;
            let leaves = self
                .videos
                .iter()
                .map(|v| Leaf {
                    id: v.id,
                    name: format!("Video {}", v.id),
                    leaf_type: VIDEO_LEAF_TYPE,
                })
                .collect();
            Ok(CourseChapters {
                course_chapter: vec![Chapter {
                    id: 1,
                    name: "Chapter 1".to_string(),
                    section_leaf_list: vec![ChapterItem {
                        id: 10,
                        name: "Section 1".to_string(),
                        leaf_type: None,
                        leaf_list: Some(leaves),
                    }],
                }],
            })
        }

        async fn get_leaf_info(&self, classroom_id: u64, leaf_id: u64) -> Result<LeafInfo, ApiError> {
            self.check_auth()?;
            let video = self.video(leaf_id)?;
            Ok(LeafInfo {
                id: video.id,
                name: format!("Video {}", video.id),
                user_id: FAKE_USER_ID,
                course_id: FAKE_COURSE_ID,
                classroom_id,
                sku_id: FAKE_SKU_ID,
                content_info: ContentInfo {
                    media: Media {
                        ccid: format!("CC{}", video.id),
                        duration: Some(video.duration),
                    },
                },
            })
        }

        async fn get_watch_progress(
            &self,
            query: WatchProgressQuery,
        ) -> Result<Option<WatchProgress>, ApiError> {
            self.check_auth()?;
            let video = self.video(query.video_id)?;
            Ok(video.progress.map(|(last_point, completed)| WatchProgress {
                completed: i64::from(completed),
                last_point,
                video_length: video.duration,
                watch_length: last_point,
                rate: if video.duration > 0.0 { last_point / video.duration } else { 0.0 },
            }))
        }

        async fn get_play_url(&self, _classroom_id: u64, ccid: &str) -> Result<PlayUrl, ApiError> {
            self.check_auth()?;
            let id = ccid.trim_start_matches("CC");
            let mut sources = BTreeMap::new();
            sources.insert(
                "quality10".to_string(),
                vec![format!("https://cdn.example.com/{id}.mp4")],
            );
            Ok(PlayUrl { sources })
        }

        async fn send_heartbeat(
            &self,
            _classroom_id: u64,
            events: &[HeartbeatEvent],
        ) -> Result<(), ApiError> {
            let Some(event) = events.first() else {
                return Ok(());
            };
            let video_id = event.v;

            {
                let mut traffic = self.traffic.lock().unwrap();
                traffic.log.push(RecordedHeartbeat {
                    video_id,
                    position: event.cp,
                    sequence: event.sq,
                    at: Instant::now(),
                });
                let count = traffic.in_flight.entry(video_id).or_insert(0);
                *count += 1;
                let current = *count;
                traffic.max_in_flight_per_video = traffic.max_in_flight_per_video.max(current);
            }

            if let Some(delay) = self.send_delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(count) = self.traffic.lock().unwrap().in_flight.get_mut(&video_id) {
                *count -= 1;
            }

            self.check_auth()?;
            match self.next_outcome(video_id) {
                HeartbeatOutcome::Ok => Ok(()),
                HeartbeatOutcome::Auth => Err(ClientError::Auth { status: 401 }.into()),
                HeartbeatOutcome::Transport => {
                    Err(ClientError::Transport("connection reset by peer".to_string()).into())
                }
                HeartbeatOutcome::Rejected => Err(ClientError::Rejected {
                    status: 400,
                    body: "bad heart_data".to_string(),
                }
                .into()),
            }
        }
    }
}
