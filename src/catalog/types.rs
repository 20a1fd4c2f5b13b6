use serde::{Deserialize, Serialize};

/// Identity fields every heartbeat for a video has to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafContext {
    pub user_id: u64,
    pub course_id: u64,
    pub classroom_id: u64,
    pub sku_id: u64,
    pub ccid: String,
    pub cdn_domain: String,
}

/// A video the learner still has to play, as recorded by the platform at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTask {
    pub id: u64,
    pub title: String,
    pub total_duration: f64,
    pub initial_progress: f64,
    pub context: LeafContext,
}

impl VideoTask {
    /// Negative or non-finite inputs collapse to zero and progress is clamped to the duration.
    pub fn new(
        id: u64,
        title: impl Into<String>,
        total_duration: f64,
        initial_progress: f64,
        context: LeafContext,
    ) -> Self {
        let total_duration = sanitize(total_duration);
        let initial_progress = sanitize(initial_progress).min(total_duration);
        Self {
            id,
            title: title.into(),
            total_duration,
            initial_progress,
            context,
        }
    }

    pub fn is_already_watched(&self) -> bool {
        self.initial_progress >= self.total_duration
    }
}

fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LeafContext {
        LeafContext {
            user_id: 1,
            course_id: 2,
            classroom_id: 3,
            sku_id: 4,
            ccid: "CC".to_string(),
            cdn_domain: "cdn.example.com".to_string(),
        }
    }

    #[test]
    fn test_progress_is_clamped_into_duration() {
        let task = VideoTask::new(1, "a", 60.0, 75.0, context());
        assert_eq!(task.initial_progress, 60.0);
        assert!(task.is_already_watched());

        let task = VideoTask::new(2, "b", 60.0, -3.0, context());
        assert_eq!(task.initial_progress, 0.0);
        assert!(!task.is_already_watched());
    }

    #[test]
    fn test_zero_duration_counts_as_watched() {
        let task = VideoTask::new(3, "c", 0.0, 0.0, context());
        assert!(task.is_already_watched());

        let task = VideoTask::new(4, "d", f64::NAN, 0.0, context());
        assert_eq!(task.total_duration, 0.0);
    }
}
