use crate::playback::RunResult;
use serde::{Deserialize, Serialize};

/// Outcome of one classroom run, one result per video in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub results: Vec<RunResult>,
    /// Most simulators seen running at the same moment.
    pub peak_parallel: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(RunResult::is_completed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|result| !result.is_completed())
    }

    pub fn completed_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_completed()).count()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
