use crate::playback::PlaybackStatus;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

const FULL_TENTHS: u32 = 1000;

struct ProgressSlot {
    title: String,
    total: f64,
    /// Last displayed value in tenths of a percent.
    tenths: AtomicU32,
    /// Bits of the last observed cursor.
    position: AtomicU64,
}

/// Per-video completion display. Each video has its own slot written only by
/// its simulator; the writer is locked only while a line is flushed.
pub struct ProgressReporter {
    slots: RwLock<BTreeMap<u64, Arc<ProgressSlot>>>,
    surface: Mutex<Box<dyn Write + Send>>,
}

impl ProgressReporter {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            surface: Mutex::new(writer),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    pub fn sink() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Adds a slot for the video and prints its starting line.
    pub fn register(&self, video_id: u64, title: &str, initial: f64, total: f64) {
        let tenths = tenths_of(initial, total);
        let slot = Arc::new(ProgressSlot {
            title: title.to_string(),
            total,
            tenths: AtomicU32::new(tenths),
            position: AtomicU64::new(initial.to_bits()),
        });

        if let Ok(mut slots) = self.slots.write() {
            slots.insert(video_id, slot.clone());
        }
        self.emit(&render(video_id, &slot, tenths, initial));
    }

    /// Prints a line only when the displayed percentage changes.
    pub fn observe(&self, video_id: u64, cursor: f64, total: f64) {
        let Some(slot) = self.slot(video_id) else {
            return;
        };

        slot.position.store(cursor.to_bits(), Ordering::Relaxed);
        let tenths = tenths_of(cursor, total);
        if slot.tenths.swap(tenths, Ordering::Relaxed) != tenths {
            self.emit(&render(video_id, &slot, tenths, cursor));
        }
    }

    pub fn finish(&self, video_id: u64, status: PlaybackStatus) {
        let Some(slot) = self.slot(video_id) else {
            return;
        };

        let tenths = slot.tenths.load(Ordering::Relaxed);
        let label = match status {
            PlaybackStatus::Completed => "done",
            PlaybackStatus::Failed => "failed",
            PlaybackStatus::Pending | PlaybackStatus::Playing => "stopped",
        };
        self.emit(&format!(
            "[{:>5.1}%] {} {} {}",
            f64::from(tenths) / 10.0,
            video_id,
            slot.title,
            label
        ));
    }

    /// Current percentage per registered video, in id order.
    pub fn snapshot(&self) -> Vec<(u64, f64)> {
        match self.slots.read() {
            Ok(slots) => slots
                .iter()
                .map(|(id, slot)| (*id, f64::from(slot.tenths.load(Ordering::Relaxed)) / 10.0))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Last cursor seen for the video, if it was registered.
    pub fn last_position(&self, video_id: u64) -> Option<f64> {
        self.slot(video_id)
            .map(|slot| f64::from_bits(slot.position.load(Ordering::Relaxed)))
    }

    fn slot(&self, video_id: u64) -> Option<Arc<ProgressSlot>> {
        self.slots.read().ok()?.get(&video_id).cloned()
    }

    // Write errors are dropped; the display never affects playback.
    fn emit(&self, line: &str) {
        if let Ok(mut surface) = self.surface.lock() {
            let _ = writeln!(surface, "{line}");
            let _ = surface.flush();
        }
    }
}

fn tenths_of(cursor: f64, total: f64) -> u32 {
    if total.is_nan() || total <= 0.0 {
        return FULL_TENTHS;
    }
    let ratio = (cursor / total).clamp(0.0, 1.0);
    ((ratio * f64::from(FULL_TENTHS)).floor() as u32).min(FULL_TENTHS)
}

fn render(video_id: u64, slot: &ProgressSlot, tenths: u32, cursor: f64) -> String {
    format!(
        "[{:>5.1}%] {} {} {:.0}/{:.0}s",
        f64::from(tenths) / 10.0,
        video_id,
        slot.title,
        cursor,
        slot.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mocks::SharedBuffer;

    #[test]
    fn test_line_format() {
        let buffer = SharedBuffer::default();
        let reporter = ProgressReporter::new(Box::new(buffer.clone()));

        reporter.register(501, "Intro", 0.0, 120.0);
        reporter.observe(501, 51.0, 120.0);
        reporter.observe(501, 51.02, 120.0);

        assert_eq!(reporter.last_position(501), Some(51.02));
        assert_eq!(reporter.last_position(7), None);
        assert_eq!(
            buffer.lines(),
            vec!["[  0.0%] 501 Intro 0/120s", "[ 42.5%] 501 Intro 51/120s"]
        );
    }

    #[test]
    fn test_only_changed_percentages_are_printed() {
        let buffer = SharedBuffer::default();
        let reporter = ProgressReporter::new(Box::new(buffer.clone()));

        reporter.register(1, "A", 0.0, 10_000.0);
        // 0.04% still displays as 0.0%
        reporter.observe(1, 4.0, 10_000.0);
        reporter.observe(1, 10.0, 10_000.0);
        reporter.observe(1, 15.0, 10_000.0);

        assert_eq!(buffer.lines().len(), 2);
        assert_eq!(reporter.snapshot(), vec![(1, 0.1)]);
    }

    #[test]
    fn test_finish_and_unknown_video() {
        let buffer = SharedBuffer::default();
        let reporter = ProgressReporter::new(Box::new(buffer.clone()));

        reporter.observe(99, 1.0, 2.0);
        reporter.finish(99, PlaybackStatus::Completed);
        assert!(buffer.lines().is_empty());

        reporter.register(2, "B", 0.0, 0.0);
        reporter.finish(2, PlaybackStatus::Completed);
        assert_eq!(buffer.lines(), vec!["[100.0%] 2 B 0/0s", "[100.0%] 2 B done"]);
    }

    #[test]
    fn test_concurrent_writers_keep_lines_whole() {
        let buffer = SharedBuffer::default();
        let reporter = Arc::new(ProgressReporter::new(Box::new(buffer.clone())));
        for id in 0..4 {
            reporter.register(id, "Video", 0.0, 100.0);
        }

        let handles: Vec<_> = (0..4)
            .map(|id| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for second in 1..=100 {
                        reporter.observe(id, f64::from(second), 100.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 4 + 4 * 100);
        assert!(lines.iter().all(|line| line.starts_with('[') && line.ends_with('s')));
        assert!(reporter.snapshot().iter().all(|(_, pct)| *pct == 100.0));
    }
}
