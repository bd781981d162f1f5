use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Passive counters bumped by each pipeline stage.
pub struct PipelineStats {
    messages: AtomicU64,
    spoken: AtomicU64,
    spam: AtomicU64,
    started: Instant,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            messages: AtomicU64::new(0),
            spoken: AtomicU64::new(0),
            spam: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spoken(&self) {
        self.spoken.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spam(&self) {
        self.spam.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn spoken(&self) -> u64 {
        self.spoken.load(Ordering::Relaxed)
    }

    pub fn spam(&self) -> u64 {
        self.spam.load(Ordering::Relaxed)
    }

    pub fn summary(&self, queued: usize) -> String {
        let elapsed = self.started.elapsed();
        let hours = elapsed.as_secs() / 3600;
        let minutes = (elapsed.as_secs() % 3600) / 60;
        format!(
            "Runtime: {}h {}m | Messages: {} | Spoken: {} | Spam: {} | In queue: {}",
            hours,
            minutes,
            self.messages(),
            self.spoken(),
            self.spam(),
            queued
        )
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
