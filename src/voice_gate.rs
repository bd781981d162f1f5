use std::sync::atomic::{AtomicBool, Ordering};

/// The one exclusive voice token shared by synthesis and playback.
///
/// Both stages claim the same gate, so a new utterance cannot start
/// synthesizing while a clip is playing and a clip cannot start playing
/// while synthesis is running. That single token caps the whole pipeline at
/// one voice operation in flight; do not split it into per-stage flags.
pub struct VoiceGate {
    busy: AtomicBool,
}

impl VoiceGate {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Attempts to take the token. Returns true exactly once per
    /// claim/release cycle, no matter how many workers race on it.
    pub fn try_claim(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases the token. Every claimer must call this on every exit path,
    /// including synthesis and playback failures.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for VoiceGate {
    fn default() -> Self {
        Self::new()
    }
}
