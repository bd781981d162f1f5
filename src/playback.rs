use crate::display::{DisplaySink, Severity};
use crate::synth::AudioClip;
use crate::voice_gate::VoiceGate;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const PLAYBACK_TICK: Duration = Duration::from_millis(100);

/// Clips waiting for the speaker. Clips are moved in and out; nothing is
/// cloned across the handoff.
pub struct PlaybackQueue {
    clips: Mutex<VecDeque<AudioClip>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            clips: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, clip: AudioClip) {
        self.clips.lock().unwrap().push_back(clip);
    }

    pub fn pop(&self) -> Option<AudioClip> {
        self.clips.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.clips.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.clips.lock().unwrap().clear();
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio device boundary: `play` blocks its caller until the clip finishes;
/// `stop` is a best-effort halt used at shutdown.
pub trait AudioSink: Send + Sync {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<(), String>;
    fn stop(&self);
}

/// rodio-backed output. Each play opens its own output stream so the
/// blocking wait lives entirely on the ephemeral worker that called it.
pub struct RodioSink {
    current: Mutex<Option<Arc<Sink>>>,
}

impl RodioSink {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for RodioSink {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<(), String> {
        // Stream must stay alive for the duration of playback.
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| format!("no audio output device: {}", e))?;
        let sink = Arc::new(Sink::try_new(&handle).map_err(|e| format!("sink error: {}", e))?);
        sink.append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));

        *self.current.lock().unwrap() = Some(sink.clone());
        sink.sleep_until_end();
        self.current.lock().unwrap().take();
        Ok(())
    }

    fn stop(&self) {
        if let Some(sink) = self.current.lock().unwrap().take() {
            sink.stop();
        }
    }
}

/// Drains the playback queue one clip at a time. Shares the voice gate with
/// the scheduler, so nothing plays while an utterance is mid-synthesis.
pub struct PlaybackEngine {
    queue: Arc<PlaybackQueue>,
    gate: Arc<VoiceGate>,
    sink: Arc<dyn AudioSink>,
    display: Arc<dyn DisplaySink>,
    running: Arc<AtomicBool>,
}

impl PlaybackEngine {
    pub fn new(
        queue: Arc<PlaybackQueue>,
        gate: Arc<VoiceGate>,
        sink: Arc<dyn AudioSink>,
        display: Arc<dyn DisplaySink>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queue,
            gate,
            sink,
            display,
            running,
        }
    }

    pub async fn run(&self) {
        while self.running.load(Ordering::Relaxed) {
            self.try_play_next();
            tokio::time::sleep(PLAYBACK_TICK).await;
        }
    }

    /// One playback tick: claim the gate, pop a clip, and play it on an
    /// ephemeral worker. Returns the worker handle when something started.
    pub fn try_play_next(&self) -> Option<JoinHandle<()>> {
        if self.queue.is_empty() || !self.gate.try_claim() {
            return None;
        }
        let clip = match self.queue.pop() {
            Some(clip) => clip,
            None => {
                self.gate.release();
                return None;
            }
        };

        self.display.voice_active(true);

        let gate = self.gate.clone();
        let sink = self.sink.clone();
        let display = self.display.clone();
        Some(tokio::task::spawn_blocking(move || {
            if let Err(e) = sink.play(&clip.samples, clip.sample_rate) {
                display.system_message(&format!("Audio playback error: {}", e), Severity::Error);
            }
            gate.release();
            display.voice_active(false);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ConsoleDisplay;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink {
        played: AtomicUsize,
    }

    impl AudioSink for CountingSink {
        fn play(&self, _samples: &[f32], _sample_rate: u32) -> Result<(), String> {
            self.played.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn stop(&self) {}
    }

    fn clip(n: usize) -> AudioClip {
        AudioClip {
            samples: vec![n as f32],
            sample_rate: 48000,
        }
    }

    fn engine(sink: Arc<dyn AudioSink>) -> PlaybackEngine {
        PlaybackEngine::new(
            Arc::new(PlaybackQueue::new()),
            Arc::new(VoiceGate::new()),
            sink,
            Arc::new(ConsoleDisplay),
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn test_queue_fifo() {
        let queue = PlaybackQueue::new();
        queue.push(clip(1));
        queue.push(clip(2));
        assert_eq!(queue.pop(), Some(clip(1)));
        assert_eq!(queue.pop(), Some(clip(2)));
        assert_eq!(queue.pop(), None);
    }

    #[tokio::test]
    async fn test_plays_one_clip_and_releases_gate() {
        let sink = Arc::new(CountingSink {
            played: AtomicUsize::new(0),
        });
        let engine = engine(sink.clone());
        engine.queue.push(clip(1));

        let handle = engine.try_play_next().expect("should start playback");
        // Gate held for the duration of the clip.
        assert!(engine.gate.is_busy());
        handle.await.unwrap();
        assert!(!engine.gate.is_busy());
        assert_eq!(sink.played.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_dispatch_while_gate_busy() {
        let sink = Arc::new(CountingSink {
            played: AtomicUsize::new(0),
        });
        let engine = engine(sink);
        engine.queue.push(clip(1));

        assert!(engine.gate.try_claim());
        assert!(engine.try_play_next().is_none());
        assert_eq!(engine.queue.len(), 1);
        engine.gate.release();
        assert!(engine.try_play_next().is_some());
    }

    #[tokio::test]
    async fn test_failure_still_releases_gate() {
        struct FailingSink;
        impl AudioSink for FailingSink {
            fn play(&self, _: &[f32], _: u32) -> Result<(), String> {
                Err("device gone".to_string())
            }
            fn stop(&self) {}
        }
        let engine = engine(Arc::new(FailingSink));
        engine.queue.push(clip(1));
        engine.try_play_next().unwrap().await.unwrap();
        assert!(!engine.gate.is_busy());
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let sink = Arc::new(CountingSink {
            played: AtomicUsize::new(0),
        });
        let engine = engine(sink);
        assert!(engine.try_play_next().is_none());
        assert!(!engine.gate.is_busy());
    }
}
