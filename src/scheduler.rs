use crate::buffer::UtteranceBuffer;
use crate::config_loader::SETTINGS;
use crate::display::{DisplaySink, Severity};
use crate::playback::PlaybackQueue;
use crate::stats::PipelineStats;
use crate::synth::SynthesisEngine;
use crate::voice_gate::VoiceGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const SCHEDULER_TICK: Duration = Duration::from_millis(200);

/// Rate-limited consumer of the utterance buffer. Claims the shared voice
/// gate, pulls the oldest utterance, and hands it to synthesis on an
/// ephemeral worker.
pub struct SpeechScheduler {
    buffer: Arc<UtteranceBuffer>,
    gate: Arc<VoiceGate>,
    synth: Arc<SynthesisEngine>,
    playback_queue: Arc<PlaybackQueue>,
    display: Arc<dyn DisplaySink>,
    stats: Arc<PipelineStats>,
    running: Arc<AtomicBool>,
    last_speak: Mutex<Option<Instant>>,
}

impl SpeechScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buffer: Arc<UtteranceBuffer>,
        gate: Arc<VoiceGate>,
        synth: Arc<SynthesisEngine>,
        playback_queue: Arc<PlaybackQueue>,
        display: Arc<dyn DisplaySink>,
        stats: Arc<PipelineStats>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            buffer,
            gate,
            synth,
            playback_queue,
            display,
            stats,
            running,
            last_speak: Mutex::new(None),
        }
    }

    pub async fn run(&self) {
        while self.running.load(Ordering::Relaxed) {
            self.try_dispatch();
            tokio::time::sleep(SCHEDULER_TICK).await;
        }
    }

    /// One scheduler tick. Dispatches at most one utterance; the delay and
    /// voice settings are read fresh from configuration on every call.
    /// Returns the synthesis worker handle when a dispatch started.
    pub fn try_dispatch(&self) -> Option<JoinHandle<()>> {
        let cfg = SETTINGS.read().unwrap().clone();

        if self.buffer.is_empty() {
            return None;
        }

        let mut last_speak = self.last_speak.lock().unwrap();
        if let Some(last) = *last_speak {
            if last.elapsed().as_secs_f64() < cfg.speak_delay_secs {
                return None;
            }
        }

        if !self.gate.try_claim() {
            return None;
        }
        let utterance = match self.buffer.dequeue_oldest() {
            Some(u) => u,
            None => {
                self.gate.release();
                return None;
            }
        };
        *last_speak = Some(Instant::now());
        drop(last_speak);

        let text = if cfg.read_author_names {
            format!("{} said: {}", utterance.author, utterance.text)
        } else {
            utterance.text
        };

        // The gate stays claimed through synthesis; playback reclaims it for
        // the clip. A failed synthesis must still release it or the whole
        // voice path stalls.
        let gate = self.gate.clone();
        let synth = self.synth.clone();
        let playback_queue = self.playback_queue.clone();
        let display = self.display.clone();
        let stats = self.stats.clone();
        Some(tokio::task::spawn_blocking(move || {
            match synth.synthesize(&text, &cfg) {
                Ok(clip) => {
                    if !clip.samples.is_empty() {
                        playback_queue.push(clip);
                        stats.record_spoken();
                    }
                }
                Err(e) => {
                    display.system_message(&format!("TTS error: {}", e), Severity::Error);
                }
            }
            gate.release();
        }))
    }
}
