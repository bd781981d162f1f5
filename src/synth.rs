use crate::backends::{AcousticModel, VoiceParams};
use crate::config_loader::Settings;
use crate::numbers::convert_numbers_to_words;
use std::io::Result;
use std::sync::{Arc, Mutex};

/// The model cuts off somewhere past 500 characters, so text is truncated
/// just short of that.
const MAX_TTS_CHARS: usize = 490;

/// Synthesized audio, handed to the playback queue. Ownership moves with it;
/// nothing upstream keeps a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Turns one utterance's text into a playable clip: number expansion,
/// truncation, one serialized model call, then normalize / gain / speed.
pub struct SynthesisEngine {
    model: Arc<dyn AcousticModel>,
    // The model is not assumed reentrant; calls are serialized process-wide.
    model_lock: Mutex<()>,
}

impl SynthesisEngine {
    pub fn new(model: Arc<dyn AcousticModel>) -> Self {
        Self {
            model,
            model_lock: Mutex::new(()),
        }
    }

    pub fn synthesize(&self, text: &str, cfg: &Settings) -> Result<AudioClip> {
        let mut text = convert_numbers_to_words(text);
        if text.chars().count() > MAX_TTS_CHARS {
            text = text.chars().take(MAX_TTS_CHARS - 3).collect::<String>() + "...";
        }

        let params = VoiceParams {
            voice: cfg.voice.clone(),
            sample_rate: cfg.sample_rate,
            put_accent: cfg.put_accent,
            put_yo: cfg.put_yo,
        };

        let raw = {
            let _guard = self.model_lock.lock().unwrap();
            self.model.apply(&text, &params)?
        };

        let mut samples = peak_normalize(raw);

        if cfg.volume != 1.0 {
            for sample in &mut samples {
                *sample *= cfg.volume;
            }
        }

        if cfg.speech_rate != 1.0 && !samples.is_empty() {
            samples = resample_linear(&samples, cfg.speech_rate);
        }

        Ok(AudioClip {
            samples,
            sample_rate: cfg.sample_rate,
        })
    }
}

/// Scales the signal so its peak sits at 1.0. A silent result would divide
/// by zero, so it is swapped for a short zero buffer instead.
fn peak_normalize(mut samples: Vec<f32>) -> Vec<f32> {
    let max = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if max > 0.0 {
        for sample in &mut samples {
            *sample /= max;
        }
        samples
    } else {
        vec![0.0; 1000]
    }
}

/// Duration-only speed change: linear interpolation over max(1, len/rate)
/// points spanning the original index range. Not pitch-preserving.
fn resample_linear(samples: &[f32], rate: f32) -> Vec<f32> {
    let new_len = ((samples.len() as f32 / rate) as usize).max(1);
    if samples.len() == 1 {
        return vec![samples[0]; new_len];
    }

    let last = (samples.len() - 1) as f32;
    (0..new_len)
        .map(|i| {
            let pos = if new_len == 1 {
                0.0
            } else {
                last * i as f32 / (new_len - 1) as f32
            };
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(samples.len() - 1);
            let frac = pos - lo as f32;
            samples[lo] * (1.0 - frac) + samples[hi] * frac
        })
        .collect()
}
