use config::{Config, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::RwLock;

/// Smallest and largest utterance buffer the pipeline will run with.
pub const BUFFER_MIN: usize = 1;
pub const BUFFER_MAX: usize = 200;
pub const BUFFER_DEFAULT: usize = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Feed
    pub api_key: String,
    pub stream_id: String,
    // Voice
    pub voice: String,
    pub speech_rate: f32, // 0.5 - 2.0
    pub volume: f32,      // 0.0 - 2.0
    pub put_accent: bool,
    pub put_yo: bool,
    pub sample_rate: u32,
    pub tts_binary: String,
    pub tts_model: String,
    pub enable_speech: bool,
    // Filters
    pub min_length: usize,
    pub max_length: usize,
    pub speak_delay_secs: f64,
    pub filter_emojis: bool,
    pub filter_links: bool,
    pub filter_repeats: bool,
    pub ignore_system: bool,
    pub subscribers_only: bool,
    pub read_author_names: bool,
    pub stop_words: Vec<String>,
    // Queue
    pub buffer_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            stream_id: String::new(),
            voice: "xenia".to_string(),
            speech_rate: 1.0,
            volume: 1.0,
            put_accent: true,
            put_yo: true,
            sample_rate: 48000,
            tts_binary: "silero-tts".to_string(),
            tts_model: "v5_ru".to_string(),
            enable_speech: true,
            min_length: 2,
            max_length: 200,
            speak_delay_secs: 1.5,
            filter_emojis: true,
            filter_links: true,
            filter_repeats: true,
            ignore_system: true,
            subscribers_only: false,
            read_author_names: false,
            stop_words: Vec::new(),
            buffer_size: BUFFER_DEFAULT,
        }
    }
}

lazy_static! {
    pub static ref SETTINGS: RwLock<Settings> = RwLock::new(Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load settings ({}), using defaults", e);
        Settings::default()
    }));
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            .set_default("api_key", "")?
            .set_default("stream_id", "")?
            .set_default("voice", "xenia")?
            .set_default("speech_rate", 1.0)?
            .set_default("volume", 1.0)?
            .set_default("put_accent", true)?
            .set_default("put_yo", true)?
            .set_default("sample_rate", 48000)?
            .set_default("tts_binary", "silero-tts")?
            .set_default("tts_model", "v5_ru")?
            .set_default("enable_speech", true)?
            .set_default("min_length", 2)?
            .set_default("max_length", 200)?
            .set_default("speak_delay_secs", 1.5)?
            .set_default("filter_emojis", true)?
            .set_default("filter_links", true)?
            .set_default("filter_repeats", true)?
            .set_default("ignore_system", true)?
            .set_default("subscribers_only", false)?
            .set_default("read_author_names", false)?
            .set_default("stop_words", Vec::<String>::new())?
            .set_default("buffer_size", BUFFER_DEFAULT as i64)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("ChatVoice").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/chatvoice/ChatVoice",
                    dirs::config_dir()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. CHATVOICE_API_KEY)
            .add_source(config::Environment::with_prefix("CHATVOICE"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        for warning in settings.clamp_to_valid() {
            eprintln!("Settings: {}", warning);
        }
        Ok(settings)
    }

    /// Pulls every tunable back into its documented range. Out-of-range
    /// values are never fatal; each correction is returned as a warning.
    pub fn clamp_to_valid(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.5..=2.0).contains(&self.speech_rate) {
            warnings.push(format!(
                "speech_rate {} out of range [0.5, 2.0], reset to 1.0",
                self.speech_rate
            ));
            self.speech_rate = 1.0;
        }
        if !(0.0..=2.0).contains(&self.volume) {
            warnings.push(format!(
                "volume {} out of range [0.0, 2.0], reset to 1.0",
                self.volume
            ));
            self.volume = 1.0;
        }
        if !self.speak_delay_secs.is_finite() || self.speak_delay_secs < 0.0 {
            warnings.push(format!(
                "speak_delay_secs {} invalid, reset to 1.5",
                self.speak_delay_secs
            ));
            self.speak_delay_secs = 1.5;
        }
        if self.min_length > self.max_length {
            warnings.push(format!(
                "min_length {} exceeds max_length {}, reset to 2/200",
                self.min_length, self.max_length
            ));
            self.min_length = 2;
            self.max_length = 200;
        }
        if self.buffer_size < BUFFER_MIN {
            warnings.push(format!(
                "buffer_size cannot be less than {}, set to 10",
                BUFFER_MIN
            ));
            self.buffer_size = 10;
        } else if self.buffer_size > BUFFER_MAX {
            warnings.push(format!("buffer_size capped at {}", BUFFER_MAX));
            self.buffer_size = BUFFER_MAX;
        }
        if self.sample_rate == 0 {
            warnings.push("sample_rate must be positive, reset to 48000".to_string());
            self.sample_rate = 48000;
        }

        warnings
    }
}
