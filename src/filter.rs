use crate::config_loader::Settings;
use crate::dedup::SpamFingerprintSet;
use crate::feed::ChatMessage;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Mutex;

/// Events the feed reports as text rather than chat: suppressed when
/// ignore_system is on.
const SYSTEM_PREFIXES: [&str; 3] = ["subscribed", "donated", "became a member"];

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(r"https?://\S+").unwrap();
    static ref WWW_RE: Regex = Regex::new(r"www\.\S+").unwrap();
    static ref EMOJI_RE: Regex = Regex::new(
        "[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\
         \u{1F1E0}-\u{1F1FF}\u{2702}-\u{27B0}\u{24C2}-\u{1F251}]+"
    )
    .unwrap();
    static ref JUNK_RE: Regex = Regex::new(r#"[^\w\s.,!?\-:'"()]"#).unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// An (author, text) pair that survived filtering and is waiting to be
/// spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub author: String,
    pub text: String,
}

/// Result of running one message through the pipeline. Spam is displayable
/// but never spoken; rejections are silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(Utterance),
    Spam(Utterance),
    Rejected,
}

/// Stateless-per-call filter pipeline. The only state it owns is the spam
/// fingerprint window.
pub struct FilterEngine {
    fingerprints: Mutex<SpamFingerprintSet>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            fingerprints: Mutex::new(SpamFingerprintSet::new()),
        }
    }

    /// Runs the full pipeline in order: membership, system suppression,
    /// cleaning, length bounds, repeat detection, stop words. Short-circuits
    /// at the first failing stage.
    pub fn evaluate(&self, msg: &ChatMessage, cfg: &Settings) -> Outcome {
        if cfg.subscribers_only && !msg.is_member {
            return Outcome::Rejected;
        }

        if cfg.ignore_system
            && (msg.is_system || SYSTEM_PREFIXES.iter().any(|p| msg.text.starts_with(p)))
        {
            return Outcome::Rejected;
        }

        let mut cleaned = clean_message(&msg.text, cfg);

        if cleaned.chars().count() < cfg.min_length {
            return Outcome::Rejected;
        }
        if cleaned.chars().count() > cfg.max_length {
            cleaned = cleaned.chars().take(cfg.max_length).collect::<String>() + "...";
        }

        if cfg.filter_repeats {
            let mut fingerprints = self.fingerprints.lock().unwrap();
            if fingerprints.check_and_insert(&msg.author, &cleaned) {
                return Outcome::Spam(Utterance {
                    author: msg.author.clone(),
                    text: cleaned,
                });
            }
        }

        let lowered = cleaned.to_lowercase();
        if cfg
            .stop_words
            .iter()
            .any(|w| !w.is_empty() && lowered.contains(&w.to_lowercase()))
        {
            return Outcome::Rejected;
        }

        if cleaned.is_empty() {
            return Outcome::Rejected;
        }

        Outcome::Accepted(Utterance {
            author: msg.author.clone(),
            text: cleaned,
        })
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips links and emoji (when enabled), collapses whitespace, trims.
pub fn clean_message(text: &str, cfg: &Settings) -> String {
    let mut text = text.to_string();

    if cfg.filter_links {
        text = LINK_RE.replace_all(&text, "").into_owned();
        text = WWW_RE.replace_all(&text, "").into_owned();
    }

    if cfg.filter_emojis {
        text = EMOJI_RE.replace_all(&text, "").into_owned();
        text = JUNK_RE.replace_all(&text, " ").into_owned();
    }

    text = WHITESPACE_RE.replace_all(&text, " ").into_owned();
    text.trim().to_string()
}
