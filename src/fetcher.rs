use crate::buffer::UtteranceBuffer;
use crate::config_loader::SETTINGS;
use crate::dedup::SeenIdSet;
use crate::display::{DisplaySink, Severity};
use crate::feed::{ChatFeed, ChatMessage, FeedError};
use crate::filter::{FilterEngine, Outcome};
use crate::stats::PipelineStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pause between page requests, and the retry backoff after a transient
/// fetch error.
const FETCH_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the chat feed on its cursor, dedups items, runs them through the
/// filter, and forwards accepted utterances to the buffer.
pub struct Fetcher {
    feed: Arc<dyn ChatFeed>,
    filter: Arc<FilterEngine>,
    buffer: Arc<UtteranceBuffer>,
    display: Arc<dyn DisplaySink>,
    stats: Arc<PipelineStats>,
    running: Arc<AtomicBool>,
    seen: Mutex<SeenIdSet>,
}

impl Fetcher {
    pub fn new(
        feed: Arc<dyn ChatFeed>,
        filter: Arc<FilterEngine>,
        buffer: Arc<UtteranceBuffer>,
        display: Arc<dyn DisplaySink>,
        stats: Arc<PipelineStats>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            feed,
            filter,
            buffer,
            display,
            stats,
            running,
            seen: Mutex::new(SeenIdSet::new()),
        }
    }

    /// Resolves the chat once, then polls pages until the running flag
    /// drops. Resolution failure is terminal: it disconnects the pipeline.
    pub async fn run(&self, stream_id: &str) {
        let chat_id = match self.feed.resolve_chat_id(stream_id).await {
            Ok(id) => id,
            Err(FeedError::NotFound(msg)) => {
                self.display.system_message(
                    &format!("Chat not found ({}). Make sure the stream is active.", msg),
                    Severity::Error,
                );
                self.running.store(false, Ordering::Relaxed);
                return;
            }
            Err(e) => {
                self.display
                    .system_message(&format!("Error getting chat: {}", e), Severity::Error);
                self.running.store(false, Ordering::Relaxed);
                return;
            }
        };

        self.display
            .system_message("Connected to chat! Waiting for messages...", Severity::Success);

        let mut page_token: Option<String> = None;
        while self.running.load(Ordering::Relaxed) {
            match self.feed.fetch_page(&chat_id, page_token.as_deref()).await {
                Ok(page) => {
                    page_token = page.next_page_token;
                    self.process_page(&page.items);
                    self.seen.lock().unwrap().trim();
                }
                Err(e) => {
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    self.display.system_message(
                        &format!("Error fetching messages: {}", e),
                        Severity::Error,
                    );
                }
            }
            tokio::time::sleep(FETCH_INTERVAL).await;
        }
    }

    /// Runs one page of items through dedup and the filter. Settings are
    /// read fresh per item so toggles apply mid-page.
    pub fn process_page(&self, items: &[ChatMessage]) {
        for msg in items {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if !self.seen.lock().unwrap().insert(&msg.id) {
                continue;
            }
            self.stats.record_message();

            let cfg = SETTINGS.read().unwrap().clone();
            match self.filter.evaluate(msg, &cfg) {
                Outcome::Accepted(utterance) => {
                    self.display
                        .normal_message(&utterance.author, &utterance.text);
                    if cfg.enable_speech && self.running.load(Ordering::Relaxed) {
                        self.buffer.enqueue(utterance);
                    }
                }
                Outcome::Spam(utterance) => {
                    self.stats.record_spam();
                    self.display.spam_message(&utterance.author, &utterance.text);
                }
                Outcome::Rejected => {}
            }
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
