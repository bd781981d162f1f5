use chatvoice::backends::{AcousticModel, VoiceParams};
use chatvoice::buffer::UtteranceBuffer;
use chatvoice::config_loader::{Settings, SETTINGS};
use chatvoice::display::{ConsoleDisplay, DisplaySink, Severity};
use chatvoice::feed::{ChatFeed, ChatMessage, ChatPage, FeedError};
use chatvoice::fetcher::Fetcher;
use chatvoice::filter::FilterEngine;
use chatvoice::playback::{AudioSink, PlaybackEngine, PlaybackQueue};
use chatvoice::scheduler::SpeechScheduler;
use chatvoice::stats::PipelineStats;
use chatvoice::synth::SynthesisEngine;
use chatvoice::voice_gate::VoiceGate;
use serial_test::serial;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Model that records what it was asked to speak, in order.
struct RecordingModel {
    texts: Mutex<Vec<String>>,
}

impl RecordingModel {
    fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl AcousticModel for RecordingModel {
    fn apply(&self, text: &str, _params: &VoiceParams) -> std::io::Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(vec![0.1, 0.2, 0.3])
    }

    fn id(&self) -> &'static str {
        "recording"
    }
}

/// Sink that only counts completed plays.
struct NullSink {
    plays: AtomicUsize,
}

impl AudioSink for NullSink {
    fn play(&self, _samples: &[f32], _sample_rate: u32) -> Result<(), String> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn stop(&self) {}
}

/// Feed that replays a scripted sequence of page results and records the
/// cursors it was asked for. When the script runs out it clears the
/// running flag so `Fetcher::run` winds down.
struct ScriptedFeed {
    chat_id: Result<String, fn() -> FeedError>,
    pages: Mutex<VecDeque<Result<ChatPage, FeedError>>>,
    tokens_seen: Mutex<Vec<Option<String>>>,
    running: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl ChatFeed for ScriptedFeed {
    async fn resolve_chat_id(&self, _stream_id: &str) -> Result<String, FeedError> {
        self.chat_id.clone().map_err(|make| make())
    }

    async fn fetch_page(
        &self,
        chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<ChatPage, FeedError> {
        assert_eq!(chat_id, "chat-1");
        self.tokens_seen
            .lock()
            .unwrap()
            .push(page_token.map(String::from));
        match self.pages.lock().unwrap().pop_front() {
            Some(result) => result,
            None => {
                self.running.store(false, Ordering::Relaxed);
                Err(FeedError::Transient("script exhausted".to_string()))
            }
        }
    }
}

mockall::mock! {
    pub Display {}

    impl DisplaySink for Display {
        fn normal_message(&self, author: &str, text: &str);
        fn spam_message(&self, author: &str, text: &str);
        fn system_message(&self, text: &str, severity: Severity);
        fn voice_active(&self, active: bool);
    }
}

fn msg(i: usize) -> ChatMessage {
    ChatMessage {
        id: format!("id-{}", i),
        author: format!("viewer{}", i),
        text: format!("unique chat message number {}", i),
        is_member: false,
        is_system: false,
    }
}

fn reset_settings(delay: f64) {
    *SETTINGS.write().unwrap() = Settings {
        speak_delay_secs: delay,
        ..Settings::default()
    };
}

#[tokio::test]
#[serial]
async fn end_to_end_overflow_then_spoken_in_order() {
    reset_settings(0.0);

    let running = Arc::new(AtomicBool::new(true));
    let buffer = Arc::new(UtteranceBuffer::new(15));
    let gate = Arc::new(VoiceGate::new());
    let playback_queue = Arc::new(PlaybackQueue::new());
    let stats = Arc::new(PipelineStats::new());
    let display = Arc::new(ConsoleDisplay);
    let model = Arc::new(RecordingModel::new());
    let sink = Arc::new(NullSink {
        plays: AtomicUsize::new(0),
    });

    let fetcher = Fetcher::new(
        Arc::new(ScriptedFeed {
            chat_id: Ok("chat-1".to_string()),
            pages: Mutex::new(VecDeque::new()),
            tokens_seen: Mutex::new(Vec::new()),
            running: running.clone(),
        }),
        Arc::new(FilterEngine::new()),
        buffer.clone(),
        display.clone(),
        stats.clone(),
        running.clone(),
    );
    let scheduler = SpeechScheduler::new(
        buffer.clone(),
        gate.clone(),
        Arc::new(SynthesisEngine::new(model.clone())),
        playback_queue.clone(),
        display.clone(),
        stats.clone(),
        running.clone(),
    );
    let playback = PlaybackEngine::new(
        playback_queue.clone(),
        gate.clone(),
        sink.clone(),
        display.clone(),
        running.clone(),
    );

    // 20 unique messages into a capacity-15 buffer: 1..=5 slide out.
    let page: Vec<ChatMessage> = (1..=20).map(msg).collect();
    fetcher.process_page(&page);

    assert_eq!(stats.messages(), 20);
    assert_eq!(buffer.len(), 15);

    // Drain with zero delay, alternating scheduler and playback ticks the
    // way the real loops interleave.
    while !buffer.is_empty() || !playback_queue.is_empty() {
        if let Some(handle) = scheduler.try_dispatch() {
            handle.await.unwrap();
        }
        if let Some(handle) = playback.try_play_next() {
            handle.await.unwrap();
        }
    }

    let expected: Vec<String> = (6..=20)
        .map(|i| format!("unique chat message number {}", i))
        .collect();
    assert_eq!(model.spoken(), expected);
    assert_eq!(stats.spoken(), 15);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 15);
    assert!(!gate.is_busy());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn fetch_loop_pages_on_cursor_and_dedups() {
    reset_settings(0.0);

    let running = Arc::new(AtomicBool::new(true));
    let feed = Arc::new(ScriptedFeed {
        chat_id: Ok("chat-1".to_string()),
        pages: Mutex::new(VecDeque::from([
            Ok(ChatPage {
                items: (1..=3).map(msg).collect(),
                next_page_token: Some("t1".to_string()),
            }),
            // Second page redelivers id-3.
            Ok(ChatPage {
                items: vec![msg(3), msg(4)],
                next_page_token: Some("t2".to_string()),
            }),
        ])),
        tokens_seen: Mutex::new(Vec::new()),
        running: running.clone(),
    });

    let buffer = Arc::new(UtteranceBuffer::new(50));
    let stats = Arc::new(PipelineStats::new());
    let fetcher = Fetcher::new(
        feed.clone(),
        Arc::new(FilterEngine::new()),
        buffer.clone(),
        Arc::new(ConsoleDisplay),
        stats.clone(),
        running.clone(),
    );

    fetcher.run("stream-1").await;

    // First request has no cursor; each later one carries the previous
    // page's token.
    assert_eq!(
        *feed.tokens_seen.lock().unwrap(),
        vec![None, Some("t1".to_string()), Some("t2".to_string())]
    );
    // Four distinct ids across the two pages; the redelivered id-3 was
    // dropped by the seen set.
    assert_eq!(stats.messages(), 4);
    assert_eq!(buffer.len(), 4);
    assert_eq!(fetcher.seen_count(), 4);
}

#[tokio::test]
#[serial]
async fn terminal_resolution_clears_running_flag() {
    reset_settings(0.0);

    let running = Arc::new(AtomicBool::new(true));
    let feed = ScriptedFeed {
        chat_id: Err(|| FeedError::NotFound("stream over".to_string())),
        pages: Mutex::new(VecDeque::new()),
        tokens_seen: Mutex::new(Vec::new()),
        running: running.clone(),
    };

    let mut display = MockDisplay::new();
    display
        .expect_system_message()
        .withf(|text, severity| text.contains("Chat not found") && *severity == Severity::Error)
        .times(1)
        .returning(|_, _| ());

    let fetcher = Fetcher::new(
        Arc::new(feed),
        Arc::new(FilterEngine::new()),
        Arc::new(UtteranceBuffer::new(10)),
        Arc::new(display),
        Arc::new(PipelineStats::new()),
        running.clone(),
    );
    fetcher.run("stream-1").await;
    assert!(!running.load(Ordering::Relaxed));
}

#[tokio::test]
#[serial]
async fn spam_goes_to_display_not_voice() {
    reset_settings(0.0);

    let running = Arc::new(AtomicBool::new(true));
    let mut display = MockDisplay::new();
    display
        .expect_normal_message()
        .withf(|author, text| author == "viewer1" && text == "repeated line")
        .times(1)
        .returning(|_, _| ());
    display
        .expect_spam_message()
        .withf(|author, text| author == "viewer1" && text == "repeated line")
        .times(1)
        .returning(|_, _| ());

    let buffer = Arc::new(UtteranceBuffer::new(10));
    let stats = Arc::new(PipelineStats::new());
    let fetcher = Fetcher::new(
        Arc::new(ScriptedFeed {
            chat_id: Ok("chat-1".to_string()),
            pages: Mutex::new(VecDeque::new()),
            tokens_seen: Mutex::new(Vec::new()),
            running: running.clone(),
        }),
        Arc::new(FilterEngine::new()),
        buffer.clone(),
        Arc::new(display),
        stats.clone(),
        running,
    );

    let same = |id: &str| ChatMessage {
        id: id.to_string(),
        author: "viewer1".to_string(),
        text: "repeated line".to_string(),
        is_member: false,
        is_system: false,
    };
    fetcher.process_page(&[same("a"), same("b")]);

    assert_eq!(stats.spam(), 1);
    assert_eq!(buffer.len(), 1);
}
