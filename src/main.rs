use chatvoice::backends::silero::SileroBackend;
use chatvoice::buffer::UtteranceBuffer;
use chatvoice::config_loader::SETTINGS;
use chatvoice::display::{ConsoleDisplay, DisplaySink, Severity};
use chatvoice::feed::{self, YouTubeFeed};
use chatvoice::fetcher::Fetcher;
use chatvoice::filter::FilterEngine;
use chatvoice::playback::{AudioSink, PlaybackEngine, PlaybackQueue, RodioSink};
use chatvoice::scheduler::SpeechScheduler;
use chatvoice::stats::PipelineStats;
use chatvoice::synth::SynthesisEngine;
use chatvoice::voice_gate::VoiceGate;
use clap::Parser;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "chatvoice", version, about = "Reads a live chat out loud")]
struct Args {
    /// Video id or URL of the live stream (overrides config)
    #[arg(short, long)]
    stream: Option<String>,

    /// YouTube Data API key (overrides config)
    #[arg(short, long)]
    api_key: Option<String>,

    /// Display messages without speaking them
    #[arg(long)]
    no_speech: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    {
        let mut cfg = SETTINGS.write().unwrap();
        if let Some(stream) = args.stream {
            cfg.stream_id = stream;
        }
        if let Some(api_key) = args.api_key {
            cfg.api_key = api_key;
        }
        if args.no_speech {
            cfg.enable_speech = false;
        }
    }
    let cfg = SETTINGS.read().unwrap().clone();

    let stream_id = match feed::extract_video_id(&cfg.stream_id) {
        Some(id) => id,
        None => {
            eprintln!("No stream id. Pass --stream <video id or URL> or set stream_id in the config.");
            return Ok(());
        }
    };
    if cfg.api_key.is_empty() {
        eprintln!("No API key. Pass --api-key or set CHATVOICE_API_KEY.");
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let display: Arc<dyn DisplaySink> = Arc::new(ConsoleDisplay);
    let stats = Arc::new(PipelineStats::new());
    let buffer = Arc::new(UtteranceBuffer::new(cfg.buffer_size));
    let gate = Arc::new(VoiceGate::new());
    let playback_queue = Arc::new(PlaybackQueue::new());
    let audio_sink: Arc<dyn AudioSink> = Arc::new(RodioSink::new());

    let model = Arc::new(SileroBackend::new(cfg.tts_binary.clone(), cfg.tts_model.clone()));
    let synth = Arc::new(SynthesisEngine::new(model));

    let fetcher = Arc::new(Fetcher::new(
        Arc::new(YouTubeFeed::new(cfg.api_key.clone())),
        Arc::new(FilterEngine::new()),
        buffer.clone(),
        display.clone(),
        stats.clone(),
        running.clone(),
    ));
    let scheduler = Arc::new(SpeechScheduler::new(
        buffer.clone(),
        gate.clone(),
        synth,
        playback_queue.clone(),
        display.clone(),
        stats.clone(),
        running.clone(),
    ));
    let playback = Arc::new(PlaybackEngine::new(
        playback_queue.clone(),
        gate,
        audio_sink.clone(),
        display.clone(),
        running.clone(),
    ));

    display.system_message(
        &format!("chatvoice {} connecting to {}", env!("CARGO_PKG_VERSION"), stream_id),
        Severity::Info,
    );

    let mut fetch_task = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.run(&stream_id).await }
    });
    let scheduler_task = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });
    let playback_task = tokio::spawn({
        let playback = playback.clone();
        async move { playback.run().await }
    });
    let stats_task = tokio::spawn({
        let running = running.clone();
        let stats = stats.clone();
        let buffer = buffer.clone();
        let display = display.clone();
        async move {
            while running.load(Ordering::Relaxed) {
                tokio::time::sleep(STATS_INTERVAL).await;
                if running.load(Ordering::Relaxed) {
                    display.system_message(&stats.summary(buffer.len()), Severity::Info);
                }
            }
        }
    });

    // The fetcher clears the running flag on terminal feed errors; either
    // that or ctrl-c ends the session.
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            display.system_message("Disconnecting...", Severity::Info);
        }
        _ = &mut fetch_task => {}
    }

    running.store(false, Ordering::Relaxed);
    playback_queue.clear();
    audio_sink.stop();

    // Loops notice the flag within one tick.
    for task in [scheduler_task, playback_task, stats_task] {
        let _ = tokio::time::timeout(Duration::from_secs(10), task).await;
    }
    if !fetch_task.is_finished() {
        let _ = tokio::time::timeout(Duration::from_secs(10), fetch_task).await;
    }

    display.system_message(&stats.summary(buffer.len()), Severity::Info);
    display.system_message("Disconnected from chat", Severity::Info);
    Ok(())
}
