pub mod backends;
pub mod buffer;
pub mod config_loader;
pub mod dedup;
pub mod display;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod numbers;
pub mod playback;
pub mod scheduler;
pub mod stats;
pub mod synth;
pub mod voice_gate;
