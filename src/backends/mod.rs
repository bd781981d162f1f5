pub mod silero;

/// Per-call voice parameters handed to the model, read fresh from settings
/// at each synthesis.
#[derive(Debug, Clone)]
pub struct VoiceParams {
    pub voice: String,
    pub sample_rate: u32,
    pub put_accent: bool,
    pub put_yo: bool,
}

/// The acoustic model boundary. The pipeline only contracts the input shape
/// (text + voice parameters) and output shape (raw mono samples); what the
/// model does inside is opaque.
///
/// Implementations are not assumed safe to invoke concurrently; the
/// synthesis engine serializes calls process-wide.
pub trait AcousticModel: Send + Sync {
    fn apply(&self, text: &str, params: &VoiceParams) -> std::io::Result<Vec<f32>>;

    /// Backend id for log lines (e.g. "silero").
    fn id(&self) -> &'static str;
}
