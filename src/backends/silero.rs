use super::{AcousticModel, VoiceParams};
use std::io::{Cursor, Error, ErrorKind, Result, Write};
use std::process::{Command, Stdio};

/// Silero TTS driven through its CLI wrapper: text on stdin, WAV on stdout.
pub struct SileroBackend {
    binary_path: String,
    model: String,
}

impl SileroBackend {
    pub fn new(binary_path: String, model: String) -> Self {
        Self { binary_path, model }
    }

    /// Decodes the WAV the subprocess produced into mono f32 samples.
    fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| Error::new(ErrorKind::InvalidData, format!("bad WAV output: {}", e)))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::new(ErrorKind::InvalidData, e))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::new(ErrorKind::InvalidData, e))?
            }
        };

        if spec.channels <= 1 {
            return Ok(samples);
        }
        // Downmix: the pipeline works on mono.
        let channels = spec.channels as usize;
        Ok(samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect())
    }
}

impl AcousticModel for SileroBackend {
    fn apply(&self, text: &str, params: &VoiceParams) -> Result<Vec<f32>> {
        let mut child = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--speaker")
            .arg(&params.voice)
            .arg("--sample-rate")
            .arg(params.sample_rate.to_string())
            .arg(if params.put_accent {
                "--accent"
            } else {
                "--no-accent"
            })
            .arg(if params.put_yo { "--yo" } else { "--no-yo" })
            .arg("--output")
            .arg("-") // WAV to stdout
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
            stdin.write_all(b"\n")?;
            // stdin is dropped here, closing the pipe
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(Error::new(
                ErrorKind::Other,
                format!("silero error: {}", err),
            ));
        }

        Self::decode_wav(&output.stdout)
    }

    fn id(&self) -> &'static str {
        "silero"
    }
}
