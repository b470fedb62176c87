//! **Speech-to-Text (STT)**: convert a finished capture into text for the training loop.
//!
//! Backends in order of preference: local Whisper (`whisper` feature), a remote
//! OpenAI-compatible `/audio/transcriptions` endpoint, and a placeholder that echoes
//! the capture size.

use crate::audio::CapturedAudio;
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_STT_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Turns one capture into text.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe one capture. Return an empty string if nothing was recognized.
    async fn transcribe(&self, audio: &CapturedAudio) -> VoiceResult<String>;
}

/// Offline stand-in: a canned transcript, or a note describing the capture.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

#[async_trait]
impl TranscriptionBackend for PlaceholderStt {
    async fn transcribe(&self, audio: &CapturedAudio) -> VoiceResult<String> {
        Ok(match &self.response {
            Some(canned) => canned.clone(),
            None => format!(
                "[STT placeholder: {} samples, {:.1}s; configure STT_API_KEY or Whisper]",
                audio.samples.len(),
                audio.duration().as_secs_f32()
            ),
        })
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Remote transcription over an OpenAI-compatible API (OpenAI Whisper, a Deepgram proxy, ...).
#[derive(Debug, Clone)]
pub struct OpenAiStt {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiStt {
    /// `STT_API_URL`, `STT_API_KEY` (falls back to `OPENAI_API_KEY`) and `STT_MODEL`.
    pub fn from_env() -> VoiceResult<Self> {
        let api_key = std::env::var("STT_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| VoiceError::Config("no STT_API_KEY or OPENAI_API_KEY set".to_string()))?;
        Self::new(
            env_or("STT_API_URL", DEFAULT_STT_URL),
            api_key,
            env_or("STT_MODEL", DEFAULT_STT_MODEL),
        )
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(format!("http client: {}", e)))?;
        Ok(Self {
            endpoint: format!("{}/audio/transcriptions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiStt {
    async fn transcribe(&self, audio: &CapturedAudio) -> VoiceResult<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }
        let file = reqwest::multipart::Part::bytes(audio.to_wav()?)
            .file_name("capture.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", file);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Stt(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VoiceError::Stt(format!("transcription API returned {}: {}", status, detail)));
        }
        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Stt(format!("unreadable transcription: {}", e)))?;
        let text = parsed.text.trim().to_string();
        debug!(model = %self.model, chars = text.len(), "transcription received");
        Ok(text)
    }
}

#[cfg(feature = "whisper")]
mod local {
    use super::*;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Sample rate the ggml models are trained on.
    const WHISPER_RATE: u32 = 16000;

    /// Local Whisper over a ggml model file (e.g. `ggml-base.en.bin`). Inference runs on
    /// the blocking pool with a fresh decoder state per capture.
    pub struct WhisperStt {
        context: Arc<WhisperContext>,
    }

    impl WhisperStt {
        pub fn new(model_path: &str) -> VoiceResult<Self> {
            let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .map_err(|e| VoiceError::Stt(format!("could not load {}: {}", model_path, e)))?;
            Ok(Self {
                context: Arc::new(context),
            })
        }

        /// Model path from `WHISPER_MODEL_PATH`.
        pub fn from_env() -> VoiceResult<Self> {
            let path = std::env::var("WHISPER_MODEL_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| VoiceError::Config("WHISPER_MODEL_PATH is not set".to_string()))?;
            Self::new(path.trim())
        }
    }

    fn decode(context: &WhisperContext, samples: &[f32]) -> VoiceResult<String> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        params.set_no_timestamps(true);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = context
            .create_state()
            .map_err(|e| VoiceError::Stt(format!("decoder state: {}", e)))?;
        state
            .full(params, samples)
            .map_err(|e| VoiceError::Stt(format!("inference: {}", e)))?;
        let segments: Vec<String> = state
            .as_iter()
            .filter_map(|segment| segment.to_str().ok().map(str::to_string))
            .collect();
        Ok(segments.join(" ").trim().to_string())
    }

    #[async_trait]
    impl TranscriptionBackend for WhisperStt {
        async fn transcribe(&self, audio: &CapturedAudio) -> VoiceResult<String> {
            if audio.is_empty() {
                return Ok(String::new());
            }
            if audio.sample_rate != WHISPER_RATE {
                return Err(VoiceError::Stt(format!(
                    "local Whisper needs {} Hz audio, capture was {} Hz",
                    WHISPER_RATE, audio.sample_rate
                )));
            }
            let context = Arc::clone(&self.context);
            let samples = audio.samples.clone();
            tokio::task::spawn_blocking(move || decode(&context, &samples))
                .await
                .map_err(|e| VoiceError::Stt(format!("whisper worker: {}", e)))?
        }
    }
}

#[cfg(feature = "whisper")]
pub use local::WhisperStt;

/// Best backend the environment allows: local Whisper, then the remote API, then the placeholder.
pub fn create_best_stt() -> Arc<dyn TranscriptionBackend> {
    #[cfg(feature = "whisper")]
    {
        match local::WhisperStt::from_env() {
            Ok(whisper) => return Arc::new(whisper),
            Err(e) => debug!(error = %e, "local Whisper unavailable"),
        }
    }
    match OpenAiStt::from_env() {
        Ok(remote) => Arc::new(remote),
        Err(_) => Arc::new(PlaceholderStt::new()),
    }
}
