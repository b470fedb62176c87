//! **Text-to-Speech (TTS)**: synthesize one line of a role-play as a playable payload.
//!
//! The voice is chosen from the speaking role; the tone label (e.g. `confident`,
//! `skeptical`) is forwarded to the backend as a delivery instruction.

use crate::audio::{pcm_f32_to_wav, AudioPayload};
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which persona is speaking. Human lines are never synthesized, so there is no human voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    Sales,
    Consumer,
}

/// One synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Clean text (tone marker already stripped).
    pub text: String,
    pub role: VoiceRole,
    /// Lower-cased tone label, if the line carried one.
    pub tone: Option<String>,
}

/// Backend that turns text into an audio payload. Implement for OpenAI/ElevenLabs/Gemini or local TTS.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> VoiceResult<AudioPayload>;
}

/// Voice for a role. Each role keeps one voice for every tone so a persona never changes
/// speaker mid-call; tones only change delivery.
pub fn voice_for(role: VoiceRole) -> &'static str {
    match role {
        VoiceRole::Sales => "onyx",
        VoiceRole::Consumer => "nova",
    }
}

/// Placeholder TTS: returns a short silent WAV so the pipeline (and audio-duration
/// metrics) behave as with a real backend.
#[derive(Debug, Clone)]
pub struct PlaceholderTts {
    pub silence: Duration,
    pub sample_rate: u32,
}

impl Default for PlaceholderTts {
    fn default() -> Self {
        Self {
            silence: Duration::from_millis(500),
            sample_rate: 24000,
        }
    }
}

#[async_trait]
impl SynthesisBackend for PlaceholderTts {
    async fn synthesize(&self, _request: &SpeechRequest) -> VoiceResult<AudioPayload> {
        let n = (self.silence.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let wav = pcm_f32_to_wav(&vec![0.0; n], self.sample_rate)?;
        Ok(AudioPayload::wav(wav))
    }
}

/// Production TTS backend: OpenAI-compatible `/audio/speech` API.
/// Uses `TTS_API_URL` (e.g. https://api.openai.com/v1), `TTS_API_KEY` and `TTS_MODEL`.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// TTS model. Tone instructions need an instruction-following model (gpt-4o-mini-tts).
    pub model: String,
    /// Override the sales voice (alloy, echo, fable, onyx, nova, shimmer, ...).
    pub sales_voice: Option<String>,
    /// Override the consumer voice.
    pub consumer_voice: Option<String>,
    client: reqwest::Client,
}

impl OpenAiTts {
    /// Build from environment: TTS_API_URL, TTS_API_KEY (or OPENAI_API_KEY), TTS_MODEL,
    /// TTS_SALES_VOICE, TTS_CONSUMER_VOICE.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| VoiceError::Config("TTS requires TTS_API_KEY or OPENAI_API_KEY".to_string()))?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "gpt-4o-mini-tts".to_string());
        let mut tts = Self::new(base_url, api_key, model)?;
        tts.sales_voice = std::env::var("TTS_SALES_VOICE").ok().filter(|v| !v.trim().is_empty());
        tts.consumer_voice = std::env::var("TTS_CONSUMER_VOICE").ok().filter(|v| !v.trim().is_empty());
        Ok(tts)
    }

    /// Create with explicit config (e.g. for tests or non-env wiring).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            sales_voice: None,
            consumer_voice: None,
            client,
        })
    }

    fn voice_id(&self, role: VoiceRole) -> String {
        let override_voice = match role {
            VoiceRole::Sales => self.sales_voice.as_ref(),
            VoiceRole::Consumer => self.consumer_voice.as_ref(),
        };
        match override_voice {
            Some(v) => v.clone(),
            None => voice_for(role).to_string(),
        }
    }
}

#[async_trait]
impl SynthesisBackend for OpenAiTts {
    async fn synthesize(&self, request: &SpeechRequest) -> VoiceResult<AudioPayload> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(VoiceError::Tts("nothing to synthesize".to_string()));
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let voice = self.voice_id(request.role);
        let mut body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": "wav",
        });
        if let Some(tone) = request.tone.as_deref().filter(|t| !t.is_empty()) {
            body["instructions"] = serde_json::Value::String(format!("Speak in a {} tone.", tone));
        }
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().await.map_err(|e| VoiceError::Tts(e.to_string()))?;
        if bytes.is_empty() {
            return Err(VoiceError::Tts("No audio returned from TTS.".to_string()));
        }
        debug!(voice = %voice, bytes = bytes.len(), "speech synthesized");
        Ok(AudioPayload::wav(bytes.to_vec()))
    }
}

/// Create the best available TTS backend from environment: OpenAiTts when a key is
/// configured, otherwise PlaceholderTts.
pub fn create_best_tts() -> Arc<dyn SynthesisBackend> {
    match OpenAiTts::from_env() {
        Ok(tts) => Arc::new(tts),
        Err(_) => Arc::new(PlaceholderTts::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav_duration_secs;

    #[tokio::test]
    async fn placeholder_tts_returns_silent_wav() {
        let tts = PlaceholderTts::default();
        let out = tts
            .synthesize(&SpeechRequest {
                text: "hello".to_string(),
                role: VoiceRole::Sales,
                tone: None,
            })
            .await
            .unwrap();
        assert_eq!(out.mime, "audio/wav");
        let secs = wav_duration_secs(&out.bytes).unwrap();
        assert!((secs - 0.5).abs() < 1e-3);
    }

    #[test]
    fn roles_have_distinct_voices() {
        assert_ne!(voice_for(VoiceRole::Sales), voice_for(VoiceRole::Consumer));
    }

    #[test]
    fn overrides_win_over_role_table() {
        let mut tts = OpenAiTts::new("http://localhost", "k", "tts-1").unwrap();
        tts.consumer_voice = Some("shimmer".to_string());
        assert_eq!(tts.voice_id(VoiceRole::Consumer), "shimmer");
        assert_eq!(tts.voice_id(VoiceRole::Sales), "onyx");
    }
}
