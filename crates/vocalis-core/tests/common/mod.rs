//! Scripted backend doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use vocalis_core::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, GenerationBackend, GenerationRequest,
    GenerationResponse, SimError, SimResult,
};
use vocalis_voice::{pcm_f32_to_wav, AudioPayload, SpeechRequest, SynthesisBackend, VoiceError, VoiceResult, VoiceRole};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedGeneration {
    script: Mutex<VecDeque<SimResult<GenerationResponse>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedGeneration {
    pub fn new(script: Vec<SimResult<GenerationResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Every call waits for `gate.notify_one()` before answering.
    pub fn gated(script: Vec<SimResult<GenerationResponse>>, gate: Arc<Notify>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedGeneration {
    async fn generate(&self, request: &GenerationRequest) -> SimResult<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(GenerationResponse::default()))
    }
}

/// Lets the test share the double with the executor and still inspect it.
pub struct Shared<T>(pub Arc<T>);

#[async_trait]
impl<T: GenerationBackend> GenerationBackend for Shared<T> {
    async fn generate(&self, request: &GenerationRequest) -> SimResult<GenerationResponse> {
        self.0.generate(request).await
    }
}

pub fn generation_error(msg: &str) -> SimResult<GenerationResponse> {
    Err(SimError::Generation(msg.to_string()))
}

/// Short WAV for every request; fails for `fail_for` and optionally sleeps first.
pub struct ScriptedTts {
    pub fail_for: Option<VoiceRole>,
    pub delay: Duration,
    pub requests: Mutex<Vec<SpeechRequest>>,
}

impl ScriptedTts {
    pub fn ok() -> Self {
        Self {
            fail_for: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(role: VoiceRole) -> Self {
        Self {
            fail_for: Some(role),
            ..Self::ok()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok()
        }
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedTts {
    async fn synthesize(&self, request: &SpeechRequest) -> VoiceResult<AudioPayload> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_for == Some(request.role) {
            return Err(VoiceError::Tts("voice quota exceeded".to_string()));
        }
        // 0.25 s at 16 kHz
        let wav = pcm_f32_to_wav(&vec![0.0; 4000], 16000)?;
        Ok(AudioPayload::wav(wav))
    }
}

pub struct SharedTts(pub Arc<ScriptedTts>);

#[async_trait]
impl SynthesisBackend for SharedTts {
    async fn synthesize(&self, request: &SpeechRequest) -> VoiceResult<AudioPayload> {
        self.0.synthesize(request).await
    }
}

/// Fixed analysis (or failure), recording requests.
pub struct ScriptedAnalysis {
    pub result: Option<AnalysisResult>,
    pub requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedAnalysis {
    pub fn scoring(score: f64) -> Self {
        Self {
            result: Some(AnalysisResult {
                overall_score: score,
                feedback: "**Solid discovery.**".to_string(),
                strengths: vec!["Rapport".to_string()],
                areas_for_improvement: vec!["Closing".to_string()],
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> SimResult<AnalysisResult> {
        self.requests.lock().unwrap().push(request.clone());
        self.result
            .clone()
            .ok_or_else(|| SimError::Analysis("coach unavailable".to_string()))
    }
}
