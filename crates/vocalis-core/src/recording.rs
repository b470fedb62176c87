//! Recording bridge: microphone → transcription → training submission.
//!
//! One capture at a time. The open capture is owned by the bridge; finishing, a failed
//! transcription and dropping the bridge all release the device.

use crate::error::{SimError, SimResult};
use crate::events::Notice;
use crate::training::{SubmitOutcome, TrainingSession};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use vocalis_voice::{AudioSource, CaptureConfig, CaptureStream, TranscriptionBackend, VoiceError};

/// What happened to a finished recording.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    /// Transcribed and submitted as the trainee's line.
    Submitted {
        text: String,
        outcome: SubmitOutcome,
    },
    /// Nothing was recognized; the trainee should type instead.
    Empty,
    /// Capture or transcription failed; the trainee should type instead.
    Failed,
    /// Transcribed, but the session refused the line (ended meanwhile or a round was
    /// in flight). The text is also carried by a notice so it can be resent.
    Unsent { text: String, reason: String },
}

/// Connects an audio source and a transcription backend to a training session.
pub struct RecordingBridge {
    source: Arc<dyn AudioSource>,
    stt: Arc<dyn TranscriptionBackend>,
    training: Arc<TrainingSession>,
    config: CaptureConfig,
    active: Mutex<Option<Box<dyn CaptureStream>>>,
}

impl RecordingBridge {
    pub fn new(
        source: Arc<dyn AudioSource>,
        stt: Arc<dyn TranscriptionBackend>,
        training: Arc<TrainingSession>,
    ) -> Self {
        Self {
            source,
            stt,
            training,
            config: CaptureConfig::default(),
            active: Mutex::new(None),
        }
    }

    pub fn with_capture_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Whether the record action should be enabled.
    pub async fn can_start(&self) -> bool {
        !self.is_recording() && self.training.accepts_input().await
    }

    /// Open the capture device.
    ///
    /// Errors: a capture already active, a transcription still running, no running
    /// session, or the device could not be opened (also reported as a notice).
    pub async fn start(&self) -> SimResult<()> {
        if self.is_recording() {
            return Err(SimError::CaptureActive);
        }
        if self.training.transcribing() || self.training.round_in_flight() {
            return Err(SimError::RoundInFlight);
        }
        if !self.training.is_running().await {
            return Err(SimError::NotRunning);
        }

        let stream = match self.source.open(&self.config) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "capture device unavailable");
                self.training
                    .notify(Notice::error(
                        "Microphone Access Denied",
                        format!("Could not start recording: {}", e),
                    ))
                    .await;
                return Err(e.into());
            }
        };

        let mut active = self
            .active
            .lock()
            .map_err(|_| SimError::Voice(VoiceError::Capture("capture slot poisoned".to_string())))?;
        if active.is_some() {
            // Lost a race with a concurrent start; `stream` is dropped and released here.
            return Err(SimError::CaptureActive);
        }
        *active = Some(stream);
        info!("🎙️ Recording started");
        Ok(())
    }

    /// Stop the capture, transcribe it and submit the text to the training session.
    ///
    /// Typed submissions are rejected from here until the transcript has been submitted.
    pub async fn stop(&self) -> SimResult<RecordingOutcome> {
        let gate = self.training.hold_input().ok_or(SimError::RoundInFlight)?;
        let stream = self
            .active
            .lock()
            .ok()
            .and_then(|mut a| a.take())
            .ok_or(SimError::NoCapture)?;

        let audio = match stream.finish() {
            Ok(audio) => audio,
            Err(e) => {
                self.training
                    .notify(Notice::error(
                        "Transcription Error",
                        format!("Recording could not be read: {}", e),
                    ))
                    .await;
                return Ok(RecordingOutcome::Failed);
            }
        };
        debug!(
            samples = audio.samples.len(),
            secs = audio.duration().as_secs_f32(),
            "capture finished"
        );

        let text = match self.stt.transcribe(&audio).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "transcription failed");
                self.training
                    .notify(Notice::error(
                        "Transcription Error",
                        format!("Transcription failed: {}. Please type your message instead.", e),
                    ))
                    .await;
                return Ok(RecordingOutcome::Failed);
            }
        };

        if text.is_empty() {
            self.training
                .notify(Notice::warning(
                    "Transcription Failed",
                    "Could not understand audio. Please try again or type your message.",
                ))
                .await;
            return Ok(RecordingOutcome::Empty);
        }

        info!(chars = text.len(), "📝 Transcribed recording");
        match self.training.submit_transcript(&gate, &text).await {
            Ok(outcome) => Ok(RecordingOutcome::Submitted { text, outcome }),
            Err(e) => {
                warn!(error = %e, "transcript not submitted");
                self.training
                    .notify(Notice::warning(
                        "Message Not Sent",
                        format!("{}. Your recording said: \"{}\"", e, text),
                    ))
                    .await;
                Ok(RecordingOutcome::Unsent {
                    text,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Abandon an active capture without transcribing it.
    pub fn cancel(&self) -> bool {
        let stream = self.active.lock().ok().and_then(|mut a| a.take());
        stream.is_some()
    }
}
