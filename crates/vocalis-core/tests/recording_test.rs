//! Recording bridge: buffered capture → transcription → training submission.

mod common;

use async_trait::async_trait;
use common::*;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;
use vocalis_core::{
    EngineEvent, GenerationResponse, Mode, RecordingBridge, RecordingOutcome, RoleplayConfig,
    SimError, Speaker, SubmitOutcome, TrainingSession, TurnExecutor,
};
use vocalis_voice::{
    BufferedSource, CapturedAudio, PlaceholderStt, TranscriptionBackend, VoiceError, VoiceResult,
};

struct BrokenStt;

#[async_trait]
impl TranscriptionBackend for BrokenStt {
    async fn transcribe(&self, _audio: &CapturedAudio) -> VoiceResult<String> {
        Err(VoiceError::Stt("service unavailable".to_string()))
    }
}

/// Signals when transcription begins, then waits for `release` before answering.
struct HeldStt {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    text: &'static str,
}

#[async_trait]
impl TranscriptionBackend for HeldStt {
    async fn transcribe(&self, _audio: &CapturedAudio) -> VoiceResult<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.text.to_string())
    }
}

async fn running_session(
    script: Vec<vocalis_core::SimResult<GenerationResponse>>,
) -> (Arc<TrainingSession>, UnboundedReceiver<EngineEvent>) {
    let executor = TurnExecutor::new(
        Arc::new(ScriptedGeneration::new(script)),
        Arc::new(ScriptedTts::ok()),
    );
    let (session, rx) = TrainingSession::new(executor, Arc::new(ScriptedAnalysis::scoring(70.0)));
    session
        .start(RoleplayConfig::defaults_for(Mode::LiveTraining))
        .await
        .unwrap();
    (Arc::new(session), rx)
}

fn notice_titles(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<String> {
    let mut titles = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Notice { notice, .. } = event {
            titles.push(notice.title);
        }
    }
    titles
}

fn one_second_of_audio() -> Vec<f32> {
    vec![0.1; 16000]
}

#[tokio::test]
async fn transcript_is_submitted_as_the_trainee_line() {
    let (session, _rx) =
        running_session(vec![Ok(GenerationResponse::consumer("*polite* Hi Alex."))]).await;
    let source = Arc::new(BufferedSource::new(one_second_of_audio()));
    let bridge = RecordingBridge::new(
        source.clone(),
        Arc::new(PlaceholderStt::with_response("  Hi Sarah, this is Alex.  ")),
        Arc::clone(&session),
    );

    assert!(bridge.can_start().await);
    bridge.start().await.unwrap();
    assert!(bridge.is_recording());
    assert_eq!(source.open_streams(), 1);

    let outcome = bridge.stop().await.unwrap();
    assert_eq!(
        outcome,
        RecordingOutcome::Submitted {
            text: "Hi Sarah, this is Alex.".to_string(),
            outcome: SubmitOutcome::Replied { ended: None },
        }
    );
    assert_eq!(source.open_streams(), 0);
    assert!(!bridge.is_recording());

    let state = session.snapshot().await;
    assert_eq!(state.transcript()[0].speaker, Speaker::Human);
    assert_eq!(state.transcript()[0].text, "Hi Sarah, this is Alex.");
    assert_eq!(state.transcript()[1].speaker, Speaker::ConsumerAgent);
}

#[tokio::test]
async fn empty_transcription_submits_nothing() {
    let (session, mut rx) = running_session(vec![]).await;
    let source = Arc::new(BufferedSource::new(one_second_of_audio()));
    let bridge = RecordingBridge::new(
        source.clone(),
        Arc::new(PlaceholderStt::with_response("   ")),
        Arc::clone(&session),
    );

    bridge.start().await.unwrap();
    assert_eq!(bridge.stop().await.unwrap(), RecordingOutcome::Empty);
    assert_eq!(source.open_streams(), 0);
    assert!(session.snapshot().await.transcript().is_empty());
    assert!(notice_titles(&mut rx).contains(&"Transcription Failed".to_string()));
    assert!(bridge.can_start().await);
}

#[tokio::test]
async fn transcription_error_is_a_notice() {
    let (session, mut rx) = running_session(vec![]).await;
    let bridge = RecordingBridge::new(
        Arc::new(BufferedSource::new(one_second_of_audio())),
        Arc::new(BrokenStt),
        Arc::clone(&session),
    );

    bridge.start().await.unwrap();
    assert_eq!(bridge.stop().await.unwrap(), RecordingOutcome::Failed);
    assert!(session.is_running().await);
    assert!(notice_titles(&mut rx).contains(&"Transcription Error".to_string()));
}

#[tokio::test]
async fn one_capture_at_a_time() {
    let (session, _rx) = running_session(vec![]).await;
    let source = Arc::new(BufferedSource::new(one_second_of_audio()));
    let bridge = RecordingBridge::new(
        source.clone(),
        Arc::new(PlaceholderStt::new()),
        Arc::clone(&session),
    );

    assert!(matches!(bridge.stop().await, Err(SimError::NoCapture)));
    bridge.start().await.unwrap();
    assert!(matches!(bridge.start().await, Err(SimError::CaptureActive)));
    assert!(!bridge.can_start().await);
    assert_eq!(source.open_streams(), 1);

    assert!(bridge.cancel());
    assert!(!bridge.cancel());
    assert_eq!(source.open_streams(), 0);
}

#[tokio::test]
async fn unavailable_device_is_reported() {
    let (session, mut rx) = running_session(vec![]).await;
    let bridge = RecordingBridge::new(
        Arc::new(BufferedSource::unavailable("permission denied")),
        Arc::new(PlaceholderStt::new()),
        Arc::clone(&session),
    );

    assert!(matches!(bridge.start().await, Err(SimError::Voice(VoiceError::Capture(_)))));
    assert!(!bridge.is_recording());
    assert!(notice_titles(&mut rx).contains(&"Microphone Access Denied".to_string()));
}

#[tokio::test]
async fn recording_needs_a_running_session() {
    let executor = TurnExecutor::new(
        Arc::new(ScriptedGeneration::new(vec![])),
        Arc::new(ScriptedTts::ok()),
    );
    let (session, _rx) = TrainingSession::new(executor, Arc::new(ScriptedAnalysis::scoring(70.0)));
    let source = Arc::new(BufferedSource::new(one_second_of_audio()));
    let bridge = RecordingBridge::new(source.clone(), Arc::new(PlaceholderStt::new()), Arc::new(session));

    assert!(!bridge.can_start().await);
    assert!(matches!(bridge.start().await, Err(SimError::NotRunning)));
    assert_eq!(source.open_streams(), 0);
}

#[tokio::test]
async fn typed_line_waits_for_the_transcription() {
    let (session, _rx) =
        running_session(vec![Ok(GenerationResponse::consumer("*curious* Go on."))]).await;
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let bridge = Arc::new(RecordingBridge::new(
        Arc::new(BufferedSource::new(one_second_of_audio())),
        Arc::new(HeldStt {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
            text: "Spoken line",
        }),
        Arc::clone(&session),
    ));

    bridge.start().await.unwrap();
    let stopping = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.stop().await }
    });
    entered.notified().await;

    assert!(session.transcribing());
    assert!(!session.accepts_input().await);
    assert!(!bridge.can_start().await);
    assert!(matches!(session.submit("Typed line").await, Err(SimError::RoundInFlight)));

    release.notify_one();
    let outcome = stopping.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        RecordingOutcome::Submitted {
            text: "Spoken line".to_string(),
            outcome: SubmitOutcome::Replied { ended: None },
        }
    );
    assert!(!session.transcribing());

    let state = session.snapshot().await;
    assert_eq!(state.transcript().len(), 2);
    assert_eq!(state.transcript()[0].text, "Spoken line");
    assert_eq!(state.transcript()[1].text, "Go on.");
    assert!(session.accepts_input().await);
}

#[tokio::test]
async fn refused_transcript_comes_back_as_a_notice() {
    let (session, mut rx) = running_session(vec![]).await;
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let bridge = Arc::new(RecordingBridge::new(
        Arc::new(BufferedSource::new(one_second_of_audio())),
        Arc::new(HeldStt {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
            text: "Can we talk pricing?",
        }),
        Arc::clone(&session),
    ));

    bridge.start().await.unwrap();
    let stopping = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.stop().await }
    });
    entered.notified().await;
    session.end().await.unwrap();
    release.notify_one();

    let outcome = stopping.await.unwrap().unwrap();
    assert!(matches!(
        &outcome,
        RecordingOutcome::Unsent { text, .. } if text == "Can we talk pricing?"
    ));

    let mut unsent = None;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Notice { notice, .. } = event {
            if notice.title == "Message Not Sent" {
                unsent = Some(notice.message);
            }
        }
    }
    let message = unsent.expect("refused transcript should raise a notice");
    assert!(message.contains("Can we talk pricing?"));
    assert!(!session.transcribing());
}
