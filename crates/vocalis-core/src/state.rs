//! Conversation state: the control-plane record of one run, and the handle loops share it through.
//!
//! Transcript and history only grow through [`ConversationState::commit`], which appends to
//! both, so they stay in 1:1 order. Once the status leaves `running` the record is frozen
//! until the next `begin` or `reset`.

use crate::backend::AnalysisResult;
use crate::config::RoleplayConfig;
use crate::error::{SimError, SimResult};
use crate::events::{EngineEvent, EventSink, Notice};
use crate::model::{AudioStatus, Mode, Speaker, Turn, TurnId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vocalis_voice::AudioPayload;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    /// AI-vs-AI round produced no usable line.
    Stalled,
    /// Completion signal seen.
    Terminated,
    /// Operator stop honored at a round boundary.
    Stopped,
    /// Generation failed in an autonomous round.
    Errored,
    /// Live training session ended.
    Ended,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Stalled => "stalled",
            RunStatus::Terminated => "terminated",
            RunStatus::Stopped => "stopped",
            RunStatus::Errored => "errored",
            RunStatus::Ended => "ended",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative run metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// History length after the last committed turn.
    pub total_messages: usize,
    /// Set once any round carries the completion signal; never cleared within a run.
    pub meeting_booked: bool,
    /// Wall-clock seconds since the run started (frozen when the run finishes).
    pub conversation_length_secs: f64,
    /// Sum of the durations of every attached audio payload.
    pub total_audio_secs: f64,
}

/// Outcome of applying a synthesis result to a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedAudio {
    pub speaker: Speaker,
    pub status: AudioStatus,
    pub duration_secs: Option<f64>,
}

/// The record of a single run.
#[derive(Debug, Clone)]
pub struct ConversationState {
    run_id: Uuid,
    mode: Mode,
    roleplay: Option<RoleplayConfig>,
    status: RunStatus,
    transcript: Vec<Turn>,
    history: Vec<String>,
    prompt_turn: Option<Turn>,
    next_speaker: Option<Speaker>,
    metrics: Metrics,
    notices: Vec<Notice>,
    analysis: Option<AnalysisResult>,
    persistence_offer: Option<String>,
    started_at: Option<Instant>,
}

impl ConversationState {
    pub fn new(mode: Mode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            roleplay: None,
            status: RunStatus::Idle,
            transcript: Vec::new(),
            history: Vec::new(),
            prompt_turn: None,
            next_speaker: None,
            metrics: Metrics::default(),
            notices: Vec::new(),
            analysis: None,
            persistence_offer: None,
            started_at: None,
        }
    }

    /// Discard the previous run and start a new one expecting `first` to speak.
    pub fn begin(&mut self, roleplay: RoleplayConfig, first: Speaker) -> Uuid {
        *self = Self::new(self.mode);
        self.roleplay = Some(roleplay);
        self.status = RunStatus::Running;
        self.next_speaker = Some(first);
        self.started_at = Some(Instant::now());
        self.run_id
    }

    /// Back to an empty idle record. Turn ids from the old run no longer resolve.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    /// Append a turn and its history entry together. Returns the history entry.
    pub fn commit(&mut self, turn: Turn) -> String {
        let entry = turn.history_entry(self.mode);
        self.transcript.push(turn);
        self.history.push(entry.clone());
        self.metrics.total_messages = self.history.len();
        self.refresh_elapsed();
        entry
    }

    /// Shown to the operator before the first real turn; not part of the transcript.
    pub fn set_prompt_turn(&mut self, turn: Turn) {
        self.prompt_turn = Some(turn);
    }

    /// Apply a synthesis outcome to a pending turn. `None` when the turn is unknown (the
    /// run was reset) or already settled.
    pub fn attach_synthesis(
        &mut self,
        turn_id: TurnId,
        result: Result<AudioPayload, String>,
    ) -> Option<AttachedAudio> {
        let turn = self
            .transcript
            .iter_mut()
            .find(|t| t.id == turn_id && t.audio_status == AudioStatus::Pending)?;
        let attached = match result {
            Ok(payload) => {
                let duration_secs = payload.duration_secs();
                turn.audio_status = AudioStatus::Ready;
                turn.audio = Some(payload);
                AttachedAudio {
                    speaker: turn.speaker,
                    status: AudioStatus::Ready,
                    duration_secs,
                }
            }
            Err(_) => {
                turn.audio_status = AudioStatus::Failed;
                turn.audio = None;
                AttachedAudio {
                    speaker: turn.speaker,
                    status: AudioStatus::Failed,
                    duration_secs: None,
                }
            }
        };
        if let Some(secs) = attached.duration_secs {
            self.metrics.total_audio_secs += secs;
        }
        Some(attached)
    }

    /// Leave `running`. Returns false if the run was not running (nothing changes).
    pub fn finish(&mut self, status: RunStatus) -> bool {
        if !self.status.is_running() || status.is_running() {
            return false;
        }
        self.refresh_elapsed();
        self.status = status;
        true
    }

    pub fn mark_meeting_booked(&mut self) {
        self.metrics.meeting_booked = true;
    }

    pub fn set_next_speaker(&mut self, speaker: Speaker) {
        self.next_speaker = Some(speaker);
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn set_analysis(&mut self, result: AnalysisResult) {
        self.analysis = Some(result);
    }

    pub fn offer_persistence(&mut self, default_name: String) {
        self.persistence_offer = Some(default_name);
    }

    fn refresh_elapsed(&mut self) {
        if let Some(started) = self.started_at {
            self.metrics.conversation_length_secs = started.elapsed().as_secs_f64();
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn roleplay(&self) -> Option<&RoleplayConfig> {
        self.roleplay.as_ref()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// History joined with newlines, the exact context sent to the backends.
    pub fn history_text(&self) -> String {
        self.history.join("\n")
    }

    pub fn prompt_turn(&self) -> Option<&Turn> {
        self.prompt_turn.as_ref()
    }

    pub fn next_speaker(&self) -> Option<Speaker> {
        self.next_speaker
    }

    /// Metrics with the elapsed time brought up to date while running.
    pub fn metrics(&self) -> Metrics {
        let mut metrics = self.metrics.clone();
        if let (true, Some(started)) = (self.status.is_running(), self.started_at) {
            metrics.conversation_length_secs = started.elapsed().as_secs_f64();
        }
        metrics
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Suggested session name once a finished run has been offered for saving.
    pub fn persistence_offer(&self) -> Option<&str> {
        self.persistence_offer.as_deref()
    }
}

/// Shared handle to the state of one loop instance.
pub type SharedState = Arc<RwLock<ConversationState>>;

/// What a loop and its background synthesis tasks share: the state, the event sink,
/// a status watch for waiters and the handles of in-flight synthesis.
#[derive(Clone)]
pub(crate) struct RunContext {
    pub(crate) state: SharedState,
    pub(crate) events: EventSink,
    status: Arc<watch::Sender<RunStatus>>,
    audio_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RunContext {
    pub(crate) fn new(mode: Mode, events: EventSink) -> Self {
        let (status, _) = watch::channel(RunStatus::Idle);
        Self {
            state: Arc::new(RwLock::new(ConversationState::new(mode))),
            events,
            status: Arc::new(status),
            audio_tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start a new run under the write lock. Rejected while another run is running.
    pub(crate) async fn begin(&self, roleplay: RoleplayConfig, first: Speaker) -> SimResult<Uuid> {
        let run_id = {
            let mut state = self.state.write().await;
            if state.status().is_running() {
                return Err(SimError::RunActive);
            }
            state.begin(roleplay, first)
        };
        self.status.send_replace(RunStatus::Running);
        self.events.emit(EngineEvent::StatusChanged {
            run_id,
            status: RunStatus::Running,
        });
        Ok(run_id)
    }

    /// Clear the record back to idle.
    pub(crate) async fn reset(&self) {
        let run_id = {
            let mut state = self.state.write().await;
            state.reset();
            state.run_id()
        };
        self.status.send_replace(RunStatus::Idle);
        self.events.emit(EngineEvent::StatusChanged {
            run_id,
            status: RunStatus::Idle,
        });
    }

    /// Wait until the current run (if any) is no longer running.
    pub(crate) async fn wait_finished(&self) -> RunStatus {
        let mut rx = self.status.subscribe();
        let settled = rx.wait_for(|s| !s.is_running()).await.map(|s| *s);
        match settled {
            Ok(status) => status,
            Err(_) => self.state.read().await.status(),
        }
    }

    /// Record a notice on the state and publish it.
    pub(crate) async fn notify(&self, notice: Notice) {
        let run_id = {
            let mut state = self.state.write().await;
            state.push_notice(notice.clone());
            state.run_id()
        };
        match notice.level {
            crate::events::NoticeLevel::Info => info!(title = %notice.title, "{}", notice.message),
            _ => warn!(title = %notice.title, "{}", notice.message),
        }
        self.events.emit(EngineEvent::Notice { run_id, notice });
    }

    /// Finish the run with `status`, publishing the change. No-op unless running.
    ///
    /// With `offer` set and a non-empty transcript, a persistence offer is recorded in the
    /// same state update, so anyone woken by the status change already sees it.
    pub(crate) async fn finish(&self, status: RunStatus, offer: bool) -> bool {
        let (changed, run_id, offered) = {
            let mut state = self.state.write().await;
            let changed = state.finish(status);
            let offered = if changed && offer && !state.transcript().is_empty() {
                let name = state.mode().default_session_name();
                state.offer_persistence(name.clone());
                Some(name)
            } else {
                None
            };
            (changed, state.run_id(), offered)
        };
        if changed {
            info!(run_id = %run_id, status = %status, "run finished");
            self.events.emit(EngineEvent::StatusChanged { run_id, status });
            if let Some(default_name) = offered {
                self.events.emit(EngineEvent::PersistenceOffered {
                    run_id,
                    default_name,
                });
            }
            self.status.send_replace(status);
        }
        changed
    }

    /// Commit a turn and publish it.
    pub(crate) async fn commit(&self, turn: Turn) {
        let run_id = {
            let mut state = self.state.write().await;
            state.commit(turn.clone());
            state.run_id()
        };
        debug!(run_id = %run_id, turn_id = %turn.id, speaker = ?turn.speaker, "turn committed");
        self.events.emit(EngineEvent::TurnAdded { run_id, turn });
    }

    /// Apply a synthesis result by turn id; publishes audio events and a failure notice.
    pub(crate) async fn apply_synthesis(&self, turn_id: TurnId, result: Result<AudioPayload, String>) {
        let error = result.as_ref().err().cloned();
        let (attached, run_id) = {
            let mut state = self.state.write().await;
            (state.attach_synthesis(turn_id, result), state.run_id())
        };
        let Some(attached) = attached else {
            debug!(turn_id = %turn_id, "synthesis result for a discarded turn ignored");
            return;
        };
        match attached.status {
            AudioStatus::Ready => {
                self.events.emit(EngineEvent::AudioReady {
                    run_id,
                    turn_id,
                    duration_secs: attached.duration_secs,
                });
            }
            _ => {
                warn!(turn_id = %turn_id, error = ?error, "speech synthesis failed");
                self.events.emit(EngineEvent::AudioFailed { run_id, turn_id });
                self.notify(Notice::warning(
                    "Audio Generation Failed",
                    format!("Audio generation failed for the {}.", attached.speaker.describe()),
                ))
                .await;
            }
        }
    }

    /// Record a suggested session name and publish the offer.
    pub(crate) async fn offer_persistence(&self) {
        let (run_id, name) = {
            let mut state = self.state.write().await;
            let name = state.mode().default_session_name();
            state.offer_persistence(name.clone());
            (state.run_id(), name)
        };
        self.events.emit(EngineEvent::PersistenceOffered {
            run_id,
            default_name: name,
        });
    }

    pub(crate) fn track_audio(&self, handle: JoinHandle<()>) {
        match self.audio_tasks.lock() {
            Ok(mut tasks) => {
                tasks.retain(|t| !t.is_finished());
                tasks.push(handle);
            }
            Err(_) => warn!("audio task list poisoned; synthesis will not be awaited"),
        }
    }

    /// Wait until every synthesis started so far has been applied.
    pub(crate) async fn settle_audio(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = match self.audio_tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(_) => Vec::new(),
            };
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                let _ = handle.await;
            }
        }
    }

    pub(crate) async fn snapshot(&self) -> ConversationState {
        self.state.read().await.clone()
    }
}
