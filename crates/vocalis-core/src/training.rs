//! Live training: a human plays the sales agent, the model plays the consumer.
//!
//! Every submission is one round: commit the human line, ask the executor for the
//! consumer's reply. Rounds are serialized by a round lock; `end` takes the same lock,
//! so a session never ends underneath an in-flight round. While a recording is being
//! transcribed the input gate is held and typed submissions are rejected. Ending scores
//! the session with the analysis backend and offers it for saving.

use crate::backend::{AnalysisBackend, AnalysisRequest, AnalysisResult};
use crate::config::RoleplayConfig;
use crate::error::{SimError, SimResult};
use crate::events::{EngineEvent, EventSink, Notice};
use crate::executor::{RoundRequest, TurnExecutor};
use crate::model::{Mode, Speaker, Turn};
use crate::prompts::TRAINING_SEED_TEXT;
use crate::session::{Session, SessionRepository};
use crate::state::{ConversationState, RunContext, RunStatus, SharedState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};
use uuid::Uuid;

const TRAINING_ROLES: &[Speaker] = &[Speaker::ConsumerAgent];

/// Analysis needs at least one exchanged pair.
const MIN_HISTORY_FOR_ANALYSIS: usize = 2;

/// Query for the consumer's reply to the trainee.
pub fn reply_query(human_text: &str, history: &str) -> String {
    format!(
        "The user (sales agent) said: \"{}\". The conversation history is:\n{}\n\nIt is now the Consumer Agent's turn to respond.",
        human_text, history
    )
}

/// Result of a human submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The consumer answered; `ended` is set when the answer closed the session.
    Replied { ended: Option<TrainingEnd> },
    /// The backend answered with no consumer line. The session keeps running.
    NoReply,
    /// The generation call failed. The human line is kept; the trainee may submit again.
    GenerationFailed,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEnd {
    /// Too little conversation to score; the session was reset.
    Skipped,
    /// Analysis ran. `None` if the analysis call failed.
    Analyzed(Option<AnalysisResult>),
}

/// Held while a recording is transcribed; typed input is rejected until it drops.
pub(crate) struct InputGate<'a>(&'a AtomicBool);

impl Drop for InputGate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to one live training session.
pub struct TrainingSession {
    executor: Arc<TurnExecutor>,
    analyzer: Arc<dyn AnalysisBackend>,
    ctx: RunContext,
    round: Mutex<()>,
    input_held: AtomicBool,
    sessions: Option<Arc<dyn SessionRepository>>,
}

impl TrainingSession {
    /// Create a session and the event receiver for its front end.
    pub fn new(
        executor: TurnExecutor,
        analyzer: Arc<dyn AnalysisBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = EventSink::channel();
        (Self::with_events(executor, analyzer, events), rx)
    }

    pub fn with_events(
        executor: TurnExecutor,
        analyzer: Arc<dyn AnalysisBackend>,
        events: EventSink,
    ) -> Self {
        Self {
            executor: Arc::new(executor),
            analyzer,
            ctx: RunContext::new(Mode::LiveTraining, events),
            round: Mutex::new(()),
            input_held: AtomicBool::new(false),
            sessions: None,
        }
    }

    /// Inject the repository used by [`TrainingSession::save_session`].
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.ctx.state)
    }

    pub async fn snapshot(&self) -> ConversationState {
        self.ctx.snapshot().await
    }

    /// Start a session with the trainee expected to speak first.
    pub async fn start(&self, roleplay: RoleplayConfig) -> SimResult<Uuid> {
        roleplay.validate()?;
        let _round = self.round.lock().await;
        let run_id = self.ctx.begin(roleplay, Speaker::Human).await?;
        let prompt = Turn::unvoiced(Speaker::ConsumerAgent, TRAINING_SEED_TEXT);
        self.ctx.state.write().await.set_prompt_turn(prompt.clone());
        self.ctx.events.emit(EngineEvent::TurnAdded { run_id, turn: prompt });
        info!(run_id = %run_id, "🎓 Training session started");
        Ok(run_id)
    }

    pub async fn is_running(&self) -> bool {
        self.ctx.state.read().await.status().is_running()
    }

    /// A submission (or session end) is being processed.
    pub fn round_in_flight(&self) -> bool {
        self.round.try_lock().is_err()
    }

    /// A recording is being transcribed.
    pub fn transcribing(&self) -> bool {
        self.input_held.load(Ordering::SeqCst)
    }

    /// True when a submission would be accepted right now.
    pub async fn accepts_input(&self) -> bool {
        !self.round_in_flight() && !self.transcribing() && self.is_running().await
    }

    /// Claim the input gate for a transcription. `None` if another one holds it.
    pub(crate) fn hold_input(&self) -> Option<InputGate<'_>> {
        self.input_held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InputGate(&self.input_held))
    }

    /// Submit the trainee's line and get the consumer's reply.
    ///
    /// Caller errors: blank text, no running session, or a round or transcription
    /// already in flight. Backend failures are reported through notices and the
    /// returned outcome.
    pub async fn submit(&self, text: &str) -> SimResult<SubmitOutcome> {
        self.submit_line(text, false).await
    }

    /// Submit a transcript while the caller holds the input gate.
    pub(crate) async fn submit_transcript(
        &self,
        _gate: &InputGate<'_>,
        text: &str,
    ) -> SimResult<SubmitOutcome> {
        self.submit_line(text, true).await
    }

    async fn submit_line(&self, text: &str, transcribed: bool) -> SimResult<SubmitOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::InvalidInput("message is empty".to_string()));
        }
        let _round = self.round.try_lock().map_err(|_| SimError::RoundInFlight)?;
        if !transcribed && self.transcribing() {
            return Err(SimError::RoundInFlight);
        }

        let roleplay = {
            let state = self.ctx.state.read().await;
            if !state.status().is_running() {
                return Err(SimError::NotRunning);
            }
            state.roleplay().cloned().ok_or(SimError::NotRunning)?
        };

        self.ctx.commit(Turn::human(text)).await;
        let history = {
            let mut state = self.ctx.state.write().await;
            state.set_next_speaker(Speaker::ConsumerAgent);
            state.history_text()
        };

        let round = self
            .executor
            .execute(
                &self.ctx,
                RoundRequest {
                    roleplay: &roleplay,
                    query: reply_query(text, &history),
                    expected: Speaker::ConsumerAgent,
                    accept: TRAINING_ROLES,
                },
            )
            .await;

        let round = match round {
            Ok(round) => round,
            Err(e) => {
                error!(error = %e, "training round failed");
                self.ctx
                    .notify(Notice::error(
                        "AI Turn Failed",
                        format!("{} You can send your message again.", e),
                    ))
                    .await;
                return Ok(SubmitOutcome::GenerationFailed);
            }
        };

        if round.is_empty() {
            self.ctx
                .notify(Notice::warning(
                    "Conversation Update",
                    "The AI did not respond. You can continue the conversation.",
                ))
                .await;
            return Ok(SubmitOutcome::NoReply);
        }

        self.ctx.state.write().await.set_next_speaker(Speaker::Human);
        if round.is_complete() {
            self.ctx.state.write().await.mark_meeting_booked();
            let ended = self.end_locked().await?;
            return Ok(SubmitOutcome::Replied { ended: Some(ended) });
        }
        Ok(SubmitOutcome::Replied { ended: None })
    }

    /// End the session. Waits for an in-flight round to resolve first.
    pub async fn end(&self) -> SimResult<TrainingEnd> {
        let _round = self.round.lock().await;
        self.end_locked().await
    }

    async fn end_locked(&self) -> SimResult<TrainingEnd> {
        if !self.ctx.finish(RunStatus::Ended, false).await {
            return Err(SimError::NotRunning);
        }

        let (history_len, transcript, sales_prompt) = {
            let state = self.ctx.state.read().await;
            (
                state.history().len(),
                state.history_text(),
                state
                    .roleplay()
                    .map(|r| r.sales_prompt.clone())
                    .unwrap_or_default(),
            )
        };

        if history_len < MIN_HISTORY_FOR_ANALYSIS {
            self.ctx
                .notify(Notice::info(
                    "Analysis Skipped",
                    "The conversation was too short to analyze.",
                ))
                .await;
            self.ctx.reset().await;
            return Ok(TrainingEnd::Skipped);
        }

        self.ctx
            .notify(Notice::info("Session Ended", "Analyzing your performance..."))
            .await;
        let analysis = match self
            .analyzer
            .analyze(&AnalysisRequest {
                transcript,
                sales_prompt,
            })
            .await
        {
            Ok(result) => {
                let result = result.clamped();
                let run_id = {
                    let mut state = self.ctx.state.write().await;
                    state.set_analysis(result.clone());
                    state.run_id()
                };
                info!(score = result.overall_score, "📊 Performance analysis ready");
                self.ctx.events.emit(EngineEvent::AnalysisReady {
                    run_id,
                    result: result.clone(),
                });
                Some(result)
            }
            Err(e) => {
                error!(error = %e, "performance analysis failed");
                self.ctx
                    .notify(Notice::error(
                        "Analysis Failed",
                        format!("Could not analyze the session: {}", e),
                    ))
                    .await;
                None
            }
        };

        self.ctx.offer_persistence().await;
        Ok(TrainingEnd::Analyzed(analysis))
    }

    /// Drop the current session (whatever its status) and return to `idle`.
    pub async fn reset(&self) {
        let _round = self.round.lock().await;
        self.ctx.reset().await;
        info!("🔄 Training session reset");
    }

    /// Wait for all synthesis started so far to land on its turns.
    pub async fn wait_for_audio(&self) {
        self.ctx.settle_audio().await;
    }

    /// Persist the ended session. Waits for in-flight synthesis so audio is included.
    pub async fn save_session(&self, name: Option<String>) -> SimResult<Session> {
        let sessions = self
            .sessions
            .as_ref()
            .ok_or_else(|| SimError::Persistence("no session store configured".to_string()))?;
        self.ctx.settle_audio().await;
        let session = Session::from_state(&self.ctx.snapshot().await, name)?;
        sessions.create(&session)?;
        Ok(session)
    }

    pub(crate) async fn notify(&self, notice: Notice) {
        self.ctx.notify(notice).await;
    }
}
