//! AI-vs-AI conversation loop.
//!
//! ```text
//! idle ──start──▶ running ─┬─ completion signal ──▶ terminated
//!                  ▲   │   ├─ no usable line ─────▶ stalled
//!                  └───┘   ├─ generation failure ─▶ errored
//!            pacing delay  └─ stop request ───────▶ stopped  (checked before each round)
//! ```
//!
//! Each round is one [`TurnExecutor`] call. The loop runs as a tokio task; the
//! [`Simulation`] handle starts, stops, resets and saves it.

use crate::config::{RoleplayConfig, SimulatorConfig};
use crate::error::{SimError, SimResult};
use crate::events::{EngineEvent, EventSink, Notice};
use crate::executor::{RoundRequest, TurnExecutor};
use crate::model::{Mode, Speaker};
use crate::session::{Session, SessionRepository};
use crate::state::{ConversationState, RunContext, RunStatus, SharedState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

const AI_VS_AI_ROLES: &[Speaker] = &[Speaker::SalesAgent, Speaker::ConsumerAgent];

/// Loop settings.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Pause between rounds (default: 1s).
    pub pacing_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&SimulatorConfig> for SimulationConfig {
    fn from(config: &SimulatorConfig) -> Self {
        Self {
            pacing_delay: config.pacing_delay(),
        }
    }
}

/// Query for every round after the first.
pub fn continue_query(history: &str, next: Speaker) -> String {
    format!(
        "Continue the conversation. The history is:\n{}\n\nIt is now the {}'s turn.",
        history,
        Mode::AiVsAi.label(next)
    )
}

/// Handle to one AI-vs-AI session. At most one run is active at a time.
pub struct Simulation {
    executor: Arc<TurnExecutor>,
    ctx: RunContext,
    config: SimulationConfig,
    sessions: Option<Arc<dyn SessionRepository>>,
    stop_flag: Mutex<Option<Arc<AtomicBool>>>,
}

impl Simulation {
    /// Create a simulation and the event receiver for its front end.
    pub fn new(
        executor: TurnExecutor,
        config: SimulationConfig,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = EventSink::channel();
        (Self::with_events(executor, config, events), rx)
    }

    /// Create with an explicit sink (e.g. [`EventSink::disabled`]).
    pub fn with_events(executor: TurnExecutor, config: SimulationConfig, events: EventSink) -> Self {
        Self {
            executor: Arc::new(executor),
            ctx: RunContext::new(Mode::AiVsAi, events),
            config,
            sessions: None,
            stop_flag: Mutex::new(None),
        }
    }

    /// Inject the repository used by [`Simulation::save_session`].
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Read handle for rendering.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.ctx.state)
    }

    pub async fn snapshot(&self) -> ConversationState {
        self.ctx.snapshot().await
    }

    /// Start a run in the background. Rejected with [`SimError::RunActive`] while one is running.
    pub async fn start(&self, roleplay: RoleplayConfig) -> SimResult<Uuid> {
        roleplay.validate()?;
        let run_id = self.ctx.begin(roleplay.clone(), Speaker::SalesAgent).await?;
        let stop = Arc::new(AtomicBool::new(false));
        match self.stop_flag.lock() {
            Ok(mut slot) => *slot = Some(Arc::clone(&stop)),
            Err(_) => warn!("stop flag slot poisoned; stop requests for this run are ignored"),
        }
        info!(run_id = %run_id, "🚀 Simulation started");

        tokio::spawn(drive(
            Arc::clone(&self.executor),
            self.ctx.clone(),
            roleplay,
            self.config.pacing_delay,
            stop,
        ));
        Ok(run_id)
    }

    /// Ask the running loop to stop before its next round. Returns false if no run is
    /// active or a stop is already pending.
    pub fn stop(&self) -> bool {
        let flag = self.stop_flag.lock().ok().and_then(|slot| slot.clone());
        match flag {
            Some(flag) if !flag.swap(true, Ordering::SeqCst) => {
                info!("🛑 Stop requested");
                true
            }
            _ => false,
        }
    }

    /// Wait for the current run to leave `running`.
    pub async fn join(&self) -> RunStatus {
        self.ctx.wait_finished().await
    }

    /// Start and wait for the run to finish.
    pub async fn run(&self, roleplay: RoleplayConfig) -> SimResult<RunStatus> {
        self.start(roleplay).await?;
        Ok(self.join().await)
    }

    /// Wait for all synthesis started so far to land on its turns.
    pub async fn wait_for_audio(&self) {
        self.ctx.settle_audio().await;
    }

    /// Stop any active run, then clear transcript, history and metrics back to `idle`.
    pub async fn reset(&self) {
        self.stop();
        self.join().await;
        self.ctx.reset().await;
        info!("🔄 Simulation reset");
    }

    /// Persist the finished run. Waits for in-flight synthesis so audio is included.
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
}

async fn drive(
    executor: Arc<TurnExecutor>,
    ctx: RunContext,
    roleplay: RoleplayConfig,
    pacing: Duration,
    stop: Arc<AtomicBool>,
) -> RunStatus {
    let mut query = roleplay.query.clone();
    let status = loop {
        if stop.load(Ordering::SeqCst) {
            break RunStatus::Stopped;
        }

        let expected = ctx
            .state
            .read()
            .await
            .next_speaker()
            .unwrap_or(Speaker::SalesAgent);
        let round = executor
            .execute(
                &ctx,
                RoundRequest {
                    roleplay: &roleplay,
                    query,
                    expected,
                    accept: AI_VS_AI_ROLES,
                },
            )
            .await;

        let round = match round {
            Ok(round) => round,
            Err(e) => {
                error!(error = %e, "simulation round failed");
                ctx.notify(Notice::error("Simulation Turn Failed", e.to_string()))
                    .await;
                break RunStatus::Errored;
            }
        };

        if round.is_complete() {
            ctx.state.write().await.mark_meeting_booked();
            ctx.notify(Notice::info(
                "Simulation Complete",
                "The conversation has concluded.",
            ))
            .await;
            break RunStatus::Terminated;
        }

        let Some(next) = round.next_speaker() else {
            ctx.notify(Notice::warning(
                "Simulation Stall",
                "The AI did not produce a response. Stopping the simulation.",
            ))
            .await;
            break RunStatus::Stalled;
        };

        let history = {
            let mut state = ctx.state.write().await;
            state.set_next_speaker(next);
            state.history_text()
        };
        tokio::time::sleep(pacing).await;
        query = continue_query(&history, next);
    };

    // Closed runs report later stop requests as no-ops.
    stop.store(true, Ordering::SeqCst);
    let offer = matches!(status, RunStatus::Terminated | RunStatus::Stopped);
    ctx.finish(status, offer).await;
    status
}
