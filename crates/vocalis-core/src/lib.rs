//! # Vocalis Core
//!
//! Turn-taking engine for the Vocalis sales-training simulator.
//!
//! ```text
//!                      ┌──────────────────────┐
//!  RoleplayConfig ───▶ │  Simulation (AI/AI)  │──┐
//!                      └──────────────────────┘  │    ┌──────────────┐   GenerationBackend
//!                      ┌──────────────────────┐  ├──▶ │ TurnExecutor │──▶ SynthesisBackend (background)
//!  human text ───────▶ │  TrainingSession     │──┘    └──────────────┘
//!       ▲              └──────────┬───────────┘
//!       │                         └──▶ AnalysisBackend (on end)
//!  RecordingBridge (capture → TranscriptionBackend)
//! ```
//!
//! Both loops publish [`EngineEvent`]s and share their [`ConversationState`] through a
//! read handle; finished runs are saved through an injected [`SessionRepository`].

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod executor;
pub mod model;
pub mod openrouter;
pub mod prompts;
pub mod recording;
pub mod session;
pub mod state;
pub mod termination;
pub mod tone;
pub mod training;

pub use backend::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, GenerationBackend, GenerationRequest,
    GenerationResponse, KnowledgeSource, PlaceholderAnalysis, PlaceholderGeneration,
    PlaceholderKnowledge,
};
pub use config::{RoleplayConfig, SimulatorConfig};
pub use conversation::{continue_query, Simulation, SimulationConfig};
pub use error::{SimError, SimResult};
pub use events::{EngineEvent, EventSink, Notice, NoticeLevel};
pub use executor::{CommittedLine, RoundOutcome, RoundRequest, TurnExecutor};
pub use model::{AudioStatus, Mode, Speaker, Turn, TurnId};
pub use openrouter::ChatBridge;
pub use recording::{RecordingBridge, RecordingOutcome};
pub use session::{InMemorySessionStore, Session, SessionRepository, SledSessionStore};
pub use state::{ConversationState, Metrics, RunStatus, SharedState};
pub use termination::{is_complete, COMPLETION_SIGNAL};
pub use tone::{extract_tone, normalize_line, NormalizedLine};
pub use training::{reply_query, SubmitOutcome, TrainingEnd, TrainingSession};

use std::sync::Arc;

/// Generation and analysis backends from config: the chat bridge when an API key is
/// configured, otherwise the placeholders.
pub fn create_best_backends(
    config: &SimulatorConfig,
) -> (Arc<dyn GenerationBackend>, Arc<dyn AnalysisBackend>) {
    match ChatBridge::from_config(config) {
        Ok(Some(bridge)) => {
            let bridge = Arc::new(bridge.with_knowledge(Arc::new(PlaceholderKnowledge)));
            tracing::info!(model = bridge.model(), "🧠 Using chat backend");
            let generation: Arc<dyn GenerationBackend> = bridge.clone();
            let analysis: Arc<dyn AnalysisBackend> = bridge;
            (generation, analysis)
        }
        Ok(None) => {
            tracing::warn!("No LLM API key configured; using placeholder generation and analysis");
            placeholder_backends()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Chat backend unavailable; using placeholder generation and analysis");
            placeholder_backends()
        }
    }
}

fn placeholder_backends() -> (Arc<dyn GenerationBackend>, Arc<dyn AnalysisBackend>) {
    let generation: Arc<dyn GenerationBackend> = Arc::new(PlaceholderGeneration::new());
    let analysis: Arc<dyn AnalysisBackend> = Arc::new(PlaceholderAnalysis);
    (generation, analysis)
}
