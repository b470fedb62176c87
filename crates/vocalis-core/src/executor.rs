//! Turn executor: one generation call, committed line by line, with speech synthesis
//! started in the background for every line that has something to say.
//!
//! Per line (sales first, then consumer): tone split → commit turn and history entry →
//! spawn synthesis. The loop that called us never waits for audio.

use crate::backend::{GenerationBackend, GenerationRequest};
use crate::config::RoleplayConfig;
use crate::error::{SimError, SimResult};
use crate::model::{Speaker, Turn, TurnId};
use crate::state::RunContext;
use crate::termination;
use std::sync::Arc;
use tracing::{debug, info};
use vocalis_voice::{SpeechRequest, SynthesisBackend};

/// One round's input.
#[derive(Debug, Clone)]
pub struct RoundRequest<'a> {
    pub roleplay: &'a RoleplayConfig,
    pub query: String,
    /// Whose turn it logically is (for logging; the query framing carries it to the model).
    pub expected: Speaker,
    /// Roles whose lines are accepted from the response.
    pub accept: &'a [Speaker],
}

/// A line committed during a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedLine {
    pub speaker: Speaker,
    pub turn_id: TurnId,
    pub raw_text: String,
}

/// What a round committed, in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub lines: Vec<CommittedLine>,
}

impl RoundOutcome {
    /// No usable line from either role.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn raw_line(&self, speaker: Speaker) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.speaker == speaker)
            .map(|l| l.raw_text.as_str())
    }

    /// Completion signal in any of this round's raw lines.
    pub fn is_complete(&self) -> bool {
        termination::is_complete(
            self.raw_line(Speaker::SalesAgent),
            self.raw_line(Speaker::ConsumerAgent),
        )
    }

    /// Who speaks next. When both roles answered, the consumer line (committed last) wins.
    pub fn next_speaker(&self) -> Option<Speaker> {
        self.lines.last().map(|l| l.speaker.counterpart())
    }
}

/// Runs single generation rounds against a shared state.
pub struct TurnExecutor {
    generation: Arc<dyn GenerationBackend>,
    synthesis: Arc<dyn SynthesisBackend>,
}

impl TurnExecutor {
    pub fn new(generation: Arc<dyn GenerationBackend>, synthesis: Arc<dyn SynthesisBackend>) -> Self {
        Self {
            generation,
            synthesis,
        }
    }

    /// Call the generation backend once and commit every accepted non-empty line.
    ///
    /// A failed call returns [`SimError::Generation`] without touching the transcript.
    pub(crate) async fn execute(
        &self,
        ctx: &RunContext,
        request: RoundRequest<'_>,
    ) -> SimResult<RoundOutcome> {
        let generation_request = GenerationRequest {
            sales_prompt: request.roleplay.sales_prompt.clone(),
            consumer_prompt: request.roleplay.consumer_prompt.clone(),
            knowledge_url: request.roleplay.knowledge().map(str::to_string),
            query: request.query,
        };
        debug!(expected = ?request.expected, "generation round started");

        let response = self
            .generation
            .generate(&generation_request)
            .await
            .map_err(|e| match e {
                SimError::Generation(msg) => SimError::Generation(msg),
                other => SimError::Generation(other.to_string()),
            })?;

        let mut outcome = RoundOutcome::default();
        let candidates = [
            (Speaker::SalesAgent, response.sales_line()),
            (Speaker::ConsumerAgent, response.consumer_line()),
        ];
        for (speaker, line) in candidates {
            let Some(raw) = line else { continue };
            if !request.accept.contains(&speaker) {
                debug!(speaker = ?speaker, "line for a role not taking part ignored");
                continue;
            }
            let turn = Turn::generated(speaker, raw);
            let turn_id = turn.id;
            let speech = match (turn.wants_audio(), speaker.voice_role()) {
                (true, Some(role)) => Some(SpeechRequest {
                    text: turn.text.clone(),
                    role,
                    tone: turn.tone.clone(),
                }),
                _ => None,
            };
            info!(speaker = ?speaker, tone = ?turn.tone, "💬 {}", turn.text);

            // History first: the synthesis call may only start once the line is visible.
            ctx.commit(turn).await;
            if let Some(speech) = speech {
                self.spawn_synthesis(ctx, turn_id, speech);
            }
            outcome.lines.push(CommittedLine {
                speaker,
                turn_id,
                raw_text: raw.to_string(),
            });
        }
        Ok(outcome)
    }

    fn spawn_synthesis(&self, ctx: &RunContext, turn_id: TurnId, speech: SpeechRequest) {
        let synthesis = Arc::clone(&self.synthesis);
        let task_ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            let result = synthesis
                .synthesize(&speech)
                .await
                .map_err(|e| e.to_string());
            task_ctx.apply_synthesis(turn_id, result).await;
        });
        ctx.track_audio(handle);
    }
}
