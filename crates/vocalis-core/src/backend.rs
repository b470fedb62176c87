//! Backend seams consumed by the loops: generation, performance analysis, knowledge lookup.
//!
//! Implement these for a hosted model (see [`crate::openrouter::ChatBridge`]) or use the
//! placeholders to drive the loops offline.

use crate::error::SimResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub sales_prompt: String,
    pub consumer_prompt: String,
    pub knowledge_url: Option<String>,
    /// Query framing: opening task, or history plus whose turn it is.
    pub query: String,
}

/// Lines for the next step. An empty string means "not this role's turn".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    #[serde(default)]
    pub sales_agent_response: String,
    #[serde(default)]
    pub consumer_agent_response: String,
}

impl GenerationResponse {
    pub fn sales(line: impl Into<String>) -> Self {
        Self {
            sales_agent_response: line.into(),
            ..Default::default()
        }
    }

    pub fn consumer(line: impl Into<String>) -> Self {
        Self {
            consumer_agent_response: line.into(),
            ..Default::default()
        }
    }

    /// Sales line, if non-blank.
    pub fn sales_line(&self) -> Option<&str> {
        non_blank(&self.sales_agent_response)
    }

    /// Consumer line, if non-blank.
    pub fn consumer_line(&self) -> Option<&str> {
        non_blank(&self.consumer_agent_response)
    }
}

fn non_blank(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

/// Produces the next line(s) of the role-play.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> SimResult<GenerationResponse>;
}

/// Input for scoring a training session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Plain-text history joined with newlines.
    pub transcript: String,
    /// The sales persona / objectives the trainee was measured against.
    pub sales_prompt: String,
}

/// Coach's verdict on a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 0–100.
    pub overall_score: f64,
    /// Markdown.
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
}

impl AnalysisResult {
    /// Clamp the score into 0–100 (non-finite scores become 0).
    pub fn clamped(mut self) -> Self {
        self.overall_score = if self.overall_score.is_finite() {
            self.overall_score.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self
    }
}

/// Scores a finished training transcript.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> SimResult<AnalysisResult>;
}

/// External knowledge: query string → relevant snippet.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn lookup(&self, source_url: &str, query: &str) -> SimResult<String>;
}

/// Stub knowledge source; no retrieval is performed.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderKnowledge;

#[async_trait]
impl KnowledgeSource for PlaceholderKnowledge {
    async fn lookup(&self, source_url: &str, query: &str) -> SimResult<String> {
        tracing::debug!(source_url, "knowledge lookup (placeholder)");
        Ok(format!(
            "PLACEHOLDER: Relevant knowledge for {} from external source.",
            query
        ))
    }
}

const PLACEHOLDER_SALES_LINES: &[&str] = &[
    "*confident* Hi Sarah, this is Alex from Cleverly. Do you have a minute to talk about your outbound pipeline?",
    "*professional* We usually add 15 to 20 qualified meetings a month for SaaS teams your size. Would a short pilot be worth a look?",
    "*friendly* Perfect, I'll send over an invite for Tuesday at 10. Talk soon! TERMINATE",
];

const PLACEHOLDER_CONSUMER_LINES: &[&str] = &[
    "*skeptical* I've got a minute. Our SDRs already live in Sales Navigator, so what's different?",
    "*curious* A pilot with clear numbers could work. Let's set up a meeting.",
    "*interested* Send me the details and we can take it from there.",
];

/// Scripted generation backend for running the loops without a model API.
///
/// Answers for the consumer when the query says it is the consumer's turn, otherwise
/// for the sales agent, walking through a short canned exchange that ends in a booking.
#[derive(Debug, Default)]
pub struct PlaceholderGeneration {
    sales_step: AtomicUsize,
    consumer_step: AtomicUsize,
}

impl PlaceholderGeneration {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_line(lines: &'static [&'static str], step: &AtomicUsize) -> &'static str {
    let i = step.fetch_add(1, Ordering::SeqCst).min(lines.len() - 1);
    lines[i]
}

#[async_trait]
impl GenerationBackend for PlaceholderGeneration {
    async fn generate(&self, request: &GenerationRequest) -> SimResult<GenerationResponse> {
        if request.query.contains("Consumer Agent's turn") {
            Ok(GenerationResponse::consumer(next_line(
                PLACEHOLDER_CONSUMER_LINES,
                &self.consumer_step,
            )))
        } else {
            Ok(GenerationResponse::sales(next_line(
                PLACEHOLDER_SALES_LINES,
                &self.sales_step,
            )))
        }
    }
}

/// Fixed analysis for offline runs.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderAnalysis;

#[async_trait]
impl AnalysisBackend for PlaceholderAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> SimResult<AnalysisResult> {
        let lines = request.transcript.lines().count();
        Ok(AnalysisResult {
            overall_score: 50.0,
            feedback: format!(
                "**Placeholder review.** {} lines were exchanged. Configure an LLM API key for a real assessment.",
                lines
            ),
            strengths: vec!["Kept the conversation going".to_string()],
            areas_for_improvement: vec!["Connect a model backend for detailed coaching".to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_lines_ignore_blank_fields() {
        let r: GenerationResponse =
            serde_json::from_str(r#"{"salesAgentResponse":"  ","consumerAgentResponse":"*curious* Go on."}"#)
                .unwrap();
        assert_eq!(r.sales_line(), None);
        assert_eq!(r.consumer_line(), Some("*curious* Go on."));

        let r: GenerationResponse = serde_json::from_str(r#"{"salesAgentResponse":"Hi"}"#).unwrap();
        assert_eq!(r.sales_line(), Some("Hi"));
        assert_eq!(r.consumer_line(), None);
    }

    #[test]
    fn analysis_score_is_clamped() {
        let parsed: AnalysisResult = serde_json::from_str(
            r#"{"overallScore":130,"feedback":"ok","strengths":["a"],"areasForImprovement":[]}"#,
        )
        .unwrap();
        assert_eq!(parsed.clamped().overall_score, 100.0);

        let negative = AnalysisResult {
            overall_score: -4.0,
            feedback: String::new(),
            strengths: vec![],
            areas_for_improvement: vec![],
        };
        assert_eq!(negative.clamped().overall_score, 0.0);
    }

    #[tokio::test]
    async fn placeholder_generation_follows_turn_framing() {
        let gen = PlaceholderGeneration::new();
        let mut req = GenerationRequest {
            sales_prompt: String::new(),
            consumer_prompt: String::new(),
            knowledge_url: None,
            query: "The sales agent AI should start the conversation.".to_string(),
        };
        let first = gen.generate(&req).await.unwrap();
        assert!(first.sales_line().is_some() && first.consumer_line().is_none());

        req.query = "Continue the conversation. ... It is now the Consumer Agent's turn.".to_string();
        let second = gen.generate(&req).await.unwrap();
        assert!(second.consumer_line().is_some() && second.sales_line().is_none());
    }

    #[tokio::test]
    async fn placeholder_knowledge_echoes_query() {
        let snippet = PlaceholderKnowledge
            .lookup("https://kb.example.com", "pricing")
            .await
            .unwrap();
        assert_eq!(snippet, "PLACEHOLDER: Relevant knowledge for pricing from external source.");
    }
}
