//! OpenRouter chat bridge: role-play generation and performance analysis over an
//! OpenAI-compatible `/chat/completions` endpoint.
//!
//! Both calls ask for a JSON object answer and parse it into the backend types.
//! API key: `llm_api_key` in config, `VOCALIS_LLM_API_KEY` or `OPENROUTER_API_KEY`.

use crate::backend::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, GenerationBackend, GenerationRequest,
    GenerationResponse, KnowledgeSource,
};
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::prompts::{
    analysis_user_prompt, roleplay_user_prompt, ANALYSIS_SYSTEM, FALLBACK_CONSUMER_PROMPT,
    FALLBACK_SALES_PROMPT, ROLEPLAY_SYSTEM,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

// OpenAI-compatible request/response
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Which call a chat request serves; selects the error variant.
#[derive(Debug, Clone, Copy)]
enum Purpose {
    Generation,
    Analysis,
}

impl Purpose {
    fn error(self, message: String) -> SimError {
        match self {
            Purpose::Generation => SimError::Generation(message),
            Purpose::Analysis => SimError::Analysis(message),
        }
    }
}

/// Chat-completions client implementing [`GenerationBackend`] and [`AnalysisBackend`].
pub struct ChatBridge {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    knowledge: Option<Arc<dyn KnowledgeSource>>,
}

impl ChatBridge {
    /// Build from simulator config. `Ok(None)` if no API key is configured.
    pub fn from_config(config: &SimulatorConfig) -> SimResult<Option<Self>> {
        let Some(key) = config.api_key() else {
            return Ok(None);
        };
        let bridge = Self::with_timeout(config.llm_api_url.clone(), key, config.request_timeout())?;
        Ok(Some(bridge.with_model(&config.llm_model)))
    }

    /// Create a bridge with an explicit base URL and API key.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> SimResult<Self> {
        Self::with_timeout(api_url, api_key, Duration::from_secs(60))
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> SimResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SimError::Config(format!("http client: {}", e)))?;
        let api_url = api_url.into();
        Ok(Self {
            api_url: if api_url.trim().is_empty() {
                OPENROUTER_API_BASE.to_string()
            } else {
                api_url.trim_end_matches('/').to_string()
            },
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
            knowledge: None,
        })
    }

    /// Set the model (e.g. `meta-llama/llama-3.3-70b-instruct`, `openai/gpt-4o-mini`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Attach a knowledge source consulted when a run has a knowledge URL.
    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        purpose: Purpose,
        system: &str,
        user: String,
        temperature: f32,
    ) -> SimResult<T> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: Some(temperature),
            max_tokens: Some(1024),
            response_format: ResponseFormat { kind: "json_object" },
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://vocalis.local")
            .header("X-Title", "Vocalis-Simulator")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| purpose.error(format!("chat request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(purpose.error(format!("chat API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| purpose.error(format!("chat response parse failed: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| purpose.error("no response from model".to_string()))?;

        debug!(chars = content.len(), model = %self.model, "chat completion received");
        let json = extract_json_object(&content)
            .ok_or_else(|| purpose.error(format!("model did not return a JSON object: {}", content)))?;
        serde_json::from_str(json).map_err(|e| purpose.error(format!("unexpected answer shape: {}", e)))
    }
}

/// Slice from the first `{` to the last `}`; tolerates code fences and chatter around the object.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn or_fallback<'a>(prompt: &'a str, fallback: &'a str) -> &'a str {
    if prompt.trim().is_empty() {
        fallback
    } else {
        prompt
    }
}

#[async_trait]
impl GenerationBackend for ChatBridge {
    async fn generate(&self, request: &GenerationRequest) -> SimResult<GenerationResponse> {
        let knowledge_url = request.knowledge_url.as_deref().unwrap_or("");
        let snippet = match (&self.knowledge, request.knowledge_url.as_deref()) {
            (Some(source), Some(url)) if !url.trim().is_empty() => {
                match source.lookup(url, &request.query).await {
                    Ok(snippet) => Some(snippet),
                    Err(e) => {
                        warn!(error = %e, "knowledge lookup failed; generating without it");
                        None
                    }
                }
            }
            _ => None,
        };

        let user = roleplay_user_prompt(
            or_fallback(&request.sales_prompt, FALLBACK_SALES_PROMPT),
            or_fallback(&request.consumer_prompt, FALLBACK_CONSUMER_PROMPT),
            knowledge_url,
            snippet.as_deref(),
            &request.query,
        );
        self.complete_json(Purpose::Generation, ROLEPLAY_SYSTEM, user, 0.8)
            .await
    }
}

#[async_trait]
impl AnalysisBackend for ChatBridge {
    async fn analyze(&self, request: &AnalysisRequest) -> SimResult<AnalysisResult> {
        let user = analysis_user_prompt(&request.sales_prompt, &request.transcript);
        let result: AnalysisResult = self
            .complete_json(Purpose::Analysis, ANALYSIS_SYSTEM, user, 0.3)
            .await?;
        Ok(result.clamped())
    }
}
