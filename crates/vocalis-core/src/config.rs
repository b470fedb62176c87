//! Simulator configuration.
//!
//! [`SimulatorConfig`] is process-level (backend endpoint, pacing, storage) and is loaded
//! once with the `config` crate. [`RoleplayConfig`] is chosen per run by the operator.

use crate::error::{SimError, SimResult};
use crate::model::Mode;
use crate::prompts::{
    AI_VS_AI_OPENING_TASK, DEFAULT_CONSUMER_PROMPT, DEFAULT_SALES_PROMPT, TRAINING_OPENING_TASK,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Minimum length (after trimming) for prompts and the opening task.
pub const MIN_PROMPT_CHARS: usize = 10;

fn default_llm_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "meta-llama/llama-3.3-70b-instruct".to_string()
}

fn default_pacing_delay_ms() -> u64 {
    1000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Process-level settings.
///
/// | Key (env `VOCALIS__<KEY>`) | Default | Description |
/// |-----|---------|-------------|
/// | llm_api_url | https://openrouter.ai/api/v1 | OpenAI-compatible chat completions base URL. |
/// | llm_model | meta-llama/llama-3.3-70b-instruct | Model for generation and analysis. |
/// | llm_api_key | (none) | Falls back to `VOCALIS_LLM_API_KEY`, then `OPENROUTER_API_KEY`. |
/// | pacing_delay_ms | 1000 | Pause between AI-vs-AI rounds. |
/// | storage_path | ./data | Root directory for the session store. |
/// | request_timeout_secs | 60 | Per-request timeout for the chat backend. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            llm_api_url: default_llm_api_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            pacing_delay_ms: default_pacing_delay_ms(),
            storage_path: default_storage_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SimulatorConfig {
    /// Load config from file and environment. Precedence: env `VOCALIS__*` > file
    /// (`VOCALIS_CONFIG`, default `config/vocalis.toml`) > defaults.
    pub fn load() -> SimResult<Self> {
        let config_path =
            std::env::var("VOCALIS_CONFIG").unwrap_or_else(|_| "config/vocalis.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load with an explicit config file path (the file is optional).
    pub fn load_from(path: &Path) -> SimResult<Self> {
        let builder = config::Config::builder()
            .set_default("llm_api_url", default_llm_api_url())?
            .set_default("llm_model", default_llm_model())?
            .set_default("pacing_delay_ms", default_pacing_delay_ms() as i64)?
            .set_default("storage_path", "./data")?
            .set_default("request_timeout_secs", default_request_timeout_secs() as i64)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VOCALIS").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// API key from config, else `VOCALIS_LLM_API_KEY`, else `OPENROUTER_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.llm_api_key
            .clone()
            .or_else(|| std::env::var("VOCALIS_LLM_API_KEY").ok())
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Directory holding the sled session database.
    pub fn sessions_path(&self) -> PathBuf {
        self.storage_path.join("sessions")
    }
}

/// Per-run role-play setup: the two personas, an optional knowledge source and the opening task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleplayConfig {
    pub sales_prompt: String,
    pub consumer_prompt: String,
    /// Empty when no external knowledge source is configured.
    #[serde(default)]
    pub knowledge_url: String,
    /// Opening task ("who starts, what is the scenario").
    pub query: String,
}

impl RoleplayConfig {
    /// Stock personas with the opening task for `mode`.
    pub fn defaults_for(mode: Mode) -> Self {
        let query = match mode {
            Mode::AiVsAi => AI_VS_AI_OPENING_TASK,
            Mode::LiveTraining => TRAINING_OPENING_TASK,
        };
        Self {
            sales_prompt: DEFAULT_SALES_PROMPT.to_string(),
            consumer_prompt: DEFAULT_CONSUMER_PROMPT.to_string(),
            knowledge_url: String::new(),
            query: query.to_string(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_knowledge_url(mut self, url: impl Into<String>) -> Self {
        self.knowledge_url = url.into();
        self
    }

    /// Knowledge URL if one is configured.
    pub fn knowledge(&self) -> Option<&str> {
        let url = self.knowledge_url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Reject setups a run cannot start from.
    pub fn validate(&self) -> SimResult<()> {
        check_len("sales prompt", &self.sales_prompt, "Prompt is too short.")?;
        check_len("consumer prompt", &self.consumer_prompt, "Prompt is too short.")?;
        check_len("opening task", &self.query, "Task is too short.")?;
        if let Some(url) = self.knowledge() {
            reqwest::Url::parse(url).map_err(|e| {
                SimError::InvalidInput(format!("knowledge URL {:?} is not a valid URL: {}", url, e))
            })?;
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, message: &str) -> SimResult<()> {
    if value.trim().chars().count() < MIN_PROMPT_CHARS {
        return Err(SimError::InvalidInput(format!("{}: {}", field, message)));
    }
    Ok(())
}
