//! Prompt templates for role-play generation, performance analysis and the stock personas.

pub mod analysis;
pub mod personas;
pub mod roleplay;

pub use analysis::{analysis_user_prompt, ANALYSIS_SYSTEM, ANALYSIS_USER_TEMPLATE};
pub use personas::{
    AI_VS_AI_OPENING_TASK, DEFAULT_CONSUMER_PROMPT, DEFAULT_SALES_PROMPT, FALLBACK_CONSUMER_PROMPT,
    FALLBACK_SALES_PROMPT, TRAINING_OPENING_TASK, TRAINING_SEED_TEXT,
};
pub use roleplay::{roleplay_user_prompt, ROLEPLAY_SYSTEM, ROLEPLAY_USER_TEMPLATE};
