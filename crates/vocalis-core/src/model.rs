//! Turns, speakers and run modes.

use crate::tone::normalize_line;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vocalis_voice::{AudioPayload, VoiceRole};

/// Unique turn identifier. Random so a result addressed to a discarded run never matches.
pub type TurnId = Uuid;

/// Which loop produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "AI vs AI")]
    AiVsAi,
    #[serde(rename = "Live Training")]
    LiveTraining,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::AiVsAi => "AI vs AI",
            Mode::LiveTraining => "Live Training",
        }
    }

    /// History label for `speaker` in this mode (the text before the colon).
    pub fn label(&self, speaker: Speaker) -> &'static str {
        match (self, speaker) {
            (Mode::AiVsAi, Speaker::SalesAgent) => "Sales Agent",
            (Mode::AiVsAi, Speaker::ConsumerAgent) => "Consumer Agent",
            (Mode::LiveTraining, Speaker::ConsumerAgent) => "Consumer AI",
            (Mode::LiveTraining, Speaker::Human) => "Sales Agent (Human)",
            (Mode::LiveTraining, Speaker::SalesAgent) => "Sales Agent",
            (Mode::AiVsAi, Speaker::Human) => "Human",
        }
    }

    /// Default session name, e.g. `AI vs AI Session - 2024-05-01 14:03:22`.
    pub fn default_session_name(&self) -> String {
        format!(
            "{} Session - {}",
            self.as_str(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    SalesAgent,
    ConsumerAgent,
    Human,
}

impl Speaker {
    /// The role expected after this one speaks. The human trainee plays the sales side.
    pub fn counterpart(&self) -> Speaker {
        match self {
            Speaker::SalesAgent | Speaker::Human => Speaker::ConsumerAgent,
            Speaker::ConsumerAgent => Speaker::SalesAgent,
        }
    }

    /// Synthesis voice; human lines are never synthesized.
    pub fn voice_role(&self) -> Option<VoiceRole> {
        match self {
            Speaker::SalesAgent => Some(VoiceRole::Sales),
            Speaker::ConsumerAgent => Some(VoiceRole::Consumer),
            Speaker::Human => None,
        }
    }

    /// Lower-case name used in notices ("audio generation failed for the consumer").
    pub fn describe(&self) -> &'static str {
        match self {
            Speaker::SalesAgent => "sales agent",
            Speaker::ConsumerAgent => "consumer",
            Speaker::Human => "trainee",
        }
    }
}

/// Speech synthesis state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    Pending,
    Ready,
    Failed,
    /// Human lines, the training prompt, and lines with nothing left to speak.
    NotRequested,
}

/// One utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub speaker: Speaker,
    /// Text exactly as generated (or typed).
    pub raw_text: String,
    pub tone: Option<String>,
    /// Display and speech text.
    pub text: String,
    pub audio_status: AudioStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioPayload>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Agent line from the generation backend. Pending synthesis unless nothing is left to speak.
    pub fn generated(speaker: Speaker, raw: &str) -> Self {
        let line = normalize_line(raw);
        let audio_status = if line.text.is_empty() || speaker.voice_role().is_none() {
            AudioStatus::NotRequested
        } else {
            AudioStatus::Pending
        };
        Self {
            id: Uuid::new_v4(),
            speaker,
            raw_text: raw.to_string(),
            tone: line.tone,
            text: line.text,
            audio_status,
            audio: None,
            created_at: Utc::now(),
        }
    }

    /// Typed or transcribed trainee line. No tone extraction, no synthesis.
    pub fn human(text: &str) -> Self {
        Self::unvoiced(Speaker::Human, text)
    }

    /// A line that is shown but never spoken.
    pub fn unvoiced(speaker: Speaker, text: &str) -> Self {
        let text = text.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            speaker,
            raw_text: text.clone(),
            tone: None,
            text,
            audio_status: AudioStatus::NotRequested,
            audio: None,
            created_at: Utc::now(),
        }
    }

    pub fn wants_audio(&self) -> bool {
        self.audio_status == AudioStatus::Pending
    }

    /// `"<label>: <text>"` history entry for this turn in `mode`.
    pub fn history_entry(&self, mode: Mode) -> String {
        format!("{}: {}", mode.label(self.speaker), self.text)
    }
}
