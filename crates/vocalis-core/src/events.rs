//! Engine events for a front end.
//!
//! Loops publish on a tokio unbounded channel; a receiver that has gone away is not an
//! error (the run carries on and the state stays inspectable).

use crate::backend::AnalysisResult;
use crate::model::{Turn, TurnId};
use crate::state::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Human-readable message naming what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }
}

/// Events emitted by the loops.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Run status changed.
    StatusChanged { run_id: Uuid, status: RunStatus },
    /// A turn was committed to the transcript (or the training prompt was shown).
    TurnAdded { run_id: Uuid, turn: Turn },
    /// Synthesis finished for a turn.
    AudioReady {
        run_id: Uuid,
        turn_id: TurnId,
        duration_secs: Option<f64>,
    },
    /// Synthesis failed for a turn.
    AudioFailed { run_id: Uuid, turn_id: TurnId },
    /// Something the operator should see.
    Notice { run_id: Uuid, notice: Notice },
    /// A finished run can be saved under this suggested name.
    PersistenceOffered { run_id: Uuid, default_name: String },
    /// Live training analysis completed.
    AnalysisReady { run_id: Uuid, result: AnalysisResult },
}

/// Cloneable publishing end. A sink without a channel drops events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver a front end reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("event receiver dropped");
            }
        }
    }
}
