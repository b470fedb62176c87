//! Saved sessions: named snapshots of finished runs.
//!
//! The store is an explicit repository handed to the loops, never a process-wide
//! singleton. Two implementations: sled on disk (with a DashMap hot cache) and a
//! pure in-memory map.

use crate::backend::AnalysisResult;
use crate::error::{SimError, SimResult};
use crate::model::{Mode, Turn};
use crate::state::{ConversationState, Metrics};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SESSIONS_TREE: &str = "vocalis-ai-sessions";

/// A persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub mode: Mode,
    pub saved_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
    /// AI-vs-AI runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    /// Live training runs with a completed analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    /// Plain-text history joined with newlines.
    pub transcript: String,
}

impl Session {
    /// Snapshot a finished run. A blank `name` falls back to the offered or default name.
    pub fn from_state(state: &ConversationState, name: Option<String>) -> SimResult<Self> {
        if state.status().is_running() {
            return Err(SimError::RunActive);
        }
        if state.transcript().is_empty() {
            return Err(SimError::InvalidInput("there is no conversation to save".to_string()));
        }
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| state.persistence_offer().map(str::to_string))
            .unwrap_or_else(|| state.mode().default_session_name());
        let (metrics, analysis) = match state.mode() {
            Mode::AiVsAi => (Some(state.metrics()), None),
            Mode::LiveTraining => (None, state.analysis().cloned()),
        };
        Ok(Self {
            id: format!("session-{}", Uuid::new_v4()),
            name,
            mode: state.mode(),
            saved_at: Utc::now(),
            turns: state.transcript().to_vec(),
            metrics,
            analysis,
            transcript: state.history_text(),
        })
    }
}

/// Session storage: create, read, list, delete, rename.
pub trait SessionRepository: Send + Sync {
    fn create(&self, session: &Session) -> SimResult<()>;
    fn get(&self, id: &str) -> SimResult<Option<Session>>;
    /// Newest first.
    fn list(&self) -> SimResult<Vec<Session>>;
    /// Returns false if no such session existed.
    fn delete(&self, id: &str) -> SimResult<bool>;
    /// Returns false if no such session existed.
    fn rename(&self, id: &str, name: &str) -> SimResult<bool>;
}

fn validate_name(name: &str) -> SimResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SimError::InvalidInput("session name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn newest_first(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    sessions
}

/// Sled-backed store; values are JSON. Reads go through a DashMap hot cache.
pub struct SledSessionStore {
    db: Db,
    tree: sled::Tree,
    cache: Arc<DashMap<String, Session>>,
}

impl SledSessionStore {
    /// Opens or creates the store at the given directory.
    pub fn open_path<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(SESSIONS_TREE)?;
        Ok(Self {
            db,
            tree,
            cache: Arc::new(DashMap::new()),
        })
    }

    fn write(&self, session: &Session) -> SimResult<()> {
        let bytes = serde_json::to_vec(session)?;
        self.tree.insert(session.id.as_bytes(), bytes)?;
        self.db.flush()?;
        self.cache.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

impl SessionRepository for SledSessionStore {
    fn create(&self, session: &Session) -> SimResult<()> {
        self.write(session)?;
        info!(id = %session.id, name = %session.name, "💾 Session saved");
        Ok(())
    }

    fn get(&self, id: &str) -> SimResult<Option<Session>> {
        if let Some(s) = self.cache.get(id) {
            return Ok(Some(s.clone()));
        }
        let Some(bytes) = self.tree.get(id.as_bytes())? else {
            return Ok(None);
        };
        let session: Session = serde_json::from_slice(&bytes)?;
        self.cache.insert(id.to_string(), session.clone());
        Ok(Some(session))
    }

    fn list(&self) -> SimResult<Vec<Session>> {
        let mut sessions = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            sessions.push(serde_json::from_slice::<Session>(&bytes)?);
        }
        Ok(newest_first(sessions))
    }

    fn delete(&self, id: &str) -> SimResult<bool> {
        self.cache.remove(id);
        let removed = self.tree.remove(id.as_bytes())?.is_some();
        self.db.flush()?;
        if removed {
            info!(id, "🗑️ Session deleted");
        }
        Ok(removed)
    }

    fn rename(&self, id: &str, name: &str) -> SimResult<bool> {
        let name = validate_name(name)?;
        let Some(mut session) = self.get(id)? else {
            return Ok(false);
        };
        session.name = name;
        self.write(&session)?;
        Ok(true)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionStore {
    fn create(&self, session: &Session) -> SimResult<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> SimResult<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    fn list(&self) -> SimResult<Vec<Session>> {
        Ok(newest_first(
            self.sessions.iter().map(|e| e.value().clone()).collect(),
        ))
    }

    fn delete(&self, id: &str) -> SimResult<bool> {
        Ok(self.sessions.remove(id).is_some())
    }

    fn rename(&self, id: &str, name: &str) -> SimResult<bool> {
        let name = validate_name(name)?;
        match self.sessions.get_mut(id) {
            Some(mut s) => {
                s.name = name;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
