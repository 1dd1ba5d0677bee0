//! Short-term memory — bounded recent-turn windows per conversation.
//!
//! Each session keeps the most recent N turns; appending beyond the window
//! evicts the oldest turn first. Distinct from long-term memory: turns are
//! never embedded or ranked, only fed to context assembly in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// One conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// In-process store of per-session turn windows.
pub struct SessionStore {
    window: usize,
    sessions: RwLock<HashMap<String, VecDeque<Turn>>>,
}

impl SessionStore {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Append a turn, evicting the oldest once the window is full.
    pub async fn append(&self, session_id: &str, role: &str, content: &str) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push_back(Turn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        while turns.len() > self.window {
            turns.pop_front();
        }
    }

    /// The session's window, oldest first. Unknown sessions yield an empty
    /// window, not an error.
    pub async fn window(&self, session_id: &str) -> Vec<Turn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a session's turns. Returns how many were removed.
    pub async fn clear(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).map(|t| t.len()).unwrap_or(0)
    }
}
