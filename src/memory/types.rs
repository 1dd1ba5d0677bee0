//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the four record categories) and [`MemoryRecord`]
//! (a full long-term memory with embedding and access bookkeeping).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The four memory categories. A closed set — unknown values are rejected at
/// the boundary, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Facts about the user (name, occupation, circumstances).
    UserInfo,
    /// Distilled exchanges worth keeping beyond the short-term window.
    Conversation,
    /// General world or domain knowledge.
    Knowledge,
    /// Likes, dislikes, and settings the user has expressed.
    Preference,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserInfo => "user_info",
            Self::Conversation => "conversation",
            Self::Knowledge => "knowledge",
            Self::Preference => "preference",
        }
    }

    /// All variants, in stats-reporting order.
    pub const ALL: [MemoryType; 4] = [
        Self::UserInfo,
        Self::Conversation,
        Self::Knowledge,
        Self::Preference,
    ];
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_info" => Ok(Self::UserInfo),
            "conversation" => Ok(Self::Conversation),
            "knowledge" => Ok(Self::Knowledge),
            "preference" => Ok(Self::Preference),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// A long-term memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Stable integer id, assigned at insertion, never reused.
    pub id: u64,
    /// Text payload.
    pub content: String,
    /// Category of this record.
    pub memory_type: MemoryType,
    /// Embedding vector; length equals the store's configured dimension.
    pub embedding: Vec<f32>,
    /// Caller-supplied baseline importance in `[0.0, 1.0]`.
    pub importance: f64,
    /// Creation timestamp. Immutable.
    pub created_at: DateTime<Utc>,
    /// Updated every time this record is returned from a search.
    pub last_accessed_at: DateTime<Utc>,
    /// Incremented every time this record is returned from a search.
    pub access_count: u64,
    /// Auxiliary key/value pairs, opaque to the core.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MemoryRecord {
    /// Age of this record in (fractional) days at `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds().max(0) as f64;
        seconds / 86_400.0
    }
}
