// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One short-term turn, stored both in the insertion-ordered list and as a
/// vector-collection row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermMemory {
    pub id: String,
    pub query: String,
    pub response: String,
    pub timestamp_ms: i64,
    pub agent: String,
    pub success: bool,
}

/// Summary + profile + preferences record, persisted as one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMemory {
    pub summary: String,
    pub profile: HashMap<String, String>,
    pub preferences: HashMap<String, Vec<String>>,
    pub metadata: LongTermMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMetadata {
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,
    pub update_count: u64,
}

impl Default for LongTermMemory {
    fn default() -> Self {
        Self {
            summary: String::new(),
            profile: HashMap::new(),
            preferences: HashMap::new(),
            metadata: LongTermMetadata { last_update: None, update_count: 0 },
        }
    }
}

/// A short-term memory plus its similarity score against a query, returned
/// by `Related` recall.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: ShortTermMemory,
    pub score: f32,
}

/// Recall mode.
#[derive(Debug, Clone)]
pub enum RecallMode {
    /// Last N entries in insertion order.
    Recent(usize),
    /// Top-K by cosine similarity with the configured threshold, deduped
    /// against `Recent(recent_n)`.
    Related { query: String, top_k: usize, recent_n: usize },
}
