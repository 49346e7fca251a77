// SPDX-License-Identifier: Apache-2.0
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::{info, warn};
use vesper_config::MemoryConfig;
use vesper_model::{CompletionRequest, EmbeddingProvider, Message, ModelProvider};

use crate::types::{LongTermMemory, RecallMode, ScoredMemory, ShortTermMemory};
use crate::vector_store::{VectorRecord, VectorStore};

const SHORT_TERM_COLLECTION: &str = "short_term_memories";
const LONG_TERM_COLLECTION: &str = "long_term_memories";

/// In-memory half of the subsystem: the insertion-ordered short-term ring
/// and the long-term record, both protected by one `RwLock` since they're
/// read and written together far more often than contended.
struct ListState {
    short_term: VecDeque<ShortTermMemory>,
    long_term: LongTermMemory,
    appends_since_consolidation: usize,
}

/// Owns the short-term ring, the long-term profile record, and the vector
/// collections backing recall, per user. One [`MemoryStore`] serves every
/// user; state is keyed by user id the way [`vesper_session::SessionManager`]
/// keys its stacks.
pub struct MemoryStore {
    config: MemoryConfig,
    long_term_path: std::path::PathBuf,
    vectors: VectorStore,
    embeddings: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn ModelProvider>,
    users: RwLock<HashMap<String, Arc<RwLock<ListState>>>>,
}

impl MemoryStore {
    pub fn new(
        config: MemoryConfig,
        long_term_path: impl Into<std::path::PathBuf>,
        vectors: VectorStore,
        embeddings: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ModelProvider>,
    ) -> Self {
        Self { config, long_term_path: long_term_path.into(), vectors, embeddings, model, users: RwLock::new(HashMap::new()) }
    }

    async fn user_state(&self, user_id: &str) -> Arc<RwLock<ListState>> {
        if let Some(state) = self.users.read().await.get(user_id) {
            return Arc::clone(state);
        }
        let mut users = self.users.write().await;
        Arc::clone(
            users
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(ListState { short_term: VecDeque::new(), long_term: LongTermMemory::default(), appends_since_consolidation: 0 }))),
        )
    }

    fn long_term_path_for(&self, user_id: &str) -> std::path::PathBuf {
        self.long_term_path.join(format!("{user_id}.json"))
    }

    /// Loads `user_id`'s persisted long-term record from disk, if present,
    /// replacing whatever is currently in memory. Call once before serving
    /// recall for a user freshly brought into the process.
    pub async fn load_long_term(&self, user_id: &str) -> anyhow::Result<()> {
        let path = self.long_term_path_for(user_id);
        if !path.exists() {
            return Ok(());
        }
        let bytes = tokio::fs::read(&path).await.with_context(|| format!("reading long-term memory at {}", path.display()))?;
        let record: LongTermMemory = serde_json::from_slice(&bytes).with_context(|| format!("parsing long-term memory at {}", path.display()))?;
        let state = self.user_state(user_id).await;
        state.write().await.long_term = record;
        Ok(())
    }

    /// Appends one short-term turn: pushes it onto the ring, evicting the
    /// oldest entry past `short_term_capacity`; embeds and upserts it into
    /// the vector collection; and, once `trigger_count` appends have
    /// accumulated, runs consolidation.
    pub async fn append(&self, user_id: &str, query: impl Into<String>, response: impl Into<String>, agent: impl Into<String>, success: bool, timestamp_ms: i64) -> anyhow::Result<()> {
        let query = query.into();
        let response = response.into();
        let memory = ShortTermMemory { id: format!("stm_{timestamp_ms}"), query: query.clone(), response: response.clone(), timestamp_ms, agent: agent.into(), success };

        let document = format!("user: {query}\nassistant: {response}");
        let embedding = self.embeddings.embed(&document).await.context("embedding short-term memory")?;
        self.vectors.upsert(
            SHORT_TERM_COLLECTION,
            &VectorRecord { id: memory.id.clone(), embedding, document, metadata: serde_json::json!({ "user_id": user_id, "timestamp_ms": timestamp_ms }) },
        )?;

        let state = self.user_state(user_id).await;
        let should_consolidate = {
            let mut guard = state.write().await;
            guard.short_term.push_back(memory);
            while guard.short_term.len() > self.config.short_term_capacity {
                guard.short_term.pop_front();
            }
            guard.appends_since_consolidation += 1;
            guard.appends_since_consolidation >= self.config.trigger_count
        };

        if should_consolidate {
            if let Err(err) = self.consolidate(user_id).await {
                warn!(user_id, error = %err, "long-term consolidation failed, short-term append still recorded");
            }
        }
        Ok(())
    }

    /// `Recent(n)` returns the last `n` entries in insertion order.
    /// `Related` returns the top-K by cosine similarity above the
    /// configured threshold, with anything already present in
    /// `Recent(recent_n)` removed from the related set before truncation.
    pub async fn recall(&self, user_id: &str, mode: RecallMode) -> anyhow::Result<Vec<ScoredMemory>> {
        let state = self.user_state(user_id).await;
        match mode {
            RecallMode::Recent(n) => {
                let guard = state.read().await;
                Ok(guard.short_term.iter().rev().take(n).rev().map(|m| ScoredMemory { memory: m.clone(), score: 1.0 }).collect())
            }
            RecallMode::Related { query, top_k, recent_n } => {
                let recent_ids: std::collections::HashSet<String> = {
                    let guard = state.read().await;
                    guard.short_term.iter().rev().take(recent_n).map(|m| m.id.clone()).collect()
                };

                let embedding = self.embeddings.embed(&query).await.context("embedding recall query")?;
                let hits = self.vectors.query(SHORT_TERM_COLLECTION, &embedding, top_k + recent_ids.len(), self.config.similarity_threshold)?;

                let guard = state.read().await;
                let by_id: HashMap<&str, &ShortTermMemory> = guard.short_term.iter().map(|m| (m.id.as_str(), m)).collect();
                let mut results = Vec::new();
                for (record, score) in hits {
                    if recent_ids.contains(&record.id) {
                        continue;
                    }
                    if let Some(memory) = by_id.get(record.id.as_str()) {
                        results.push(ScoredMemory { memory: (*memory).clone(), score });
                    }
                    if results.len() >= top_k {
                        break;
                    }
                }
                Ok(results)
            }
        }
    }

    /// Refreshes the long-term summary/profile/preferences record by
    /// prompting the configured model over the last `max_history_rounds`
    /// short-term turns, then persists the record atomically and resets
    /// the consolidation counter.
    pub async fn consolidate(&self, user_id: &str) -> anyhow::Result<()> {
        let state = self.user_state(user_id).await;
        let (transcript, mut long_term) = {
            let guard = state.read().await;
            let transcript: String = guard
                .short_term
                .iter()
                .rev()
                .take(self.config.max_history_rounds)
                .rev()
                .map(|m| format!("user: {}\nassistant: {}", m.query, m.response))
                .collect::<Vec<_>>()
                .join("\n");
            (transcript, guard.long_term.clone())
        };

        let prompt = format!(
            "Given the prior profile summary:\n{}\n\nAnd the recent conversation:\n{}\n\nReturn a JSON object with fields \"summary\" (string), \"profile\" (object of string->string), and \"preferences\" (object of string->array of strings), merging new facts into the prior profile.",
            long_term.summary, transcript
        );
        let response = self.model.complete(CompletionRequest { messages: vec![Message::system("You maintain a running user profile."), Message::user(prompt)], want_json: true, ..Default::default() }).await?;

        match serde_json::from_str::<serde_json::Value>(&response.text) {
            Ok(value) => {
                if let Some(summary) = value.get("summary").and_then(serde_json::Value::as_str) {
                    long_term.summary = summary.to_string();
                }
                if let Some(profile) = value.get("profile").and_then(serde_json::Value::as_object) {
                    for (k, v) in profile {
                        if let Some(s) = v.as_str() {
                            long_term.profile.insert(k.clone(), s.to_string());
                        }
                    }
                }
                if let Some(preferences) = value.get("preferences").and_then(serde_json::Value::as_object) {
                    for (k, v) in preferences {
                        if let Some(arr) = v.as_array() {
                            long_term.preferences.insert(k.clone(), arr.iter().filter_map(|x| x.as_str().map(String::from)).collect());
                        }
                    }
                }
            }
            Err(err) => {
                warn!(user_id, error = %err, "consolidation model did not return valid JSON, keeping prior profile with summary appended");
                long_term.summary = format!("{}\n{}", long_term.summary, response.text).trim().to_string();
            }
        }
        long_term.metadata.update_count += 1;
        long_term.metadata.last_update = Some(chrono::Utc::now());

        self.persist_long_term(user_id, &long_term).await?;
        self.index_long_term(user_id, &long_term).await?;

        let mut guard = state.write().await;
        guard.long_term = long_term;
        guard.appends_since_consolidation = 0;
        info!(user_id, "long-term memory consolidated");
        Ok(())
    }

    /// Writes `record` to `<user_id>.json` via a temp file + rename so a
    /// crash mid-write never leaves a truncated file in place.
    async fn persist_long_term(&self, user_id: &str, record: &LongTermMemory) -> anyhow::Result<()> {
        let path = self.long_term_path_for(user_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp_path, &bytes).await.with_context(|| format!("writing {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path).await.with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
        Ok(())
    }

    /// Upserts one `ltm_<field>` vector per profile/preference field so
    /// `Related` recall can, in principle, surface long-term facts too.
    async fn index_long_term(&self, user_id: &str, record: &LongTermMemory) -> anyhow::Result<()> {
        for (field, value) in &record.profile {
            let text = format!("{field}: {value}");
            let embedding = self.embeddings.embed(&text).await?;
            self.vectors.upsert(
                LONG_TERM_COLLECTION,
                &VectorRecord { id: format!("ltm_{field}"), embedding, document: text, metadata: serde_json::json!({ "user_id": user_id, "field": field }) },
            )?;
        }
        for (field, values) in &record.preferences {
            let text = format!("{field}: {}", values.join(", "));
            let embedding = self.embeddings.embed(&text).await?;
            self.vectors.upsert(
                LONG_TERM_COLLECTION,
                &VectorRecord { id: format!("ltm_{field}"), embedding, document: text, metadata: serde_json::json!({ "user_id": user_id, "field": field }) },
            )?;
        }
        Ok(())
    }

    /// Current long-term record for `user_id`, for callers (e.g. the
    /// orchestrator) that want the raw profile rather than a vector recall.
    pub async fn long_term(&self, user_id: &str) -> LongTermMemory {
        self.user_state(user_id).await.read().await.long_term.clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
