// SPDX-License-Identifier: Apache-2.0
//! Vector storage over `rusqlite` (bundled SQLite). Embeddings are stored
//! as BLOBs of little-endian `f32` and cosine similarity is computed in
//! Rust over the retrieved rows — a deliberately simple "vector store"
//! appropriate to the tens-to-low-thousands of rows this subsystem manages,
//! not a full ANN index.
use std::sync::Mutex;

use anyhow::Context;
use rusqlite::{params, Connection};
use serde_json::Value;

/// One row of a vector collection: id, embedding vector, document text,
/// metadata.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Value,
}

pub struct VectorStore {
    conn: Mutex<Connection>,
}

fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening vector store at {path}"))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS vectors (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                document TEXT NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::open(":memory:")
    }

    pub fn upsert(&self, collection: &str, record: &VectorRecord) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("vector store mutex poisoned");
        conn.execute(
            "INSERT INTO vectors (collection, id, embedding, document, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(collection, id) DO UPDATE SET
                embedding = excluded.embedding,
                document = excluded.document,
                metadata = excluded.metadata",
            params![collection, record.id, encode(&record.embedding), record.document, record.metadata.to_string()],
        )?;
        Ok(())
    }

    /// Top-K rows of `collection` by cosine similarity to `query_embedding`,
    /// descending, with `score >= min_score`.
    pub fn query(&self, collection: &str, query_embedding: &[f32], top_k: usize, min_score: f32) -> anyhow::Result<Vec<(VectorRecord, f32)>> {
        let conn = self.conn.lock().expect("vector store mutex poisoned");
        let mut stmt = conn.prepare("SELECT id, embedding, document, metadata FROM vectors WHERE collection = ?1")?;
        let rows = stmt.query_map(params![collection], |row| {
            let id: String = row.get(0)?;
            let embedding: Vec<u8> = row.get(1)?;
            let document: String = row.get(2)?;
            let metadata: String = row.get(3)?;
            Ok((id, embedding, document, metadata))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, embedding_bytes, document, metadata_json) = row?;
            let embedding = decode(&embedding_bytes);
            let score = cosine_similarity(query_embedding, &embedding);
            if score >= min_score {
                let metadata: Value = serde_json::from_str(&metadata_json).unwrap_or(Value::Null);
                scored.push((VectorRecord { id, embedding, document, metadata }, score));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<VectorRecord>> {
        let conn = self.conn.lock().expect("vector store mutex poisoned");
        let mut stmt = conn.prepare("SELECT embedding, document, metadata FROM vectors WHERE collection = ?1 AND id = ?2")?;
        let mut rows = stmt.query(params![collection, id])?;
        match rows.next()? {
            Some(row) => {
                let embedding: Vec<u8> = row.get(0)?;
                let document: String = row.get(1)?;
                let metadata: String = row.get(2)?;
                Ok(Some(VectorRecord {
                    id: id.to_string(),
                    embedding: decode(&embedding),
                    document,
                    metadata: serde_json::from_str(&metadata).unwrap_or(Value::Null),
                }))
            }
            None => Ok(None),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
