// SPDX-License-Identifier: Apache-2.0
mod store;
mod types;
mod vector_store;

pub use store::MemoryStore;
pub use types::{LongTermMemory, LongTermMetadata, RecallMode, ScoredMemory, ShortTermMemory};
pub use vector_store::{VectorRecord, VectorStore};
