// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

/// Process-wide record of named vehicle fields, booleans/numbers/strings
/// keyed by name. Backed by a `RwLock` rather than a plain `Mutex`: there is
/// no cross-field transactional requirement, so occasionally stale reads
/// are fine, which is exactly what a snapshot clone under a read lock gives
/// readers while writers still serialize against each other.
#[derive(Default)]
pub struct VehicleState {
    fields: RwLock<HashMap<String, Value>>,
}

impl VehicleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.read().expect("vehicle state mutex poisoned").get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.fields.write().expect("vehicle state mutex poisoned").insert(key.into(), value);
    }

    /// Value-copy of every field, for status tools and diagnostics.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.fields.read().expect("vehicle state mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
