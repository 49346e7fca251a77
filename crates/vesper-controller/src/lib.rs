// SPDX-License-Identifier: Apache-2.0
//! Ordered module lifecycle owner.
//!
//! The controller holds the registration-ordered list of every module
//! adapter (C5) in the pipeline and drives `initialize`/`start`/`stop`
//! through it as a single unit, generalized into a registry rather than
//! one hand-written startup function, since this pipeline's module set is
//! config-driven instead of fixed.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use vesper_core::{Adapter, AdapterError, Event, EventBus};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("module '{module}' failed to initialize: {source}")]
    InitializeFailed { module: String, source: AdapterError },
    #[error("module '{module}' failed to start: {source}")]
    StartFailed { module: String, source: AdapterError },
    #[error("module '{module}' failed to stop: {source}")]
    StopFailed { module: String, source: AdapterError },
}

/// Owns the registration-ordered module list and the shared bus.
///
/// `initialize` runs each module's `initialize` in registration order;
/// the first failure aborts the sequence and runs `cleanup` on every
/// module already initialized, in reverse order. `start` forwards in the
/// same order `initialize` used. `stop` runs in reverse order, best-effort
/// — a failing module's `stop` is logged and does not prevent the rest
/// from stopping.
pub struct Controller {
    bus: Arc<EventBus>,
    modules: Mutex<Vec<Arc<dyn Adapter>>>,
}

impl Controller {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus, modules: Mutex::new(Vec::new()) }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// Appends a module to the registration order. Registration order is
    /// also initialize/start order; `stop`/final `cleanup` run reverse.
    pub async fn register(&self, module: Arc<dyn Adapter>) {
        info!(module = module.name(), "module registered");
        self.modules.lock().await.push(module);
    }

    pub async fn get_module(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.modules.lock().await.iter().find(|m| m.name() == name).cloned()
    }

    /// Initializes every registered module in registration order. On the
    /// first failure, runs `cleanup` on every module already initialized
    /// (reverse order) and returns the error — the remaining, not-yet-
    /// initialized modules are left untouched.
    pub async fn initialize(&self) -> Result<(), ControllerError> {
        let modules = self.modules.lock().await;
        let mut initialized = Vec::with_capacity(modules.len());
        for module in modules.iter() {
            match module.initialize().await {
                Ok(()) => {
                    info!(module = module.name(), "module initialized");
                    initialized.push(module.clone());
                }
                Err(source) => {
                    error!(module = module.name(), error = %source, "module failed to initialize, aborting startup");
                    for done in initialized.into_iter().rev() {
                        if let Err(err) = done.cleanup().await {
                            warn!(module = done.name(), error = %err, "cleanup after aborted startup failed");
                        }
                    }
                    return Err(ControllerError::InitializeFailed { module: module.name().to_string(), source });
                }
            }
        }
        Ok(())
    }

    /// Starts every module in registration order. Assumes `initialize`
    /// already succeeded; a `start` failure here is returned without
    /// running `cleanup` (the caller owns the decision to stop/cleanup
    /// the modules that did start).
    pub async fn start(&self) -> Result<(), ControllerError> {
        let modules = self.modules.lock().await;
        for module in modules.iter() {
            module.start().await.map_err(|source| ControllerError::StartFailed { module: module.name().to_string(), source })?;
            info!(module = module.name(), "module started");
        }
        Ok(())
    }

    /// Stops every module in reverse registration order, best-effort: a
    /// failing `stop` is logged and does not prevent the rest from
    /// stopping.
    pub async fn stop(&self) {
        let modules = self.modules.lock().await;
        for module in modules.iter().rev() {
            if let Err(err) = module.stop().await {
                warn!(module = module.name(), error = %err, "module failed to stop");
            } else {
                info!(module = module.name(), "module stopped");
            }
        }
    }

    /// Runs `cleanup` on every module in reverse registration order,
    /// best-effort, for final shutdown after `stop`.
    pub async fn cleanup(&self) {
        let modules = self.modules.lock().await;
        for module in modules.iter().rev() {
            if let Err(err) = module.cleanup().await {
                warn!(module = module.name(), error = %err, "module failed to clean up");
            }
        }
    }

    /// Aggregated statistics for every registered module, keyed by name.
    pub async fn statistics(&self) -> Vec<(String, vesper_core::AdapterStats)> {
        self.modules.lock().await.iter().map(|m| (m.name().to_string(), m.statistics())).collect()
    }

    pub async fn publish_event(&self, event: Event) {
        self.bus.publish(event).await;
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
