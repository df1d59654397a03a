//! Shared runtime state for eats-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The GraphQL schema
//! holds its own clone of [`Services`]; `AppState` keeps one as well so the
//! HTTP layer can authenticate requests before they reach the schema.

use std::sync::Arc;
use std::time::Duration;

use eats_db::Store;
use eats_service::{sweep_promotions, Services};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::graphql::{build_schema, EatsSchema};

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub schema: EatsSchema,
    pub build: BuildInfo,
    /// sha256 of the merged config layers, if the daemon booted from config.
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(services: Services, config_hash: Option<String>) -> Self {
        Self {
            schema: build_schema(services.clone()),
            services,
            build: BuildInfo {
                service: "eats-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config_hash,
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Spawn a task that clears expired restaurant promotions every `interval`.
///
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_promotion_sweep(store: Arc<dyn Store>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_promotions(store.as_ref(), chrono::Utc::now()).await {
                error!(error = ?e, "promotion sweep failed");
            }
        }
    });
}
