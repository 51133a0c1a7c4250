//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the loaded configuration, the print
//! compositor, and the in-memory design registry. Submitted designs are
//! served from the registry; a dirty set tracks records not yet written to
//! Postgres by the persistence task.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use canvas::design::DesignData;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::render::Compositor;

// =============================================================================
// DESIGN RECORD
// =============================================================================

/// URLs of the server-composed 300 DPI faces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighResImages {
    pub front: String,
    pub back: String,
}

/// URLs of the client-captured previews, stored as uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteDesignImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

/// One submitted design. Mirrors a row of the `designs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRecord {
    pub id: Uuid,
    /// Server clock at submission, milliseconds since the Unix epoch.
    pub created_at_ms: i64,
    pub design: DesignData,
    pub high_res_images: HighResImages,
    pub complete_design_images: CompleteDesignImages,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Live design records plus the ids not yet persisted.
#[derive(Debug, Default)]
pub struct DesignRegistry {
    pub records: HashMap<Uuid, DesignRecord>,
    /// Record IDs modified since last flush.
    pub dirty: HashSet<Uuid>,
}

impl DesignRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record and mark it for persistence.
    pub fn insert(&mut self, record: DesignRecord) {
        self.dirty.insert(record.id);
        self.records.insert(record.id, record);
    }

    /// Load a record that is already persisted. Does not mark it dirty.
    pub fn hydrate(&mut self, record: DesignRecord) {
        self.records.entry(record.id).or_insert(record);
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub designs: Arc<RwLock<DesignRegistry>>,
    pub compositor: Arc<Compositor>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let compositor = Compositor::from_config(&config);
        Self {
            pool,
            config: Arc::new(config),
            designs: Arc::new(RwLock::new(DesignRegistry::new())),
            compositor: Arc::new(compositor),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
