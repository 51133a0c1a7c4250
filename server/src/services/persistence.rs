//! Persistence service: background flush of submitted designs.
//!
//! DESIGN
//! ======
//! Submissions land in the in-memory registry and are marked dirty. A
//! background task snapshots dirty records, upserts them in one transaction,
//! then sleeps for the configured interval. At startup, stored records are
//! hydrated back into the registry.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after successful writes. This prioritizes
//! durability over duplicate flush attempts: repeated upserts are acceptable,
//! silent data loss is not.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::services::design::{self, DesignError};
use crate::state::AppState;

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = state.config.flush_interval_ms;
    info!(flush_interval_ms, "design persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

/// Write every dirty record. Returns how many were flushed.
pub async fn flush_dirty(state: &AppState) -> usize {
    // PHASE: SNAPSHOT DIRTY RECORDS
    // WHY: collect clones under lock, then perform I/O lock-free.
    let records = {
        let designs = state.designs.read().await;
        designs.dirty.iter().filter_map(|id| designs.records.get(id).cloned()).collect::<Vec<_>>()
    };
    if records.is_empty() {
        return 0;
    }

    // PHASE: FLUSH + ACK DIRTY IDS
    // WHY: if flush fails we intentionally keep dirty flags for retry.
    match design::upsert_records(&state.pool, &records).await {
        Ok(()) => {
            let mut designs = state.designs.write().await;
            for r in &records {
                designs.dirty.remove(&r.id);
            }
            records.len()
        }
        Err(e) => {
            error!(error = %e, count = records.len(), "design flush failed");
            0
        }
    }
}

/// Load stored records into the registry. Returns how many were loaded.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn hydrate(state: &AppState) -> Result<usize, DesignError> {
    let records = design::load_records(&state.pool).await?;
    let count = records.len();
    let mut designs = state.designs.write().await;
    for record in records {
        designs.hydrate(record);
    }
    info!(count, "designs hydrated");
    Ok(count)
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
