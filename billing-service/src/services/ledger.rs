//! Ledger intent flushing.
//!
//! Shadow entries for business events are staged as intents in the same
//! transaction as their primary record, then flushed into the append-only
//! ledger here. A flush failure never propagates to the request that staged
//! the intent: it is logged, counted, and retried by the background loop.

use std::sync::Arc;
use std::time::Duration;

use service_core::error::AppError;

use crate::services::database::Database;

/// Opportunistic flush after a primary mutation, so the happy path is
/// immediately consistent. Per-intent failures are handled inside the flush
/// itself; an outright database error here is logged and left to the
/// background loop.
pub async fn flush_now(db: &Database) {
    if let Err(e) = db.flush_ledger_intents(25).await {
        let e = AppError::LedgerWrite(anyhow::anyhow!(e));
        tracing::warn!(error = %e, "Ledger flush pass failed; background flusher will retry");
    }
}

/// Background retry loop draining the intent outbox.
pub async fn run_flusher(db: Arc<Database>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        flush_now(&db).await;
    }
}
