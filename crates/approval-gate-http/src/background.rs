// crates/approval-gate-http/src/background.rs
// ============================================================================
// Module: Background Sweep
// Description: Periodic task expiring stale pending approvals and pruning
// stale idempotency entries.
// Purpose: Keep `expires_at` and idempotency TTL enforcement working even
// when no request happens to land after the deadline passes.
// Dependencies: tokio, approval_gate_core
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use approval_gate_core::ApprovalStore;
use approval_gate_core::IdempotencyStore;
use approval_gate_core::Timestamp;

use crate::state::AppState;

/// Runs forever, sweeping expired approvals and idempotency entries at the
/// cadence configured in `ServiceConfig::background`. Intended to be
/// spawned once at process start via `tokio::spawn`.
pub async fn run_sweep_loop(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.background.sweep_interval_secs.max(1));
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        sweep_once(&state).await;
    }
}

/// Runs one sweep pass: expires overdue pending approvals, then prunes
/// idempotency entries past their retention window.
async fn sweep_once(state: &Arc<AppState>) {
    let state = Arc::clone(state);
    let outcome = tokio::task::spawn_blocking(move || {
        let now = Timestamp::now();
        let expired = state.store.expire_pending(now).map_err(SweepError::Store)?;
        let pruned = state.store.prune_expired(now).map_err(SweepError::Idempotency)?;
        Ok::<(u64, u64), SweepError>((expired, pruned))
    })
    .await;
    match outcome {
        Ok(Ok((expired, pruned))) => {
            if expired > 0 || pruned > 0 {
                tracing::info!(expired, pruned, "background sweep completed");
            }
        }
        Ok(Err(err)) => tracing::warn!(%err, "background sweep store error"),
        Err(err) => tracing::warn!(%err, "background sweep task panicked"),
    }
}

/// Errors from either store touched by one sweep pass.
#[derive(Debug, thiserror::Error)]
enum SweepError {
    /// `expire_pending` failed.
    #[error("approval store: {0}")]
    Store(#[from] approval_gate_core::StoreError),
    /// `prune_expired` failed.
    #[error("idempotency store: {0}")]
    Idempotency(#[from] approval_gate_core::IdempotencyError),
}
