// crates/approval-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Approval Gate SQLite Store
// Description: `SQLite`-backed implementations of `ApprovalStore`,
// `ChainStore`, and `IdempotencyStore` behind one shared connection handle.
// Purpose: Give the HTTP surface a single durable backend satisfying every
// CAS and ordering invariant the core interfaces require.
// Dependencies: rusqlite, approval_gate_core, serde_json, uuid
// ============================================================================

//! # Approval Gate `SQLite` Store
//!
//! [`SqliteStore`] implements all three store traits from
//! `approval_gate_core::interfaces` over a single `SQLite` file, so that
//! approval, chain, and idempotency state participate in the same
//! transactional connection. Connection access is serialized through a
//! mutex rather than a writer-thread/queue pair: `SQLite`'s own
//! single-writer model means the mutex only removes busy-retry overhead,
//! not a second point of concurrency.

mod approval_store;
mod chain_store;
mod codec;
mod config;
mod idempotency_store;
mod schema;
mod store;

pub use config::SqliteConnectionError;
pub use config::SqliteJournalMode;
pub use config::SqliteStoreConfig;
pub use store::SqliteStore;
pub use store::SqliteStoreError;
