// crates/approval-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store
// Description: The shared connection handle implementing ApprovalStore,
// ChainStore, and IdempotencyStore.
// Purpose: Give every trait impl in this crate one durable handle so that
// chain-to-approval propagation can participate in the same transaction.
// Dependencies: rusqlite, approval_gate_core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::config::SqliteConnectionError;
use crate::config::SqliteStoreConfig;
use crate::config::open_connection;
use crate::schema;

/// Errors constructing a [`SqliteStore`].
#[derive(Debug, thiserror::Error)]
pub enum SqliteStoreError {
    /// The connection could not be opened or the schema could not be
    /// initialized.
    #[error("sqlite store setup failed: {0}")]
    Setup(#[from] SqliteConnectionError),
}

/// `SQLite`-backed durable handle for approvals, chains, and idempotency
/// entries.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex; `SQLite`'s
///   own single-writer model means a second writer thread would otherwise
///   block or error under WAL rather than run concurrently, so the mutex
///   only removes the busy-retry overhead rather than changing the
///   underlying serialization.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if absent) the database at `config.path`, applies
    /// durability pragmas, and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the connection cannot be opened or
    /// the schema cannot be initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let mut connection = open_connection(config)?;
        schema::initialize(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Recovers a poisoned lock's guard instead of propagating the panic
    /// that poisoned it; a single panicked caller must not permanently wedge
    /// every later caller out of the shared connection.
    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
