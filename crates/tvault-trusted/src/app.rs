use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;
use tvault_store::ObjectStore;

use crate::config::TrustedConfig;
use crate::connection::Connection;
use crate::error::TrustedResult;

/// The trusted application: one object store shared by many connections.
///
/// Session state is per connection and never shared. An object being
/// written is held exclusively by its writer's connection until finalized
/// or rolled back: other reads, deletes, and writes of that id fail with
/// `AccessConflict`.
pub struct TrustedApp {
    config: TrustedConfig,
    store: Arc<dyn ObjectStore>,
    next_connection: AtomicU64,
}

impl TrustedApp {
    /// Open the store described by `config`.
    pub fn new(config: TrustedConfig) -> TrustedResult<Self> {
        let store = config.open_store()?;
        info!(storage = ?config.storage, quota = ?config.quota, "trusted app started");
        Ok(Self::with_store(config, store))
    }

    /// Use an already opened store.
    pub fn with_store(config: TrustedConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            store,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &TrustedConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn open_connection(&self) -> Connection {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        Connection::new(id, self.store.clone())
    }
}
