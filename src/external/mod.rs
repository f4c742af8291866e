use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::network_status_store::NetworkStatusRecord;
use crate::models::{NetworkId, WalletId};

/// Durable string key-value storage provided by the host application
#[async_trait]
pub trait Storage: Sync + Send {
    /// Retrieve data from storage
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Upsert data into storage and wait until operation complete
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Persisted network statuses of all wallets
pub type StoredStatuses = BTreeMap<WalletId, BTreeMap<NetworkId, NetworkStatusRecord>>;

pub type StoredStatusesUpdate = Box<dyn FnOnce(&mut StoredStatuses) + Send>;

/// Durable tier of the network statuses cache
#[async_trait]
pub trait ColdStore: Sync + Send {
    /// Returns the current full content
    async fn data(&self) -> Result<StoredStatuses>;

    /// Atomically applies `f` to the current content and waits until it is persisted.
    /// The content stays unchanged if persisting fails
    async fn update_data(&self, f: StoredStatusesUpdate) -> Result<()>;
}
