use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::network_status_store::NetworkStatusRecord;
use crate::external::{ColdStore, Storage, StoredStatuses, StoredStatusesUpdate};
use crate::models::WalletId;
use crate::utils::*;

pub const STORAGE_NETWORK_STATUSES: &str = "__core__network_statuses";

/// Cold store persisted as a single JSON document in the [`Storage`]
pub struct StorageColdStore {
    key: String,
    storage: Arc<dyn Storage>,
    statuses: RwLock<StoredStatuses>,
}

impl StorageColdStore {
    /// Loads full cold store state. Fails on invalid data
    pub async fn load(storage: Arc<dyn Storage>) -> Result<Self> {
        Self::load_with_key(storage, STORAGE_NETWORK_STATUSES).await
    }

    /// Loads full cold store state. Returns empty state on invalid data
    pub async fn load_unchecked(storage: Arc<dyn Storage>) -> Self {
        match Self::load(storage.clone()).await {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Failed to load stored network statuses: {e:?}");
                Self {
                    key: STORAGE_NETWORK_STATUSES.to_owned(),
                    storage,
                    statuses: Default::default(),
                }
            }
        }
    }

    pub async fn load_with_key(storage: Arc<dyn Storage>, key: &str) -> Result<Self> {
        let statuses = match storage.get(key).await? {
            Some(data) => serde_json::from_str::<StoredData>(&data)?.into_statuses(),
            None => Default::default(),
        };

        Ok(Self {
            key: key.to_owned(),
            storage,
            statuses: RwLock::new(statuses),
        })
    }

    async fn save(&self, statuses: &StoredStatuses) -> Result<()> {
        let data = serde_json::to_string(&StoredData::from_statuses(statuses)).trust_me();
        self.storage.set(&self.key, &data).await
    }
}

#[async_trait]
impl ColdStore for StorageColdStore {
    async fn data(&self) -> Result<StoredStatuses> {
        Ok(self.statuses.read().await.clone())
    }

    async fn update_data(&self, f: StoredStatusesUpdate) -> Result<()> {
        let mut statuses = self.statuses.write().await;

        let mut updated = statuses.clone();
        f(&mut updated);
        if updated == *statuses {
            return Ok(());
        }

        self.save(&updated).await?;
        *statuses = updated;
        Ok(())
    }
}

/// Records are stored as a list per wallet, keyed by the wallet id
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct StoredData(HashMap<WalletId, Vec<NetworkStatusRecord>>);

impl StoredData {
    fn from_statuses(statuses: &StoredStatuses) -> Self {
        Self(
            statuses
                .iter()
                .map(|(wallet, records)| (wallet.clone(), records.values().cloned().collect()))
                .collect(),
        )
    }

    fn into_statuses(self) -> StoredStatuses {
        self.0
            .into_iter()
            .map(|(wallet, records)| {
                let records = records
                    .into_iter()
                    .map(|record| (record.network.clone(), record))
                    .collect::<BTreeMap<_, _>>();
                (wallet, records)
            })
            .collect()
    }
}

/// Non-durable cold store, used for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryColdStore {
    statuses: Mutex<StoredStatuses>,
}

impl MemoryColdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(statuses: StoredStatuses) -> Self {
        Self {
            statuses: Mutex::new(statuses),
        }
    }

    pub fn snapshot(&self) -> StoredStatuses {
        self.statuses.lock().clone()
    }
}

#[async_trait]
impl ColdStore for MemoryColdStore {
    async fn data(&self) -> Result<StoredStatuses> {
        Ok(self.snapshot())
    }

    async fn update_data(&self, f: StoredStatusesUpdate) -> Result<()> {
        f(&mut *self.statuses.lock());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::RwLock;

    use super::*;
    use crate::core::network_status_store::NetworkStatusRecordValue;
    use crate::models::*;

    #[derive(Default)]
    struct MemoryStorage {
        data: RwLock<HashMap<String, String>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.data.read().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes {
                anyhow::bail!("Disk is full");
            }
            self.data.write().insert(key.to_owned(), value.to_owned());
            Ok(())
        }
    }

    fn wallet() -> WalletId {
        WalletId::new("011")
    }

    fn record(network: &str, amount: u32) -> NetworkStatusRecord {
        NetworkStatusRecord {
            network: NetworkId::new(network),
            value: NetworkStatusRecordValue::Verified {
                address: NetworkAddress::single("0xabc"),
                amounts: BTreeMap::from([(network.to_owned(), Amount::loaded(amount))]),
            },
        }
    }

    fn upsert(record: NetworkStatusRecord) -> StoredStatusesUpdate {
        Box::new(move |statuses: &mut StoredStatuses| {
            statuses
                .entry(wallet())
                .or_default()
                .insert(record.network.clone(), record);
        })
    }

    #[tokio::test]
    async fn empty_storage_loads_empty_store() {
        let storage = Arc::new(MemoryStorage::default());
        let store = StorageColdStore::load(storage).await.unwrap();
        assert!(store.data().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn updates_survive_reload() {
        let storage = Arc::new(MemoryStorage::default());

        let store = StorageColdStore::load(storage.clone()).await.unwrap();
        store.update_data(upsert(record("ethereum", 5))).await.unwrap();
        store.update_data(upsert(record("stellar", 7))).await.unwrap();
        store.update_data(upsert(record("ethereum", 6))).await.unwrap();

        let reloaded = StorageColdStore::load(storage.clone()).await.unwrap();
        let expected = BTreeMap::from([(
            wallet(),
            BTreeMap::from([
                (NetworkId::new("ethereum"), record("ethereum", 6)),
                (NetworkId::new("stellar"), record("stellar", 7)),
            ]),
        )]);
        assert_eq!(reloaded.data().await.unwrap(), expected);
        assert!(storage.data.read().contains_key(STORAGE_NETWORK_STATUSES));
    }

    #[tokio::test]
    async fn custom_key_is_used() {
        let storage = Arc::new(MemoryStorage::default());

        let store = StorageColdStore::load_with_key(storage.clone(), "testnet_statuses")
            .await
            .unwrap();
        store.update_data(upsert(record("ethereum", 5))).await.unwrap();

        assert!(storage.data.read().contains_key("testnet_statuses"));
        assert!(!storage.data.read().contains_key(STORAGE_NETWORK_STATUSES));
    }

    #[tokio::test]
    async fn invalid_data_is_rejected_or_dropped() {
        let storage = Arc::new(MemoryStorage::default());
        storage
            .data
            .write()
            .insert(STORAGE_NETWORK_STATUSES.to_owned(), "{ not json".to_owned());

        assert!(StorageColdStore::load(storage.clone()).await.is_err());

        let store = StorageColdStore::load_unchecked(storage).await;
        assert!(store.data().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_content() {
        let storage = Arc::new(MemoryStorage {
            fail_writes: true,
            ..Default::default()
        });

        let store = StorageColdStore::load(storage).await.unwrap();
        let err = store
            .update_data(upsert(record("ethereum", 5)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Disk is full");
        assert!(store.data().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_applies_updates() {
        let store = MemoryColdStore::new();
        store.update_data(upsert(record("ethereum", 5))).await.unwrap();

        assert_eq!(
            store.snapshot()[&wallet()][&NetworkId::new("ethereum")],
            record("ethereum", 5)
        );
    }
}
