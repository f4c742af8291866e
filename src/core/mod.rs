pub use self::cold_store::{MemoryColdStore, StorageColdStore, STORAGE_NETWORK_STATUSES};
pub use self::hot_cache::HotCache;
pub use self::network_status_store::{
    NetworkStatusStore, NetworkStatusStoreError, StatusesHotCache,
};

pub mod cold_store;
pub mod hot_cache;
pub mod network_status_store;
