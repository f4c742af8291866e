//! Per-wallet network status cache.
//!
//! [`NetworkStatusStore`](crate::core::NetworkStatusStore) keeps the live status of every
//! network tracked by a wallet in an observable [`HotCache`](crate::core::HotCache) and
//! writes successfully fetched statuses through to a durable
//! [`ColdStore`](crate::external::ColdStore), which seeds the cache on the next start.

pub mod core;
pub mod external;
pub mod models;
pub mod utils;
