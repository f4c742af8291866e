use std::sync::Arc;

use anyhow::Result;
use futures_util::Stream;
use tokio::sync::Mutex;

pub use self::converter::*;
use crate::core::hot_cache::HotCache;
use crate::external::{ColdStore, StoredStatuses};
use crate::models::*;

mod converter;

pub type StatusesHotCache = HotCache<WalletId, Portfolio>;

/// Network statuses of all wallets.
///
/// Reads are served from the hot cache only. Successfully fetched statuses are
/// written through to the cold store, while source transitions (`CACHE`,
/// `ONLY_CACHE` demotions and placeholders) stay in memory.
pub struct NetworkStatusStore {
    hot_cache: Arc<StatusesHotCache>,
    cold_store: Arc<dyn ColdStore>,
    /// Orders data operations so that both tiers end with the same value
    write_lock: Mutex<()>,
}

impl NetworkStatusStore {
    /// Seeds the hot cache with the cold store content. Fails if the cold store can't be read
    pub async fn load(
        hot_cache: Arc<StatusesHotCache>,
        cold_store: Arc<dyn ColdStore>,
    ) -> Result<Self> {
        let stored = cold_store.data().await?;
        seed_hot_cache(&hot_cache, stored);

        Ok(Self {
            hot_cache,
            cold_store,
            write_lock: Default::default(),
        })
    }

    /// Seeds the hot cache with the cold store content. Starts without cached statuses
    /// if the cold store can't be read
    pub async fn load_unchecked(
        hot_cache: Arc<StatusesHotCache>,
        cold_store: Arc<dyn ColdStore>,
    ) -> Self {
        match cold_store.data().await {
            Ok(stored) => seed_hot_cache(&hot_cache, stored),
            Err(e) => log::warn!("Failed to restore network statuses: {e:?}"),
        }

        Self {
            hot_cache,
            cold_store,
            write_lock: Default::default(),
        }
    }

    /// Emits the wallet portfolio each time it changes. Emits nothing for unknown wallets
    pub fn get(&self, wallet: &WalletId) -> impl Stream<Item = Portfolio> + Send + 'static {
        self.hot_cache.observe(wallet.clone())
    }

    pub fn get_sync_or_null(
        &self,
        wallet: &WalletId,
        network: &NetworkId,
    ) -> Option<NetworkStatus> {
        self.hot_cache.snapshot_or_none(wallet)?.get(network).cloned()
    }

    pub fn get_all_sync_or_null(&self, wallet: &WalletId) -> Option<Portfolio> {
        self.hot_cache.snapshot_or_none(wallet)
    }

    /// Stores the status of a single network.
    ///
    /// Sourced statuses must be `ACTUAL`. Persistable statuses are also written to
    /// the cold store, the others never remove an already persisted record.
    /// Pending transactions are not persisted, so a restored `Verified` status has none
    pub async fn store_status(&self, wallet: &WalletId, status: NetworkStatus) -> Result<()> {
        ensure_actual(&status.value)?;
        self.store_data(wallet, status).await
    }

    /// Same as [`store_status`](Self::store_status)
    pub async fn store(&self, wallet: &WalletId, status: NetworkStatus) -> Result<()> {
        self.store_status(wallet, status).await
    }

    /// Stores the result of a successful fetch. Rejects unreachable statuses
    pub async fn store_success(&self, wallet: &WalletId, status: NetworkStatus) -> Result<()> {
        ensure_actual(&status.value)?;
        if matches!(status.value, NetworkStatusValue::Unreachable { .. }) {
            return Err(NetworkStatusStoreError::UnreachableNotSuccess.into());
        }

        self.store_data(wallet, status).await
    }

    /// Demotes existing statuses to `CACHE`
    pub fn refresh<'a, I>(&self, wallet: &WalletId, networks: I)
    where
        I: IntoIterator<Item = &'a NetworkId>,
    {
        self.set_source_as_cache(wallet, networks);
    }

    /// Demotes existing statuses to `CACHE`. Missing networks stay missing
    pub fn set_source_as_cache<'a, I>(&self, wallet: &WalletId, networks: I)
    where
        I: IntoIterator<Item = &'a NetworkId>,
    {
        self.update_status_source(wallet, networks, StatusSource::Cache);
    }

    /// Demotes existing statuses to `ONLY_CACHE`.
    ///
    /// Missing networks get `value` (or an unreachable status without address)
    pub fn set_source_as_only_cache<'a, I>(
        &self,
        wallet: &WalletId,
        networks: I,
        value: Option<NetworkStatusValue>,
    ) where
        I: IntoIterator<Item = &'a NetworkId>,
    {
        self.update_portfolio(wallet, |portfolio| {
            for network in networks {
                let demoted = portfolio.modify(network, |current| {
                    current.with_source(StatusSource::OnlyCache)
                });

                if !demoted {
                    let value = value
                        .clone()
                        .unwrap_or_else(NetworkStatusValue::unreachable)
                        .with_source(StatusSource::OnlyCache);
                    portfolio.upsert(NetworkStatus::new(network.clone(), value));
                }
            }
        });
    }

    /// Marks the network fetch as failed.
    ///
    /// The last known value is kept with `ONLY_CACHE` source, otherwise the
    /// network becomes unreachable
    pub fn store_error(&self, wallet: &WalletId, network: &NetworkId) {
        self.update_portfolio(wallet, |portfolio| {
            let demoted =
                portfolio.modify(network, |value| value.with_source(StatusSource::OnlyCache));

            if !demoted {
                portfolio.upsert(NetworkStatus::new(
                    network.clone(),
                    NetworkStatusValue::unreachable(),
                ));
            }
        });
    }

    /// Replaces the source of existing statuses. Missing networks stay missing
    pub fn update_status_source<'a, I>(&self, wallet: &WalletId, networks: I, source: StatusSource)
    where
        I: IntoIterator<Item = &'a NetworkId>,
    {
        self.update_portfolio(wallet, |portfolio| {
            for network in networks {
                portfolio.modify(network, |value| value.with_source(source));
            }
        });
    }

    /// Replaces the source of existing statuses.
    ///
    /// Statuses produced by `if_not_found` for missing networks are stored as is
    pub fn update_status_source_or_insert<'a, I, F>(
        &self,
        wallet: &WalletId,
        networks: I,
        source: StatusSource,
        if_not_found: F,
    ) where
        I: IntoIterator<Item = &'a NetworkId>,
        F: Fn(&NetworkId) -> NetworkStatus,
    {
        self.update_portfolio(wallet, |portfolio| {
            for network in networks {
                if !portfolio.modify(network, |value| value.with_source(source)) {
                    portfolio.upsert(if_not_found(network));
                }
            }
        });
    }

    async fn store_data(&self, wallet: &WalletId, status: NetworkStatus) -> Result<()> {
        let record = to_persisted(&status);

        let _guard = self.write_lock.lock().await;
        self.update_portfolio(wallet, |portfolio| {
            portfolio.upsert(status);
        });

        if let Some(record) = record {
            log::debug!("Persisting {} status of wallet {wallet}", record.network);

            let wallet = wallet.clone();
            self.cold_store
                .update_data(Box::new(move |stored: &mut StoredStatuses| {
                    stored
                        .entry(wallet)
                        .or_default()
                        .insert(record.network.clone(), record);
                }))
                .await?;
        }

        Ok(())
    }

    fn update_portfolio<F>(&self, wallet: &WalletId, f: F)
    where
        F: FnOnce(&mut Portfolio),
    {
        self.hot_cache
            .update(|statuses| f(statuses.entry(wallet.clone()).or_default()));
    }
}

fn ensure_actual(value: &NetworkStatusValue) -> Result<(), NetworkStatusStoreError> {
    match value.source() {
        Some(StatusSource::Actual) | None => Ok(()),
        Some(_) => Err(NetworkStatusStoreError::NotActualSource),
    }
}

/// Restored statuses never override the ones already present in the hot cache
fn seed_hot_cache(hot_cache: &StatusesHotCache, stored: StoredStatuses) {
    if stored.is_empty() {
        return;
    }

    let wallet_count = stored.len();
    hot_cache.update(|statuses| {
        for (wallet, records) in stored {
            let portfolio = statuses.entry(wallet).or_default();
            for record in records.into_values() {
                portfolio.insert_missing(from_persisted(record).with_source(StatusSource::Cache));
            }
        }
    });

    log::debug!("Restored network statuses of {wallet_count} wallets");
}

#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum NetworkStatusStoreError {
    #[error("Method storeActual can be called only with StatusSource.ACTUAL")]
    NotActualSource,
    #[error("Method storeActual can't be called with unreachable status")]
    UnreachableNotSuccess,
}
