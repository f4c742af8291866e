use std::collections::HashMap;
use std::hash::Hash;

use futures_util::stream::{self, Stream};
use tokio::sync::watch;

use crate::utils::*;

/// In-process observable key-value storage.
///
/// Every mutation replaces the whole map under the channel lock, so concurrent
/// writers never lose each other's updates. Observers receive the whole map and
/// filter it by their own key.
pub struct HotCache<K, V> {
    tx: watch::Sender<HashMap<K, V>>,
}

impl<K, V> Default for HotCache<K, V> {
    fn default() -> Self {
        let (tx, _) = watch::channel(HashMap::new());
        Self { tx }
    }
}

impl<K, V> HotCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the whole map
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.tx.borrow().clone()
    }

    /// Returns the current value for the key or `None` if it was never stored
    pub fn snapshot_or_none(&self, key: &K) -> Option<V> {
        self.tx.borrow().get(key).cloned()
    }

    /// Atomically modifies the map and notifies all observers
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<K, V>) -> R,
    {
        let mut result = None;
        self.tx.send_modify(|map| result = Some(f(map)));
        result.trust_me()
    }

    /// Replaces the value for the key
    pub fn store(&self, key: K, value: V) {
        self.update(|map| {
            map.insert(key, value);
        });
    }

    /// Returns a stream of values for the key.
    ///
    /// The current value (if any) is emitted immediately, then each value which
    /// differs from the previously emitted one. Nothing is emitted while the key is
    /// absent. The stream ends when the cache is dropped.
    pub fn observe(&self, key: K) -> impl Stream<Item = V> + Send + 'static
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let state = ObserverState {
            rx: self.tx.subscribe(),
            key,
            last_seen: None,
            primed: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if state.primed && state.rx.changed().await.is_err() {
                    return None;
                }
                state.primed = true;

                let current = state.rx.borrow_and_update().get(&state.key).cloned();
                if let Some(value) = current {
                    if state.last_seen.as_ref() != Some(&value) {
                        state.last_seen = Some(value.clone());
                        return Some((value, state));
                    }
                }
            }
        })
    }
}

struct ObserverState<K, V> {
    rx: watch::Receiver<HashMap<K, V>>,
    key: K,
    last_seen: Option<V>,
    primed: bool,
}
