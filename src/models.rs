use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::utils::*;

/// Opaque user wallet identifier
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub String);

impl WalletId {
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a blockchain network within a wallet portfolio
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NetworkId {
    pub raw_id: String,
    #[serde(default)]
    pub derivation_path: DerivationPath,
}

impl NetworkId {
    pub fn new<T: Into<String>>(raw_id: T) -> Self {
        Self {
            raw_id: raw_id.into(),
            derivation_path: DerivationPath::None,
        }
    }

    pub fn with_derivation_path(mut self, derivation_path: DerivationPath) -> Self {
        self.derivation_path = derivation_path;
        self
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.derivation_path {
            DerivationPath::None => f.write_str(&self.raw_id),
            DerivationPath::Card(path) | DerivationPath::Custom(path) => {
                write!(f, "{}:{}", self.raw_id, path)
            }
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "path")]
pub enum DerivationPath {
    #[default]
    None,
    Card(String),
    Custom(String),
}

/// Freshness of a network status
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusSource {
    /// Just obtained from a live fetch
    Actual,
    /// Reused from the durable storage or demoted from `Actual`
    Cache,
    /// Last known value shown while the fetch attempt failed
    OnlyCache,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actual => "ACTUAL",
            Self::Cache => "CACHE",
            Self::OnlyCache => "ONLY_CACHE",
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NetworkAddress {
    Single {
        default_address: Address,
    },
    Selectable {
        default_address: Address,
        available_addresses: BTreeSet<Address>,
    },
}

impl NetworkAddress {
    pub fn single<T: Into<String>>(value: T) -> Self {
        Self::Single {
            default_address: Address {
                value: value.into(),
                kind: AddressType::Primary,
            },
        }
    }

    pub fn default_address(&self) -> &Address {
        match self {
            Self::Single { default_address } | Self::Selectable { default_address, .. } => {
                default_address
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address {
    pub value: String,
    pub kind: AddressType,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Primary,
    Secondary,
}

/// Currency identifier inside a network (coin or token)
pub type CurrencyId = String;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Amount {
    Loaded(#[serde(with = "serde_string")] BigUint),
    NotFound,
}

impl Amount {
    pub fn loaded<T: Into<BigUint>>(value: T) -> Self {
        Self::Loaded(value.into())
    }
}

/// Network status of a single network in the wallet portfolio
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub network: NetworkId,
    pub value: NetworkStatusValue,
}

impl NetworkStatus {
    pub fn new(network: NetworkId, value: NetworkStatusValue) -> Self {
        Self { network, value }
    }

    pub fn with_source(self, source: StatusSource) -> Self {
        Self {
            network: self.network,
            value: self.value.with_source(source),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NetworkStatusValue {
    Verified {
        address: NetworkAddress,
        amounts: BTreeMap<CurrencyId, Amount>,
        #[serde(default)]
        pending_transactions: BTreeMap<CurrencyId, BTreeSet<String>>,
        source: StatusSource,
    },
    NoAccount {
        address: NetworkAddress,
        #[serde(with = "serde_string")]
        amount_to_create_account: BigUint,
        error_message: String,
        source: StatusSource,
    },
    Unreachable {
        address: Option<NetworkAddress>,
    },
    MissedDerivation,
    Loading,
}

impl NetworkStatusValue {
    /// Placeholder used when a network has no status yet
    pub fn unreachable() -> Self {
        Self::Unreachable { address: None }
    }

    /// Returns `None` for variants which carry no freshness information
    pub fn source(&self) -> Option<StatusSource> {
        match self {
            Self::Verified { source, .. } | Self::NoAccount { source, .. } => Some(*source),
            Self::Unreachable { .. } | Self::MissedDerivation | Self::Loading => None,
        }
    }

    pub fn is_sourced(&self) -> bool {
        self.source().is_some()
    }

    pub fn with_source(self, source: StatusSource) -> Self {
        with_source(self, source)
    }
}

/// Returns the same value with the replaced source. Sourceless variants are returned as is
pub fn with_source(value: NetworkStatusValue, source: StatusSource) -> NetworkStatusValue {
    match value {
        NetworkStatusValue::Verified {
            address,
            amounts,
            pending_transactions,
            ..
        } => NetworkStatusValue::Verified {
            address,
            amounts,
            pending_transactions,
            source,
        },
        NetworkStatusValue::NoAccount {
            address,
            amount_to_create_account,
            error_message,
            ..
        } => NetworkStatusValue::NoAccount {
            address,
            amount_to_create_account,
            error_message,
            source,
        },
        value @ (NetworkStatusValue::Unreachable { .. }
        | NetworkStatusValue::MissedDerivation
        | NetworkStatusValue::Loading) => value,
    }
}

/// All network statuses of one wallet, at most one per network
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Portfolio(BTreeMap<NetworkId, NetworkStatus>);

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, network: &NetworkId) -> Option<&NetworkStatus> {
        self.0.get(network)
    }

    pub fn contains(&self, network: &NetworkId) -> bool {
        self.0.contains_key(network)
    }

    /// Inserts the status, replacing the previous one for the same network
    pub fn upsert(&mut self, status: NetworkStatus) -> Option<NetworkStatus> {
        self.0.insert(status.network.clone(), status)
    }

    /// Inserts the status only if its network is not present yet
    pub fn insert_missing(&mut self, status: NetworkStatus) -> bool {
        match self.0.entry(status.network.clone()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(status);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Replaces the value of an existing status. Returns `false` if the network is absent
    pub fn modify<F>(&mut self, network: &NetworkId, f: F) -> bool
    where
        F: FnOnce(NetworkStatusValue) -> NetworkStatusValue,
    {
        match self.0.get_mut(network) {
            Some(status) => {
                let value = std::mem::replace(&mut status.value, NetworkStatusValue::Loading);
                status.value = f(value);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkStatus> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<NetworkStatus> for Portfolio {
    fn from_iter<I: IntoIterator<Item = NetworkStatus>>(iter: I) -> Self {
        let mut portfolio = Self::new();
        for status in iter {
            portfolio.upsert(status);
        }
        portfolio
    }
}

impl IntoIterator for Portfolio {
    type Item = NetworkStatus;
    type IntoIter = btree_map::IntoValues<NetworkId, NetworkStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(source: StatusSource) -> NetworkStatusValue {
        NetworkStatusValue::Verified {
            address: NetworkAddress::single("0xabc"),
            amounts: BTreeMap::from([("ETH".to_owned(), Amount::loaded(5u32))]),
            pending_transactions: BTreeMap::from([(
                "ETH".to_owned(),
                BTreeSet::from(["0x01".to_owned()]),
            )]),
            source,
        }
    }

    #[test]
    fn with_source_keeps_payload() {
        let value = verified(StatusSource::Actual).with_source(StatusSource::OnlyCache);
        assert_eq!(value, verified(StatusSource::OnlyCache));
        assert_eq!(value.source(), Some(StatusSource::OnlyCache));

        let no_account = NetworkStatusValue::NoAccount {
            address: NetworkAddress::single("r123"),
            amount_to_create_account: BigUint::from(10u32),
            error_message: "Account not found".to_owned(),
            source: StatusSource::Actual,
        };
        match no_account.with_source(StatusSource::Cache) {
            NetworkStatusValue::NoAccount {
                amount_to_create_account,
                error_message,
                source,
                ..
            } => {
                assert_eq!(amount_to_create_account, BigUint::from(10u32));
                assert_eq!(error_message, "Account not found");
                assert_eq!(source, StatusSource::Cache);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn sourceless_values_ignore_source() {
        for value in [
            NetworkStatusValue::unreachable(),
            NetworkStatusValue::Unreachable {
                address: Some(NetworkAddress::single("0xabc")),
            },
            NetworkStatusValue::MissedDerivation,
            NetworkStatusValue::Loading,
        ] {
            assert!(!value.is_sourced());
            assert_eq!(value.clone().with_source(StatusSource::OnlyCache), value);
        }
    }

    #[test]
    fn status_source_order_and_names() {
        assert!(StatusSource::Actual < StatusSource::Cache);
        assert!(StatusSource::Cache < StatusSource::OnlyCache);
        assert_eq!(StatusSource::OnlyCache.to_string(), "ONLY_CACHE");
        assert_eq!(
            serde_json::to_string(&StatusSource::OnlyCache).trust_me(),
            r#""ONLY_CACHE""#
        );
    }

    #[test]
    fn portfolio_keeps_one_status_per_network() {
        let ethereum = NetworkId::new("ethereum");
        let mut portfolio = Portfolio::new();

        assert!(portfolio
            .upsert(NetworkStatus::new(ethereum.clone(), NetworkStatusValue::Loading))
            .is_none());
        let previous = portfolio.upsert(NetworkStatus::new(
            ethereum.clone(),
            verified(StatusSource::Actual),
        ));

        assert_eq!(previous.map(|status| status.value), Some(NetworkStatusValue::Loading));
        assert_eq!(portfolio.len(), 1);
        assert!(!portfolio.insert_missing(NetworkStatus::new(
            ethereum.clone(),
            NetworkStatusValue::MissedDerivation
        )));
        assert_eq!(
            portfolio.get(&ethereum).map(|status| &status.value),
            Some(&verified(StatusSource::Actual))
        );
    }

    #[test]
    fn portfolio_modify_only_existing() {
        let ethereum = NetworkId::new("ethereum");
        let stellar = NetworkId::new("stellar");
        let mut portfolio: Portfolio = [NetworkStatus::new(
            ethereum.clone(),
            verified(StatusSource::Actual),
        )]
        .into_iter()
        .collect();

        assert!(portfolio.modify(&ethereum, |value| value.with_source(StatusSource::Cache)));
        assert!(!portfolio.modify(&stellar, |value| value.with_source(StatusSource::Cache)));
        assert_eq!(portfolio.len(), 1);
        assert_eq!(
            portfolio.get(&ethereum).and_then(|status| status.value.source()),
            Some(StatusSource::Cache)
        );
    }

    #[test]
    fn network_id_display() {
        assert_eq!(NetworkId::new("ethereum").to_string(), "ethereum");
        assert_eq!(
            NetworkId::new("bitcoin")
                .with_derivation_path(DerivationPath::Card("m/44'/0'/0'/0/0".to_owned()))
                .to_string(),
            "bitcoin:m/44'/0'/0'/0/0"
        );
    }
}
