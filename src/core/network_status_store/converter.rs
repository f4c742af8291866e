use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::models::*;
use crate::utils::*;

/// Reduced form of a trustworthy network status which survives restarts
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatusRecord {
    pub network: NetworkId,
    pub value: NetworkStatusRecordValue,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NetworkStatusRecordValue {
    Verified {
        address: NetworkAddress,
        amounts: BTreeMap<CurrencyId, Amount>,
    },
    NoAccount {
        address: NetworkAddress,
        #[serde(with = "serde_string")]
        amount_to_create_account: BigUint,
        error_message: String,
    },
}

/// Returns a record only for `Verified` and `NoAccount` statuses
/// with `ACTUAL` or `CACHE` source
pub fn to_persisted(status: &NetworkStatus) -> Option<NetworkStatusRecord> {
    let value = match &status.value {
        NetworkStatusValue::Verified {
            address,
            amounts,
            source: StatusSource::Actual | StatusSource::Cache,
            ..
        } => NetworkStatusRecordValue::Verified {
            address: address.clone(),
            amounts: amounts.clone(),
        },
        NetworkStatusValue::NoAccount {
            address,
            amount_to_create_account,
            error_message,
            source: StatusSource::Actual | StatusSource::Cache,
        } => NetworkStatusRecordValue::NoAccount {
            address: address.clone(),
            amount_to_create_account: amount_to_create_account.clone(),
            error_message: error_message.clone(),
        },
        _ => return None,
    };

    Some(NetworkStatusRecord {
        network: status.network.clone(),
        value,
    })
}

/// Restores a cached network status. Pending transactions are not persisted
pub fn from_persisted(record: NetworkStatusRecord) -> NetworkStatus {
    let value = match record.value {
        NetworkStatusRecordValue::Verified { address, amounts } => NetworkStatusValue::Verified {
            address,
            amounts,
            pending_transactions: Default::default(),
            source: StatusSource::Cache,
        },
        NetworkStatusRecordValue::NoAccount {
            address,
            amount_to_create_account,
            error_message,
        } => NetworkStatusValue::NoAccount {
            address,
            amount_to_create_account,
            error_message,
            source: StatusSource::Cache,
        },
    };

    NetworkStatus::new(record.network, value)
}
