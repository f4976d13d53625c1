//! Wallet-facing data types.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chain::{
    Address, ChainIndex, Currency, Hash256, SiacoinElement, Transaction, TransactionID,
    V2Transaction,
};
use serde::{Deserialize, Serialize};

pub(crate) fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// Opaque 128-bit wallet identifier, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct WalletID(pub u128);

impl fmt::Display for WalletID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for WalletID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletID({:032x})", self.0)
    }
}

impl FromStr for WalletID {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u128::from_str_radix(s, 16).map(WalletID)
    }
}

impl Serialize for WalletID {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WalletID {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named set of addresses. Multiple wallets may claim the same address;
/// it appears in each.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(default)]
    pub id: WalletID,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

/// An address registered to a wallet, with caller-supplied context.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Funds attributed to one address, partitioned by maturity.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub siacoins: Currency,
    pub immature_siacoins: Currency,
    pub siafunds: u64,
}

/// Pairs an address with its balance.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBalance {
    pub address: Address,
    #[serde(flatten)]
    pub balance: Balance,
}

/// What a wallet-visible event was.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EventData {
    /// A v1 transaction touching a registered address.
    Transaction { transaction: Transaction },
    /// A v2 transaction touching a registered address.
    V2Transaction { transaction: V2Transaction },
    /// A miner payout created for a registered address.
    MinerPayout { siacoin_element: SiacoinElement },
    /// A foundation subsidy created for a registered address.
    FoundationSubsidy { siacoin_element: SiacoinElement },
    /// A delayed contract-resolution payout for a registered address.
    ContractPayout {
        siacoin_element: SiacoinElement,
        missed: bool,
    },
}

/// Something that happened on chain and is visible to at least one
/// registered address. Events are append-only per chain direction and are
/// discarded when their block is reverted.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Hash256,
    pub index: ChainIndex,
    pub timestamp_ms: u64,
    pub relevant: Vec<Address>,
    #[serde(flatten)]
    pub data: EventData,
}

/// An unconfirmed pool transaction annotated with the delta it would apply
/// to a particular wallet.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTransaction {
    pub id: TransactionID,
    pub transaction: Transaction,
    pub received_ms: u64,
    pub inflow: Currency,
    pub outflow: Currency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_id_hex() {
        let id = WalletID(0xdead_beef);
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, "\"000000000000000000000000deadbeef\"");
        let decoded: WalletID = serde_json::from_str(&encoded).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn event_data_is_tagged() {
        let event = Event {
            id: Hash256::default(),
            index: ChainIndex::default(),
            timestamp_ms: 0,
            relevant: vec![Address::VOID],
            data: EventData::Transaction {
                transaction: Transaction::default(),
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "transaction");
        assert!(value["data"]["transaction"].is_object());
    }
}
