//! Primitive consensus types: hashes, addresses, currency and identifiers.

use std::fmt;
use std::str::FromStr;

use merlin::Transcript;
use serde::{Deserialize, Serialize};

/// A 256-bit hash. All identifiers on the chain are derived from these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

macro_rules! serialize_hex32 {
    ($t:ident) => {
        impl serde::Serialize for $t {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> serde::Deserialize<'de> for $t {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <std::borrow::Cow<str>>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }

        impl FromStr for $t {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut buf = [0u8; 32];
                hex::decode_to_slice(s, &mut buf)?;
                Ok($t(buf))
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($t), "({})"), hex::encode(self.0))
            }
        }
    };
}

serialize_hex32!(Hash256);

/// A 32-byte hash identifying an output lock.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

serialize_hex32!(Address);

impl Address {
    /// The all-zero address. Outputs sent here are unspendable; funding
    /// refuses it as a change destination.
    pub const VOID: Address = Address([0u8; 32]);

    pub fn is_void(&self) -> bool {
        *self == Address::VOID
    }
}

macro_rules! hash_wrapper {
    ($(#[$doc:meta])* $t:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $t(pub Hash256);

        impl From<Hash256> for $t {
            fn from(h: Hash256) -> Self {
                $t(h)
            }
        }

        impl From<$t> for Hash256 {
            fn from(id: $t) -> Self {
                id.0
            }
        }

        impl FromStr for $t {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map($t)
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl fmt::Debug for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($t), "({})"), self.0)
            }
        }
    };
}

hash_wrapper!(
    /// Identifier of a block.
    BlockID
);
hash_wrapper!(
    /// Identifier of a v1 or v2 transaction.
    TransactionID
);
hash_wrapper!(
    /// Identifier of a siacoin output.
    SiacoinOutputID
);
hash_wrapper!(
    /// Identifier of a siafund output.
    SiafundOutputID
);

/// Hashes data appended to a domain-labeled transcript.
pub(crate) fn hash_all(label: &'static [u8], f: impl FnOnce(&mut Transcript)) -> Hash256 {
    let mut t = Transcript::new(label);
    f(&mut t);
    let mut buf = [0u8; 32];
    t.challenge_bytes(b"chain.hash", &mut buf);
    Hash256(buf)
}

/// An amount of siacoins.
///
/// Encoded as a decimal string in JSON since the full range exceeds what
/// JSON numbers can carry. Arithmetic is checked: silently wrapping a
/// balance would corrupt the data model, so overflow and underflow abort.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Currency(pub u128);

impl Currency {
    pub const ZERO: Currency = Currency(0);

    pub fn new(v: u128) -> Currency {
        Currency(v)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Currency) -> Option<Currency> {
        self.0.checked_add(other.0).map(Currency)
    }

    pub fn checked_sub(self, other: Currency) -> Option<Currency> {
        self.0.checked_sub(other.0).map(Currency)
    }
}

impl std::ops::Add for Currency {
    type Output = Currency;

    fn add(self, other: Currency) -> Currency {
        self.checked_add(other).expect("currency addition overflow")
    }
}

impl std::ops::Sub for Currency {
    type Output = Currency;

    fn sub(self, other: Currency) -> Currency {
        self.checked_sub(other)
            .expect("currency subtraction underflow")
    }
}

impl std::ops::AddAssign for Currency {
    fn add_assign(&mut self, other: Currency) {
        *self = *self + other;
    }
}

impl From<u64> for Currency {
    fn from(v: u64) -> Currency {
        Currency(v as u128)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Currency {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Currency)
    }
}

impl Serialize for Currency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Height and block id of a point on the chain.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub struct ChainIndex {
    pub height: u64,
    pub id: BlockID,
}

impl fmt::Display for ChainIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.height, self.id)
    }
}

/// The data proving an element's membership in the consensus accumulator.
/// `leaf_index` and `merkle_proof` change on every applied or reverted
/// block, even when the element itself is untouched.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateElement {
    pub id: Hash256,
    pub leaf_index: u64,
    pub merkle_proof: Vec<Hash256>,
}

/// A volume of siacoins owned by an address.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiacoinOutput {
    pub value: Currency,
    pub address: Address,
}

/// A volume of siafunds owned by an address.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiafundOutput {
    pub value: u64,
    pub address: Address,
}

/// A siacoin output together with its accumulator state.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiacoinElement {
    #[serde(flatten)]
    pub state_element: StateElement,
    pub siacoin_output: SiacoinOutput,
    /// Height at which the output becomes spendable. Zero for regular
    /// transaction outputs; delayed for miner and contract payouts.
    pub maturity_height: u64,
}

impl SiacoinElement {
    pub fn id(&self) -> SiacoinOutputID {
        SiacoinOutputID(self.state_element.id)
    }
}

/// A siafund output together with its accumulator state.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiafundElement {
    #[serde(flatten)]
    pub state_element: StateElement,
    pub siafund_output: SiafundOutput,
    /// Height at which the owner started accruing its claim.
    pub claim_start: u64,
}

impl SiafundElement {
    pub fn id(&self) -> SiafundOutputID {
        SiafundOutputID(self.state_element.id)
    }
}

/// Serde adapter for binary blobs rendered as hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = <std::borrow::Cow<str>>::deserialize(deserializer)?;
        hex::decode(s.as_ref()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let h = Hash256([0xab; 32]);
        let encoded = serde_json::to_string(&h).unwrap();
        assert_eq!(encoded, format!("\"{}\"", "ab".repeat(32)));
        let decoded: Hash256 = serde_json::from_str(&encoded).unwrap();
        assert_eq!(h, decoded);

        assert!("zz".repeat(16).parse::<Hash256>().is_err());
        assert!("abcd".parse::<Hash256>().is_err());
    }

    #[test]
    fn currency_strings() {
        let c = Currency(340_282_366_920_938_463_463_374_607_431_768_211_455);
        let encoded = serde_json::to_string(&c).unwrap();
        let decoded: Currency = serde_json::from_str(&encoded).unwrap();
        assert_eq!(c, decoded);
    }

    #[test]
    #[should_panic(expected = "currency subtraction underflow")]
    fn currency_underflow_aborts() {
        let _ = Currency(1) - Currency(2);
    }
}
