//! Network parameters and the consensus state snapshot.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::types::{Address, ChainIndex, Currency, Hash256};

const GENESIS_TIMESTAMP_MS: u64 = 1_717_200_000_000;

/// Fixed parameters of a chain network.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    /// Number of blocks before a miner or contract payout becomes spendable.
    pub maturity_delay: u64,
    /// Recipient of the per-block subsidy, if any.
    pub foundation_address: Address,
    /// Per-block subsidy amount; zero disables the subsidy entirely.
    pub foundation_subsidy: Currency,
}

impl Network {
    pub fn mainnet() -> Network {
        Network {
            name: "mainnet".into(),
            maturity_delay: 144,
            foundation_address: Address::VOID,
            foundation_subsidy: Currency::ZERO,
        }
    }

    /// The network's genesis block.
    pub fn genesis(&self) -> Block {
        Block {
            timestamp_ms: GENESIS_TIMESTAMP_MS,
            ..Block::default()
        }
    }
}

/// Consensus state after a block has been applied: the tip index and the
/// root of the element accumulator at that tip. Every tracked element's
/// proof must verify against `elements_root`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub network: Network,
    pub index: ChainIndex,
    pub elements_root: Hash256,
}

impl State {
    /// Maturity height for delayed payouts created at this state's tip.
    pub fn maturity_height(&self) -> u64 {
        self.index.height + self.network.maturity_delay
    }
}
