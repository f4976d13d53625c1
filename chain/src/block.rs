//! Blocks and the two transaction formats.
//!
//! v1 transactions reference their parents by id and leave the proof burden
//! to the chain; v2 transactions carry the full parent element, accumulator
//! proof included.

use serde::{Deserialize, Serialize};

use crate::types::{
    hash_all, Address, BlockID, Currency, Hash256, SiacoinElement, SiacoinOutput, SiacoinOutputID,
    SiafundElement, SiafundOutput, SiafundOutputID, TransactionID,
};

/// Conditions that must be satisfied to spend a v1 output. Left empty by
/// the funding engine for the signing client to fill in.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConditions {
    pub timelock: u64,
    pub public_keys: Vec<String>,
    pub signatures_required: u64,
}

/// A v1 siacoin input.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiacoinInput {
    pub parent_id: SiacoinOutputID,
    #[serde(default)]
    pub unlock_conditions: UnlockConditions,
}

/// A v1 siafund input. Spending a siafund output sends its accrued claim
/// to `claim_address`.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiafundInput {
    pub parent_id: SiafundOutputID,
    pub claim_address: Address,
    #[serde(default)]
    pub unlock_conditions: UnlockConditions,
}

/// A signature covering a transaction, attributed to one of its parents.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSignature {
    pub parent_id: Hash256,
    #[serde(with = "crate::types::hex_bytes")]
    pub signature: Vec<u8>,
}

/// A legacy (v1) transaction.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub siacoin_inputs: Vec<SiacoinInput>,
    #[serde(default)]
    pub siacoin_outputs: Vec<SiacoinOutput>,
    #[serde(default)]
    pub siafund_inputs: Vec<SiafundInput>,
    #[serde(default)]
    pub siafund_outputs: Vec<SiafundOutput>,
    #[serde(default)]
    pub miner_fee: Currency,
    #[serde(default, with = "crate::types::hex_bytes")]
    pub arbitrary_data: Vec<u8>,
    #[serde(default)]
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// The transaction id. Signatures are excluded so that signing does not
    /// change the id the outputs were derived from.
    pub fn id(&self) -> TransactionID {
        let encoded = bincode::serialize(&(
            &self.siacoin_inputs,
            &self.siacoin_outputs,
            &self.siafund_inputs,
            &self.siafund_outputs,
            &self.miner_fee,
            &self.arbitrary_data,
        ))
        .expect("encoding in-memory transaction cannot fail");
        TransactionID(hash_all(b"chain.txid", |t| {
            t.append_message(b"txn", &encoded);
        }))
    }

    /// Id of the i-th siacoin output created by this transaction.
    pub fn siacoin_output_id(&self, i: usize) -> SiacoinOutputID {
        SiacoinOutputID(hash_all(b"chain.siacoin.output", |t| {
            t.append_message(b"txid", &self.id().0 .0);
            t.append_u64(b"index", i as u64);
        }))
    }

    /// Id of the i-th siafund output created by this transaction.
    pub fn siafund_output_id(&self, i: usize) -> SiafundOutputID {
        SiafundOutputID(hash_all(b"chain.siafund.output", |t| {
            t.append_message(b"txid", &self.id().0 .0);
            t.append_u64(b"index", i as u64);
        }))
    }
}

/// Binary-encodable serde value used for opaque spend policies.
pub type SpendPolicy = serde_json::Value;

/// A v2 siacoin input: the parent element travels with the transaction.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2SiacoinInput {
    pub parent: SiacoinElement,
    #[serde(default)]
    pub satisfied_policy: SpendPolicy,
}

/// A v2 siafund input.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2SiafundInput {
    pub parent: SiafundElement,
    pub claim_address: Address,
    #[serde(default)]
    pub satisfied_policy: SpendPolicy,
}

/// Resolution of a storage contract. The payout output is created with a
/// maturity delay, like a miner payout.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResolution {
    pub contract_id: Hash256,
    pub payout: SiacoinOutput,
    pub missed: bool,
}

impl ContractResolution {
    pub fn payout_id(&self) -> SiacoinOutputID {
        SiacoinOutputID(hash_all(b"chain.contract.payout", |t| {
            t.append_message(b"contract", &self.contract_id.0);
        }))
    }
}

/// An accumulator-based (v2) transaction.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Transaction {
    #[serde(default)]
    pub siacoin_inputs: Vec<V2SiacoinInput>,
    #[serde(default)]
    pub siacoin_outputs: Vec<SiacoinOutput>,
    #[serde(default)]
    pub siafund_inputs: Vec<V2SiafundInput>,
    #[serde(default)]
    pub siafund_outputs: Vec<SiafundOutput>,
    #[serde(default)]
    pub file_contract_resolutions: Vec<ContractResolution>,
    #[serde(default)]
    pub miner_fee: Currency,
    #[serde(default, with = "crate::types::hex_bytes")]
    pub arbitrary_data: Vec<u8>,
}

impl V2Transaction {
    pub fn id(&self) -> TransactionID {
        // Parent proofs change with every block, so hash parents by id only.
        let parent_ids: Vec<Hash256> = self
            .siacoin_inputs
            .iter()
            .map(|i| i.parent.state_element.id)
            .chain(self.siafund_inputs.iter().map(|i| i.parent.state_element.id))
            .collect();
        let encoded = bincode::serialize(&(
            &parent_ids,
            &self.siacoin_outputs,
            &self.siafund_outputs,
            &self.file_contract_resolutions,
            &self.miner_fee,
            &self.arbitrary_data,
        ))
        .expect("encoding in-memory transaction cannot fail");
        TransactionID(hash_all(b"chain.v2.txid", |t| {
            t.append_message(b"txn", &encoded);
        }))
    }

    pub fn siacoin_output_id(&self, i: usize) -> SiacoinOutputID {
        SiacoinOutputID(hash_all(b"chain.v2.siacoin.output", |t| {
            t.append_message(b"txid", &self.id().0 .0);
            t.append_u64(b"index", i as u64);
        }))
    }

    pub fn siafund_output_id(&self, i: usize) -> SiafundOutputID {
        SiafundOutputID(hash_all(b"chain.v2.siafund.output", |t| {
            t.append_message(b"txid", &self.id().0 .0);
            t.append_u64(b"index", i as u64);
        }))
    }
}

/// A block. Miner payouts mature `Network::maturity_delay` blocks after the
/// block that created them.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub parent_id: BlockID,
    pub nonce: u64,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub miner_payouts: Vec<SiacoinOutput>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default, rename = "v2transactions")]
    pub v2_transactions: Vec<V2Transaction>,
}

impl Block {
    pub fn id(&self) -> BlockID {
        let content = bincode::serialize(&(
            &self.miner_payouts,
            self.transactions.iter().map(Transaction::id).collect::<Vec<_>>(),
            self.v2_transactions.iter().map(V2Transaction::id).collect::<Vec<_>>(),
        ))
        .expect("encoding in-memory block cannot fail");
        BlockID(hash_all(b"chain.block", |t| {
            t.append_message(b"parent", &self.parent_id.0 .0);
            t.append_u64(b"nonce", self.nonce);
            t.append_u64(b"timestamp", self.timestamp_ms);
            t.append_message(b"content", &content);
        }))
    }

    /// Id of the i-th miner payout output of this block.
    pub fn miner_output_id(&self, i: usize) -> SiacoinOutputID {
        SiacoinOutputID(hash_all(b"chain.miner.payout", |t| {
            t.append_message(b"block", &self.id().0 .0);
            t.append_u64(b"index", i as u64);
        }))
    }

    /// Id of the foundation subsidy output of this block, if the network
    /// pays one.
    pub fn foundation_output_id(&self) -> SiacoinOutputID {
        SiacoinOutputID(hash_all(b"chain.foundation.subsidy", |t| {
            t.append_message(b"block", &self.id().0 .0);
        }))
    }
}
