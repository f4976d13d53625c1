//! Consensus-facing data model and an in-memory chain manager.
//!
//! The wallet indexer consumes this crate through three surfaces: the
//! element types it persists, the `ApplyUpdate`/`RevertUpdate` streams the
//! [`Manager`] emits, and the transaction pool the funding engine checks
//! for conflicts. Block and transaction *validation* is deliberately thin;
//! consumers trust the manager to deliver well-formed updates in order.

pub mod block;
pub mod merkle;
mod manager;
mod state;
mod types;
mod update;

#[cfg(test)]
mod tests;

pub use block::{
    Block, ContractResolution, SiacoinInput, SiafundInput, Transaction, TransactionSignature,
    UnlockConditions, V2SiacoinInput, V2SiafundInput, V2Transaction,
};
pub use manager::{Error, Manager};
pub use state::{Network, State};
pub use types::{
    Address, BlockID, ChainIndex, Currency, Hash256, SiacoinElement, SiacoinOutput,
    SiacoinOutputID, SiafundElement, SiafundOutput, SiafundOutputID, StateElement, TransactionID,
};
pub use update::{siacoin_leaf_hash, siafund_leaf_hash, ApplyUpdate, RevertUpdate};
