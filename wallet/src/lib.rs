//! Wallet indexing and transaction funding over a UTXO chain.
//!
//! The indexer watches a chain manager, projects each block's effects into
//! per-address balances, per-wallet UTXO sets and event streams, and keeps
//! the accumulator proof of every tracked element current. A separate
//! funding engine picks unspent outputs for new transactions and guards
//! them against concurrent reuse with short-lived reservations.
//!
//! Persistence is abstracted behind [`Store`] and its three transaction
//! capabilities; [`MemStore`] is the in-memory implementation.

mod errors;
pub mod events;
mod manager;
pub mod reserve;
mod store;
mod types;
mod update;

#[cfg(test)]
mod tests;

pub use errors::{Error, StoreError};
pub use events::applied_events;
pub use manager::{FundResult, WalletManager, EVENTS_PAGE_LIMIT, OUTPUTS_PAGE_LIMIT};
pub use reserve::OutputLocks;
pub use store::{ApplyTx, MemStore, RevertTx, Store, UpdateTx};
pub use types::{
    AddressBalance, Balance, Event, EventData, PoolTransaction, Wallet, WalletAddress, WalletID,
};
pub use update::{apply_chain_updates, revert_chain_update};
