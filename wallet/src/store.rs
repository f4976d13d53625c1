//! The persistence contract.
//!
//! Chain state changes reach the store through three narrow transaction
//! capabilities: [`UpdateTx`] carries the operations shared by both chain
//! directions, [`ApplyTx`] can additionally append events, and [`RevertTx`]
//! can only discard them. The split makes it a compile-time error for a
//! revert to add events or for an apply to delete them.
//!
//! Every transaction is atomic: if the closure driving it fails, the store
//! must be left at its pre-call state. A partial commit corrupts element
//! proofs and balances beyond recovery.

mod mem;

pub use mem::MemStore;

use chain::{
    Address, ChainIndex, SiacoinElement, SiacoinOutputID, SiafundElement, SiafundOutputID,
    StateElement,
};

use crate::errors::{Error, StoreError};
use crate::types::{AddressBalance, Balance, Event, Wallet, WalletAddress, WalletID};

/// Operations available inside both apply and revert transactions.
pub trait UpdateTx {
    /// All tracked siacoin state elements. Fetched once per batch; proofs
    /// are refreshed in memory and written back with
    /// [`UpdateTx::update_siacoin_state_elements`].
    fn siacoin_state_elements(&mut self) -> Result<Vec<StateElement>, StoreError>;

    /// Replaces the proofs of the given elements. Every id must already be
    /// tracked.
    fn update_siacoin_state_elements(
        &mut self,
        elements: Vec<StateElement>,
    ) -> Result<(), StoreError>;

    fn siafund_state_elements(&mut self) -> Result<Vec<StateElement>, StoreError>;

    fn update_siafund_state_elements(
        &mut self,
        elements: Vec<StateElement>,
    ) -> Result<(), StoreError>;

    fn add_siacoin_elements(&mut self, elements: Vec<SiacoinElement>) -> Result<(), StoreError>;

    /// Removes elements by id. Ids that were never added are ignored; an
    /// element created and spent within one batch is removed without ever
    /// having been stored.
    fn remove_siacoin_elements(&mut self, ids: &[SiacoinOutputID]) -> Result<(), StoreError>;

    fn add_siafund_elements(&mut self, elements: Vec<SiafundElement>) -> Result<(), StoreError>;

    fn remove_siafund_elements(&mut self, ids: &[SiafundOutputID]) -> Result<(), StoreError>;

    /// Tracked outputs whose `maturity_height` equals `index.height`.
    fn matured_siacoin_elements(
        &mut self,
        index: ChainIndex,
    ) -> Result<Vec<SiacoinElement>, StoreError>;

    /// Whether any registered wallet claims the address.
    fn address_relevant(&mut self, address: &Address) -> Result<bool, StoreError>;

    /// The stored balance of an address; zero if unknown.
    fn address_balance(&mut self, address: &Address) -> Result<Balance, StoreError>;

    /// Overwrites balances in bulk.
    fn update_balances(&mut self, balances: Vec<AddressBalance>) -> Result<(), StoreError>;
}

/// A transaction that applies chain updates.
pub trait ApplyTx: UpdateTx {
    fn add_events(&mut self, events: Vec<Event>) -> Result<(), StoreError>;
}

/// A transaction that reverts one chain update.
pub trait RevertTx: UpdateTx {
    /// Deletes every event recorded at `index`.
    fn revert_events(&mut self, index: ChainIndex) -> Result<(), StoreError>;
}

/// A wallet store. Reads observe the last committed transaction.
pub trait Store: Send + Sync + 'static {
    /// The chain index of the last committed apply or revert.
    fn tip(&self) -> Result<ChainIndex, StoreError>;

    /// Runs `f` inside a single atomic apply transaction; on success the
    /// stored tip becomes `index`.
    fn apply_chain_state(
        &self,
        index: ChainIndex,
        f: &mut dyn FnMut(&mut dyn ApplyTx) -> Result<(), Error>,
    ) -> Result<(), Error>;

    /// Runs `f` inside a single atomic revert transaction; on success the
    /// stored tip becomes `index`.
    fn revert_chain_state(
        &self,
        index: ChainIndex,
        f: &mut dyn FnMut(&mut dyn RevertTx) -> Result<(), Error>,
    ) -> Result<(), Error>;

    /// Persists a new wallet, assigning its id and timestamps.
    fn add_wallet(&self, wallet: Wallet) -> Result<Wallet, StoreError>;

    /// Updates a wallet's name, description and metadata.
    fn update_wallet(&self, wallet: Wallet) -> Result<Wallet, Error>;

    /// Deletes a wallet and everything only it referenced: address
    /// bindings, and the balances, UTXOs and events of addresses no other
    /// wallet claims. Idempotent.
    fn delete_wallet(&self, id: WalletID) -> Result<(), StoreError>;

    fn wallets(&self) -> Result<Vec<Wallet>, StoreError>;

    fn add_address(&self, id: WalletID, address: WalletAddress) -> Result<(), Error>;

    /// Removes an address binding. UTXOs held by other wallets claiming the
    /// same address are untouched.
    fn remove_address(&self, id: WalletID, address: Address) -> Result<(), Error>;

    fn addresses(&self, id: WalletID) -> Result<Vec<WalletAddress>, Error>;

    /// The wallet's balance, summed from the stored per-address rows.
    fn wallet_balance(&self, id: WalletID) -> Result<Balance, Error>;

    /// Wallet events, newest first.
    fn wallet_events(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Event>, Error>;

    fn wallet_unspent_siacoin_elements(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SiacoinElement>, Error>;

    fn wallet_unspent_siafund_elements(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SiafundElement>, Error>;

    /// Looks up a tracked siacoin element by id, wallet-independent.
    fn siacoin_element(&self, id: SiacoinOutputID) -> Result<Option<SiacoinElement>, StoreError>;

    fn siafund_element(&self, id: SiafundOutputID) -> Result<Option<SiafundElement>, StoreError>;
}
