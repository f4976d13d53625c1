//! The wallet manager: registration, reads, funding, and the sync task
//! that projects chain updates into the store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chain::{Address, ChainIndex, Currency, Hash256, Transaction};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::Error;
use crate::reserve::{fund_siacoins, fund_siafunds, OutputLocks};
use crate::store::Store;
use crate::types::{Balance, Event, PoolTransaction, Wallet, WalletAddress, WalletID};
use crate::update::{apply_chain_updates, revert_chain_update};

/// Largest events page a read will return.
pub const EVENTS_PAGE_LIMIT: usize = 500;
/// Largest outputs page a read will return; also the candidate cap for
/// funding selection.
pub const OUTPUTS_PAGE_LIMIT: usize = 1000;

/// A funded transaction: the ids the caller must sign and the unconfirmed
/// pool transactions it depends on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundResult {
    pub transaction: Transaction,
    pub to_sign: Vec<Hash256>,
    pub depends_on: Vec<Transaction>,
}

/// Manages registered wallets over a store, keeping the store in step with
/// the chain manager.
pub struct WalletManager<S: Store> {
    store: S,
    chain: Arc<chain::Manager>,
    locks: OutputLocks,
    // serializes sync against subscribe-rewinds; never held across await
    sync_mu: Mutex<()>,
}

impl<S: Store> WalletManager<S> {
    /// Creates a manager and brings the store up to the chain tip.
    pub fn new(store: S, chain: Arc<chain::Manager>) -> Result<WalletManager<S>, Error> {
        let wm = WalletManager {
            store,
            chain,
            locks: OutputLocks::new(),
            sync_mu: Mutex::new(()),
        };
        wm.sync()?;
        Ok(wm)
    }

    /// The last chain index the store committed.
    pub fn tip(&self) -> Result<ChainIndex, Error> {
        Ok(self.store.tip()?)
    }

    /// Follows the chain manager's tip channel, applying updates as they
    /// land. Returns when the chain manager shuts down.
    pub async fn run(self: Arc<Self>) {
        let mut tip_rx = self.chain.subscribe_tip();
        loop {
            if tip_rx.changed().await.is_err() {
                return;
            }
            let tip = *tip_rx.borrow_and_update();
            match self.sync() {
                Ok(()) => debug!(height = tip.height, "indexed chain update"),
                Err(err) => error!(%err, height = tip.height, "failed to index chain update"),
            }
        }
    }

    /// Applies any updates between the store tip and the chain tip: reverts
    /// for a stale branch first, then applies in one batch.
    pub fn sync(&self) -> Result<(), Error> {
        let _guard = self.sync_mu.lock().unwrap();
        self.sync_locked()
    }

    fn sync_locked(&self) -> Result<(), Error> {
        let tip = self.store.tip()?;
        let (reverts, applies) = self.chain.updates_since(tip)?;
        for cru in &reverts {
            self.store
                .revert_chain_state(cru.state().index, &mut |tx| revert_chain_update(tx, cru))?;
        }
        if let Some(last) = applies.last() {
            let new_tip = last.state().index;
            self.store
                .apply_chain_state(new_tip, &mut |tx| apply_chain_updates(tx, &applies))?;
        }
        Ok(())
    }

    /// Rewinds the stored view to `start_height` and replays the canonical
    /// chain from there. Registered addresses pick up any history they
    /// missed; a height at or above the tip is a plain resync.
    pub fn subscribe(&self, start_height: u64) -> Result<(), Error> {
        let _guard = self.sync_mu.lock().unwrap();
        loop {
            let tip = self.store.tip()?;
            if tip.height <= start_height || tip.height == 0 {
                break;
            }
            let cru = self.chain.revert_update_for(tip)?;
            self.store
                .revert_chain_state(cru.state().index, &mut |tx| revert_chain_update(tx, &cru))?;
        }
        self.sync_locked()
    }

    /// Registers a wallet, preserving the caller's name, description and
    /// metadata; the store assigns id and timestamps.
    pub fn add_wallet(&self, wallet: Wallet) -> Result<Wallet, Error> {
        Ok(self.store.add_wallet(wallet)?)
    }

    pub fn update_wallet(&self, wallet: Wallet) -> Result<Wallet, Error> {
        self.store.update_wallet(wallet)
    }

    pub fn delete_wallet(&self, id: WalletID) -> Result<(), Error> {
        Ok(self.store.delete_wallet(id)?)
    }

    pub fn wallets(&self) -> Result<Vec<Wallet>, Error> {
        Ok(self.store.wallets()?)
    }

    pub fn add_address(&self, id: WalletID, address: WalletAddress) -> Result<(), Error> {
        self.store.add_address(id, address)
    }

    pub fn remove_address(&self, id: WalletID, address: Address) -> Result<(), Error> {
        self.store.remove_address(id, address)
    }

    pub fn addresses(&self, id: WalletID) -> Result<Vec<WalletAddress>, Error> {
        self.store.addresses(id)
    }

    /// The wallet's balance, maintained by the applier/reverter rather than
    /// recomputed here.
    pub fn wallet_balance(&self, id: WalletID) -> Result<Balance, Error> {
        self.store.wallet_balance(id)
    }

    pub fn events(&self, id: WalletID, offset: usize, limit: usize) -> Result<Vec<Event>, Error> {
        self.store
            .wallet_events(id, offset, limit.min(EVENTS_PAGE_LIMIT))
    }

    pub fn unspent_siacoin_outputs(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<chain::SiacoinElement>, Error> {
        self.store
            .wallet_unspent_siacoin_elements(id, offset, limit.min(OUTPUTS_PAGE_LIMIT))
    }

    pub fn unspent_siafund_outputs(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<chain::SiafundElement>, Error> {
        self.store
            .wallet_unspent_siafund_elements(id, offset, limit.min(OUTPUTS_PAGE_LIMIT))
    }

    /// Filters a transaction pool down to the entries that touch the
    /// wallet, annotating each with the wallet-relevant flow.
    pub fn annotate(
        &self,
        id: WalletID,
        pool: Vec<Transaction>,
    ) -> Result<Vec<PoolTransaction>, Error> {
        let addrs: HashSet<Address> = self
            .store
            .addresses(id)?
            .into_iter()
            .map(|wa| wa.address)
            .collect();

        let mut annotated = Vec::new();
        for txn in pool {
            let mut inflow = Currency::ZERO;
            let mut outflow = Currency::ZERO;
            let mut ours = false;

            for output in &txn.siacoin_outputs {
                if addrs.contains(&output.address) {
                    inflow = inflow + output.value;
                    ours = true;
                }
            }
            for input in &txn.siacoin_inputs {
                if let Some(se) = self.store.siacoin_element(input.parent_id)? {
                    if addrs.contains(&se.siacoin_output.address) {
                        outflow = outflow + se.siacoin_output.value;
                        ours = true;
                    }
                }
            }
            for output in &txn.siafund_outputs {
                if addrs.contains(&output.address) {
                    ours = true;
                }
            }
            for input in &txn.siafund_inputs {
                if let Some(se) = self.store.siafund_element(input.parent_id)? {
                    if addrs.contains(&se.siafund_output.address) {
                        ours = true;
                    }
                }
            }

            if !ours {
                continue;
            }
            let txid = txn.id();
            annotated.push(PoolTransaction {
                id: txid,
                received_ms: self.chain.pool_received_ms(txid).unwrap_or_default(),
                transaction: txn,
                inflow,
                outflow,
            });
        }
        Ok(annotated)
    }

    /// Marks outputs in use for `duration`; fails with `Conflict` on any
    /// active reservation.
    pub fn reserve(&self, ids: &[Hash256], duration: Duration) -> Result<(), Error> {
        self.locks.reserve(ids, duration)
    }

    pub fn release(&self, ids: &[Hash256]) {
        self.locks.release(ids)
    }

    /// Funds a transaction with the wallet's siacoin outputs.
    pub fn fund(
        &self,
        id: WalletID,
        mut txn: Transaction,
        amount: Currency,
        change_address: Address,
    ) -> Result<FundResult, Error> {
        // UTXOs and pool are fetched before the reservation lock is taken
        let utxos = self
            .store
            .wallet_unspent_siacoin_elements(id, 0, OUTPUTS_PAGE_LIMIT)?;
        let pool = self.chain.pool_transactions();
        let to_sign = fund_siacoins(
            &mut txn,
            amount,
            change_address,
            utxos,
            &pool,
            &self.locks,
            &mut OsRng,
        )?;
        let depends_on = self.chain.unconfirmed_parents(&txn);
        Ok(FundResult {
            transaction: txn,
            to_sign,
            depends_on,
        })
    }

    /// Funds a transaction with the wallet's siafund outputs, stamping
    /// `claim_address` on every input.
    pub fn fund_siafunds(
        &self,
        id: WalletID,
        mut txn: Transaction,
        amount: u64,
        change_address: Address,
        claim_address: Address,
    ) -> Result<FundResult, Error> {
        let utxos = self
            .store
            .wallet_unspent_siafund_elements(id, 0, OUTPUTS_PAGE_LIMIT)?;
        let pool = self.chain.pool_transactions();
        let to_sign = fund_siafunds(
            &mut txn,
            amount,
            change_address,
            claim_address,
            utxos,
            &pool,
            &self.locks,
            &mut OsRng,
        )?;
        let depends_on = self.chain.unconfirmed_parents(&txn);
        Ok(FundResult {
            transaction: txn,
            to_sign,
            depends_on,
        })
    }
}
