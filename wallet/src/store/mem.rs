//! In-memory store.
//!
//! The whole store state lives behind one mutex. A transaction clones the
//! state, lets the closure mutate the clone through the capability traits,
//! and swaps the clone in only on success, which gives the all-or-nothing
//! contract without a log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chain::{
    Address, ChainIndex, SiacoinElement, SiacoinOutputID, SiafundElement, SiafundOutputID,
    StateElement,
};

use crate::errors::{Error, StoreError};
use crate::store::{ApplyTx, RevertTx, Store, UpdateTx};
use crate::types::{unix_ms, AddressBalance, Balance, Event, Wallet, WalletAddress, WalletID};

#[derive(Default, Clone)]
struct State {
    tip: ChainIndex,
    last_wallet_id: u128,
    wallets: BTreeMap<u128, Wallet>,
    bindings: HashMap<u128, BTreeMap<Address, WalletAddress>>,
    balances: HashMap<Address, Balance>,
    siacoin_elements: BTreeMap<SiacoinOutputID, SiacoinElement>,
    siafund_elements: BTreeMap<SiafundOutputID, SiafundElement>,
    events: Vec<Event>,
}

impl State {
    fn claimed(&self, addr: &Address) -> bool {
        self.bindings.values().any(|set| set.contains_key(addr))
    }

    fn wallet_addresses(&self, id: WalletID) -> Result<BTreeMap<Address, WalletAddress>, Error> {
        if !self.wallets.contains_key(&id.0) {
            return Err(Error::NotFound);
        }
        Ok(self.bindings.get(&id.0).cloned().unwrap_or_default())
    }

    /// Drops the rows of any address in `addrs` that no wallet claims
    /// anymore; events survive while any of their addresses stays claimed.
    fn prune_unclaimed(&mut self, addrs: impl IntoIterator<Item = Address>) {
        let unclaimed: HashSet<Address> = addrs
            .into_iter()
            .filter(|addr| !self.claimed(addr))
            .collect();
        if unclaimed.is_empty() {
            return;
        }
        self.balances.retain(|addr, _| !unclaimed.contains(addr));
        self.siacoin_elements
            .retain(|_, se| !unclaimed.contains(&se.siacoin_output.address));
        self.siafund_elements
            .retain(|_, se| !unclaimed.contains(&se.siafund_output.address));
        let state = &*self;
        let events = state
            .events
            .iter()
            .filter(|event| event.relevant.iter().any(|addr| state.claimed(addr)))
            .cloned()
            .collect();
        self.events = events;
    }
}

struct MemTx<'a> {
    state: &'a mut State,
}

impl UpdateTx for MemTx<'_> {
    fn siacoin_state_elements(&mut self) -> Result<Vec<StateElement>, StoreError> {
        Ok(self
            .state
            .siacoin_elements
            .values()
            .map(|se| se.state_element.clone())
            .collect())
    }

    fn update_siacoin_state_elements(
        &mut self,
        elements: Vec<StateElement>,
    ) -> Result<(), StoreError> {
        for element in elements {
            let id = SiacoinOutputID(element.id);
            match self.state.siacoin_elements.get_mut(&id) {
                Some(se) => se.state_element = element,
                None => {
                    return Err(StoreError::new(format!(
                        "unknown siacoin state element {id}"
                    )))
                }
            }
        }
        Ok(())
    }

    fn siafund_state_elements(&mut self) -> Result<Vec<StateElement>, StoreError> {
        Ok(self
            .state
            .siafund_elements
            .values()
            .map(|se| se.state_element.clone())
            .collect())
    }

    fn update_siafund_state_elements(
        &mut self,
        elements: Vec<StateElement>,
    ) -> Result<(), StoreError> {
        for element in elements {
            let id = SiafundOutputID(element.id);
            match self.state.siafund_elements.get_mut(&id) {
                Some(se) => se.state_element = element,
                None => {
                    return Err(StoreError::new(format!(
                        "unknown siafund state element {id}"
                    )))
                }
            }
        }
        Ok(())
    }

    fn add_siacoin_elements(&mut self, elements: Vec<SiacoinElement>) -> Result<(), StoreError> {
        for se in elements {
            self.state.siacoin_elements.insert(se.id(), se);
        }
        Ok(())
    }

    fn remove_siacoin_elements(&mut self, ids: &[SiacoinOutputID]) -> Result<(), StoreError> {
        for id in ids {
            self.state.siacoin_elements.remove(id);
        }
        Ok(())
    }

    fn add_siafund_elements(&mut self, elements: Vec<SiafundElement>) -> Result<(), StoreError> {
        for se in elements {
            self.state.siafund_elements.insert(se.id(), se);
        }
        Ok(())
    }

    fn remove_siafund_elements(&mut self, ids: &[SiafundOutputID]) -> Result<(), StoreError> {
        for id in ids {
            self.state.siafund_elements.remove(id);
        }
        Ok(())
    }

    fn matured_siacoin_elements(
        &mut self,
        index: ChainIndex,
    ) -> Result<Vec<SiacoinElement>, StoreError> {
        Ok(self
            .state
            .siacoin_elements
            .values()
            .filter(|se| se.maturity_height == index.height)
            .cloned()
            .collect())
    }

    fn address_relevant(&mut self, address: &Address) -> Result<bool, StoreError> {
        Ok(self.state.claimed(address))
    }

    fn address_balance(&mut self, address: &Address) -> Result<Balance, StoreError> {
        Ok(self.state.balances.get(address).copied().unwrap_or_default())
    }

    fn update_balances(&mut self, balances: Vec<AddressBalance>) -> Result<(), StoreError> {
        for ab in balances {
            self.state.balances.insert(ab.address, ab.balance);
        }
        Ok(())
    }
}

impl ApplyTx for MemTx<'_> {
    fn add_events(&mut self, events: Vec<Event>) -> Result<(), StoreError> {
        self.state.events.extend(events);
        Ok(())
    }
}

impl RevertTx for MemTx<'_> {
    fn revert_events(&mut self, index: ChainIndex) -> Result<(), StoreError> {
        self.state.events.retain(|event| event.index != index);
        Ok(())
    }
}

/// A `Store` kept entirely in memory.
#[derive(Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }
}

impl Store for MemStore {
    fn tip(&self) -> Result<ChainIndex, StoreError> {
        Ok(self.state.lock().unwrap().tip)
    }

    fn apply_chain_state(
        &self,
        index: ChainIndex,
        f: &mut dyn FnMut(&mut dyn ApplyTx) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let mut work = state.clone();
        f(&mut MemTx { state: &mut work })?;
        work.tip = index;
        *state = work;
        Ok(())
    }

    fn revert_chain_state(
        &self,
        index: ChainIndex,
        f: &mut dyn FnMut(&mut dyn RevertTx) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let mut work = state.clone();
        f(&mut MemTx { state: &mut work })?;
        work.tip = index;
        *state = work;
        Ok(())
    }

    fn add_wallet(&self, mut wallet: Wallet) -> Result<Wallet, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.last_wallet_id += 1;
        wallet.id = WalletID(state.last_wallet_id);
        wallet.created_at_ms = unix_ms();
        wallet.updated_at_ms = wallet.created_at_ms;
        state.wallets.insert(wallet.id.0, wallet.clone());
        Ok(wallet)
    }

    fn update_wallet(&self, wallet: Wallet) -> Result<Wallet, Error> {
        let mut state = self.state.lock().unwrap();
        let stored = state.wallets.get_mut(&wallet.id.0).ok_or(Error::NotFound)?;
        stored.name = wallet.name;
        stored.description = wallet.description;
        stored.metadata = wallet.metadata;
        stored.updated_at_ms = unix_ms();
        Ok(stored.clone())
    }

    fn delete_wallet(&self, id: WalletID) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.wallets.remove(&id.0);
        let removed = state.bindings.remove(&id.0);
        if let Some(bindings) = removed {
            state.prune_unclaimed(bindings.into_keys());
        }
        Ok(())
    }

    fn wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self.state.lock().unwrap().wallets.values().cloned().collect())
    }

    fn add_address(&self, id: WalletID, address: WalletAddress) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if !state.wallets.contains_key(&id.0) {
            return Err(Error::NotFound);
        }
        state
            .bindings
            .entry(id.0)
            .or_default()
            .insert(address.address, address);
        Ok(())
    }

    fn remove_address(&self, id: WalletID, address: Address) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if !state.wallets.contains_key(&id.0) {
            return Err(Error::NotFound);
        }
        if let Some(bindings) = state.bindings.get_mut(&id.0) {
            bindings.remove(&address);
        }
        state.prune_unclaimed([address]);
        Ok(())
    }

    fn addresses(&self, id: WalletID) -> Result<Vec<WalletAddress>, Error> {
        let state = self.state.lock().unwrap();
        Ok(state.wallet_addresses(id)?.values().cloned().collect())
    }

    fn wallet_balance(&self, id: WalletID) -> Result<Balance, Error> {
        let state = self.state.lock().unwrap();
        let mut total = Balance::default();
        for addr in state.wallet_addresses(id)?.keys() {
            if let Some(balance) = state.balances.get(addr) {
                total.siacoins = total.siacoins + balance.siacoins;
                total.immature_siacoins = total.immature_siacoins + balance.immature_siacoins;
                total.siafunds += balance.siafunds;
            }
        }
        Ok(total)
    }

    fn wallet_events(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Event>, Error> {
        let state = self.state.lock().unwrap();
        let addrs = state.wallet_addresses(id)?;
        Ok(state
            .events
            .iter()
            .rev()
            .filter(|event| event.relevant.iter().any(|addr| addrs.contains_key(addr)))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn wallet_unspent_siacoin_elements(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SiacoinElement>, Error> {
        let state = self.state.lock().unwrap();
        let addrs = state.wallet_addresses(id)?;
        Ok(state
            .siacoin_elements
            .values()
            .filter(|se| addrs.contains_key(&se.siacoin_output.address))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn wallet_unspent_siafund_elements(
        &self,
        id: WalletID,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<SiafundElement>, Error> {
        let state = self.state.lock().unwrap();
        let addrs = state.wallet_addresses(id)?;
        Ok(state
            .siafund_elements
            .values()
            .filter(|se| addrs.contains_key(&se.siafund_output.address))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn siacoin_element(&self, id: SiacoinOutputID) -> Result<Option<SiacoinElement>, StoreError> {
        Ok(self.state.lock().unwrap().siacoin_elements.get(&id).cloned())
    }

    fn siafund_element(&self, id: SiafundOutputID) -> Result<Option<SiafundElement>, StoreError> {
        Ok(self.state.lock().unwrap().siafund_elements.get(&id).cloned())
    }
}
