//! Chain-update projection: the applier and its inverse.
//!
//! [`apply_chain_updates`] folds a batch of apply updates into balance
//! deltas, element additions/removals, events and refreshed accumulator
//! proofs, then flushes everything in a fixed order. [`revert_chain_update`]
//! undoes exactly one block. The two are mutually inverse: applying a block
//! and reverting it leaves the store bitwise identical.

use std::collections::{HashMap, HashSet};

use chain::{
    Address, ApplyUpdate, Block, ChainIndex, Hash256, RevertUpdate, SiacoinElement,
    SiacoinOutputID, SiafundElement, SiafundOutputID,
};

use crate::errors::Error;
use crate::events::applied_events;
use crate::store::{ApplyTx, RevertTx, UpdateTx};
use crate::types::{AddressBalance, Balance};

fn store_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Store(format!("{context}: {err}"))
}

/// Outputs created and spent within the same block.
///
/// The consensus layer's own ephemeral marker is set before subscribers are
/// notified, so it cannot be trusted here; ephemerality is recomputed by
/// intersecting the block's creations with its spends.
fn ephemeral_outputs(block: &Block) -> HashSet<Hash256> {
    let mut created: HashSet<Hash256> = HashSet::new();
    let mut ephemeral = HashSet::new();
    for txn in &block.transactions {
        for i in 0..txn.siacoin_outputs.len() {
            created.insert(txn.siacoin_output_id(i).0);
        }
        for input in &txn.siacoin_inputs {
            if created.contains(&input.parent_id.0) {
                ephemeral.insert(input.parent_id.0);
            }
        }
        for i in 0..txn.siafund_outputs.len() {
            created.insert(txn.siafund_output_id(i).0);
        }
        for input in &txn.siafund_inputs {
            if created.contains(&input.parent_id.0) {
                ephemeral.insert(input.parent_id.0);
            }
        }
    }
    for txn in &block.v2_transactions {
        for i in 0..txn.siacoin_outputs.len() {
            created.insert(txn.siacoin_output_id(i).0);
        }
        for input in &txn.siacoin_inputs {
            if created.contains(&input.parent.state_element.id) {
                ephemeral.insert(input.parent.state_element.id);
            }
        }
        for i in 0..txn.siafund_outputs.len() {
            created.insert(txn.siafund_output_id(i).0);
        }
        for input in &txn.siafund_inputs {
            if created.contains(&input.parent.state_element.id) {
                ephemeral.insert(input.parent.state_element.id);
            }
        }
    }
    ephemeral
}

fn balance_mut<'a, T: UpdateTx + ?Sized>(
    tx: &mut T,
    balances: &'a mut HashMap<Address, Balance>,
    addr: Address,
) -> Result<&'a mut Balance, Error> {
    use std::collections::hash_map::Entry;
    match balances.entry(addr) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let balance = tx
                .address_balance(&addr)
                .map_err(|e| store_err("failed to get address balance", e))?;
            Ok(entry.insert(balance))
        }
    }
}

fn balance_changes(balances: HashMap<Address, Balance>) -> Vec<AddressBalance> {
    balances
        .into_iter()
        .map(|(address, balance)| AddressBalance { address, balance })
        .collect()
}

/// Atomically applies a batch of chain updates to a store. Updates must be
/// in chain order; side effects are buffered in memory and flushed once at
/// the end of the batch.
pub fn apply_chain_updates<T: ApplyTx + ?Sized>(
    tx: &mut T,
    updates: &[ApplyUpdate],
) -> Result<(), Error> {
    let mut events = Vec::new();
    let mut balances: HashMap<Address, Balance> = HashMap::new();
    let mut new_siacoin_elements: HashMap<SiacoinOutputID, SiacoinElement> = HashMap::new();
    let mut new_siafund_elements: HashMap<SiafundOutputID, SiafundElement> = HashMap::new();
    let mut spent_siacoin_elements: HashSet<SiacoinOutputID> = HashSet::new();
    let mut spent_siafund_elements: HashSet<SiafundOutputID> = HashSet::new();

    // fetch all siacoin and siafund state elements
    let mut siacoin_state_elements = tx
        .siacoin_state_elements()
        .map_err(|e| store_err("failed to get siacoin state elements", e))?;
    let mut siafund_state_elements = tx
        .siafund_state_elements()
        .map_err(|e| store_err("failed to get siafund state elements", e))?;

    for cau in updates {
        let tip_height = cau.state().index.height;

        // move the value of any newly matured outputs out of the immature
        // balance of their addresses
        let matured = tx
            .matured_siacoin_elements(cau.state().index)
            .map_err(|e| store_err("failed to get matured siacoin elements", e))?;
        for se in matured {
            let balance = balance_mut(tx, &mut balances, se.siacoin_output.address)?;
            balance.immature_siacoins = balance.immature_siacoins - se.siacoin_output.value;
            balance.siacoins = balance.siacoins + se.siacoin_output.value;
        }

        let ephemeral = ephemeral_outputs(cau.block());

        // stage the siacoin element diff
        let mut siacoin_delta: Vec<(SiacoinElement, bool)> = Vec::new();
        cau.for_each_siacoin_element(|se, spent| siacoin_delta.push((se.clone(), spent)));
        for (se, spent) in siacoin_delta {
            if ephemeral.contains(&se.state_element.id) {
                continue;
            }
            let relevant = tx
                .address_relevant(&se.siacoin_output.address)
                .map_err(|e| store_err("failed to check if address is relevant", e))?;
            if !relevant {
                continue;
            }

            if spent {
                // if the element was created in this batch it was never
                // stored; cancel the pending add instead
                new_siacoin_elements.remove(&se.id());
                spent_siacoin_elements.insert(se.id());
            } else {
                new_siacoin_elements.insert(se.id(), se.clone());
            }

            let balance = balance_mut(tx, &mut balances, se.siacoin_output.address)?;
            if se.maturity_height > tip_height {
                balance.immature_siacoins = balance.immature_siacoins + se.siacoin_output.value;
            } else if spent {
                balance.siacoins = balance.siacoins - se.siacoin_output.value;
            } else {
                balance.siacoins = balance.siacoins + se.siacoin_output.value;
            }
        }

        // stage the siafund element diff
        let mut siafund_delta: Vec<(SiafundElement, bool)> = Vec::new();
        cau.for_each_siafund_element(|se, spent| siafund_delta.push((se.clone(), spent)));
        for (se, spent) in siafund_delta {
            if ephemeral.contains(&se.state_element.id) {
                continue;
            }
            let relevant = tx
                .address_relevant(&se.siafund_output.address)
                .map_err(|e| store_err("failed to check if address is relevant", e))?;
            if !relevant {
                continue;
            }

            if spent {
                new_siafund_elements.remove(&se.id());
                spent_siafund_elements.insert(se.id());
            } else {
                new_siafund_elements.insert(se.id(), se.clone());
            }

            let balance = balance_mut(tx, &mut balances, se.siafund_output.address)?;
            if spent {
                if balance.siafunds < se.siafund_output.value {
                    panic!("negative siafund balance");
                }
                balance.siafunds -= se.siafund_output.value;
            } else {
                balance.siafunds += se.siafund_output.value;
            }
        }

        // extract events
        let extracted = applied_events(cau.state(), cau.block(), cau, |addr| {
            tx.address_relevant(addr)
        })
        .map_err(|e| store_err("failed to extract events", e))?;
        events.extend(extracted);

        // refresh proofs: pending new elements and every tracked element
        for ele in new_siacoin_elements.values_mut() {
            cau.update_element_proof(&mut ele.state_element);
        }
        for se in siacoin_state_elements.iter_mut() {
            cau.update_element_proof(se);
        }
        for ele in new_siafund_elements.values_mut() {
            cau.update_element_proof(&mut ele.state_element);
        }
        for se in siafund_state_elements.iter_mut() {
            cau.update_element_proof(se);
        }
    }

    // flush, in a fixed order
    tx.update_balances(balance_changes(balances))
        .map_err(|e| store_err("failed to update address balance", e))?;

    tx.add_siacoin_elements(new_siacoin_elements.into_values().collect())
        .map_err(|e| store_err("failed to add siacoin elements", e))?;
    let spent_sc: Vec<SiacoinOutputID> = spent_siacoin_elements.iter().copied().collect();
    tx.remove_siacoin_elements(&spent_sc)
        .map_err(|e| store_err("failed to remove siacoin elements", e))?;

    tx.add_siafund_elements(new_siafund_elements.into_values().collect())
        .map_err(|e| store_err("failed to add siafund elements", e))?;
    let spent_sf: Vec<SiafundOutputID> = spent_siafund_elements.iter().copied().collect();
    tx.remove_siafund_elements(&spent_sf)
        .map_err(|e| store_err("failed to remove siafund elements", e))?;

    tx.add_events(events)
        .map_err(|e| store_err("failed to add events", e))?;

    // write back the refreshed proofs, dropping elements spent in the batch
    siacoin_state_elements.retain(|se| !spent_siacoin_elements.contains(&SiacoinOutputID(se.id)));
    tx.update_siacoin_state_elements(siacoin_state_elements)
        .map_err(|e| store_err("failed to update siacoin state elements", e))?;

    siafund_state_elements.retain(|se| !spent_siafund_elements.contains(&SiafundOutputID(se.id)));
    tx.update_siafund_state_elements(siafund_state_elements)
        .map_err(|e| store_err("failed to update siafund state elements", e))?;

    Ok(())
}

/// Atomically reverts one chain update from a store, restoring spent
/// outputs and deleting created ones.
pub fn revert_chain_update<T: RevertTx + ?Sized>(
    tx: &mut T,
    cru: &RevertUpdate,
) -> Result<(), Error> {
    let mut balances: HashMap<Address, Balance> = HashMap::new();
    let mut added_siacoin_elements: Vec<SiacoinElement> = Vec::new();
    let mut deleted_siacoin_elements: Vec<SiacoinOutputID> = Vec::new();
    let mut added_siafund_elements: Vec<SiafundElement> = Vec::new();
    let mut deleted_siafund_elements: Vec<SiafundOutputID> = Vec::new();

    let ephemeral = ephemeral_outputs(cru.block());

    // the update's state is the parent's; the block being rolled back sat
    // one height above it
    let parent_height = cru.state().index.height;
    let reverted_index = ChainIndex {
        height: parent_height + 1,
        id: cru.block().id(),
    };

    // outputs that matured in the reverted block become immature again
    let matured = tx
        .matured_siacoin_elements(reverted_index)
        .map_err(|e| store_err("failed to get matured siacoin elements", e))?;
    for se in matured {
        let balance = balance_mut(tx, &mut balances, se.siacoin_output.address)?;
        balance.immature_siacoins = balance.immature_siacoins + se.siacoin_output.value;
        balance.siacoins = balance.siacoins - se.siacoin_output.value;
    }

    let mut siacoin_delta: Vec<(SiacoinElement, bool)> = Vec::new();
    cru.for_each_siacoin_element(|se, spent| siacoin_delta.push((se.clone(), spent)));
    for (se, spent) in siacoin_delta {
        let relevant = tx
            .address_relevant(&se.siacoin_output.address)
            .map_err(|e| store_err("failed to check if address is relevant", e))?;
        if !relevant || ephemeral.contains(&se.state_element.id) {
            continue;
        }

        if spent {
            // the block destroyed this output; restore it
            added_siacoin_elements.push(se.clone());
        } else {
            // the block created this output; delete it
            deleted_siacoin_elements.push(se.id());
        }

        let balance = balance_mut(tx, &mut balances, se.siacoin_output.address)?;
        if se.maturity_height > parent_height {
            balance.immature_siacoins = balance.immature_siacoins - se.siacoin_output.value;
        } else if spent {
            balance.siacoins = balance.siacoins + se.siacoin_output.value;
        } else {
            balance.siacoins = balance.siacoins - se.siacoin_output.value;
        }
    }

    let mut siafund_delta: Vec<(SiafundElement, bool)> = Vec::new();
    cru.for_each_siafund_element(|se, spent| siafund_delta.push((se.clone(), spent)));
    for (se, spent) in siafund_delta {
        let relevant = tx
            .address_relevant(&se.siafund_output.address)
            .map_err(|e| store_err("failed to check if address is relevant", e))?;
        if !relevant || ephemeral.contains(&se.state_element.id) {
            continue;
        }

        if spent {
            added_siafund_elements.push(se.clone());
        } else {
            deleted_siafund_elements.push(se.id());
        }

        let balance = balance_mut(tx, &mut balances, se.siafund_output.address)?;
        if spent {
            balance.siafunds += se.siafund_output.value;
        } else {
            if balance.siafunds < se.siafund_output.value {
                panic!("negative siafund balance");
            }
            balance.siafunds -= se.siafund_output.value;
        }
    }

    tx.update_balances(balance_changes(balances))
        .map_err(|e| store_err("failed to update address balance", e))?;

    // revert siacoin element changes, then bring every surviving proof back
    // to the parent state
    tx.add_siacoin_elements(added_siacoin_elements)
        .map_err(|e| store_err("failed to add siacoin elements", e))?;
    tx.remove_siacoin_elements(&deleted_siacoin_elements)
        .map_err(|e| store_err("failed to remove siacoin elements", e))?;
    let mut siacoin_state_elements = tx
        .siacoin_state_elements()
        .map_err(|e| store_err("failed to get siacoin state elements", e))?;
    for se in siacoin_state_elements.iter_mut() {
        cru.update_element_proof(se);
    }
    tx.update_siacoin_state_elements(siacoin_state_elements)
        .map_err(|e| store_err("failed to update siacoin state elements", e))?;

    tx.add_siafund_elements(added_siafund_elements)
        .map_err(|e| store_err("failed to add siafund elements", e))?;
    tx.remove_siafund_elements(&deleted_siafund_elements)
        .map_err(|e| store_err("failed to remove siafund elements", e))?;
    let mut siafund_state_elements = tx
        .siafund_state_elements()
        .map_err(|e| store_err("failed to get siafund state elements", e))?;
    for se in siafund_state_elements.iter_mut() {
        cru.update_element_proof(se);
    }
    tx.update_siafund_state_elements(siafund_state_elements)
        .map_err(|e| store_err("failed to update siafund state elements", e))?;

    tx.revert_events(reverted_index)
        .map_err(|e| store_err("failed to revert events", e))?;

    Ok(())
}
