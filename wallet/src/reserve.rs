//! Output reservation and transaction funding.
//!
//! [`OutputLocks`] is the only mutable process-global in the indexer: a
//! mutex-guarded map from output id to lock expiry. Funding selects from a
//! UTXO list fetched *before* the mutex is taken; nothing suspends while it
//! is held.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chain::{
    Address, Currency, Hash256, SiacoinElement, SiacoinInput, SiacoinOutput, SiafundElement,
    SiafundInput, SiafundOutput, Transaction,
};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::Error;

/// How long funding holds the outputs it selected. Callers that broadcast
/// or abandon the transaction sooner release them explicitly.
pub const FUND_LOCK_DURATION: Duration = Duration::from_secs(10 * 60);

/// Time-bounded, process-local locks over output ids. Reservations do not
/// survive a restart; callers that need durability re-reserve on startup.
#[derive(Default)]
pub struct OutputLocks {
    used: Mutex<HashMap<Hash256, Instant>>,
}

impl OutputLocks {
    pub fn new() -> OutputLocks {
        OutputLocks::default()
    }

    /// Marks the ids in use until `duration` elapses. Fails with `Conflict`
    /// if any id is already held, leaving none of them marked.
    pub fn reserve(&self, ids: &[Hash256], duration: Duration) -> Result<(), Error> {
        let mut used = self.used.lock().unwrap();
        let now = Instant::now();
        used.retain(|_, expiry| *expiry > now);
        if ids.iter().any(|id| used.contains_key(id)) {
            return Err(Error::Conflict);
        }
        let expiry = now + duration;
        for id in ids {
            used.insert(*id, expiry);
        }
        Ok(())
    }

    /// Releases the ids unconditionally.
    pub fn release(&self, ids: &[Hash256]) {
        let mut used = self.used.lock().unwrap();
        for id in ids {
            used.remove(id);
        }
    }
}

/// Selects unspent siacoin outputs covering `amount`, appends the matching
/// inputs (unlock conditions left for the signing caller) and a change
/// output, and locks the selected ids. Returns the ids to sign.
///
/// Candidates are shuffled uniformly at random before the greedy scan: the
/// selection must not cluster around any deterministic order. Tests inject
/// a seeded generator.
pub fn fund_siacoins<R: Rng + ?Sized>(
    txn: &mut Transaction,
    amount: Currency,
    change_address: Address,
    mut utxos: Vec<SiacoinElement>,
    pool: &[Transaction],
    locks: &OutputLocks,
    rng: &mut R,
) -> Result<Vec<Hash256>, Error> {
    if amount.is_zero() {
        return Ok(Vec::new());
    }

    let mut used = locks.used.lock().unwrap();
    let now = Instant::now();
    used.retain(|_, expiry| *expiry > now);

    let in_pool: HashSet<Hash256> = pool
        .iter()
        .flat_map(|ptxn| ptxn.siacoin_inputs.iter().map(|input| input.parent_id.0))
        .collect();

    utxos.shuffle(rng);
    let mut output_sum = Currency::ZERO;
    let mut funding_elements = Vec::new();
    for sce in utxos {
        let id = sce.state_element.id;
        if used.contains_key(&id) || in_pool.contains(&id) {
            continue;
        }
        output_sum = output_sum + sce.siacoin_output.value;
        funding_elements.push(sce);
        if output_sum >= amount {
            break;
        }
    }

    if output_sum < amount {
        return Err(Error::InsufficientBalance);
    } else if output_sum > amount {
        if change_address.is_void() {
            return Err(Error::ChangeAddressRequired);
        }
        txn.siacoin_outputs.push(SiacoinOutput {
            value: output_sum - amount,
            address: change_address,
        });
    }

    let expiry = now + FUND_LOCK_DURATION;
    let mut to_sign = Vec::with_capacity(funding_elements.len());
    for sce in funding_elements {
        let id = sce.state_element.id;
        txn.siacoin_inputs.push(SiacoinInput {
            parent_id: sce.id(),
            // unlock conditions left empty for the caller to fill in
            ..SiacoinInput::default()
        });
        to_sign.push(id);
        used.insert(id, expiry);
    }
    Ok(to_sign)
}

/// Siafund analogue of [`fund_siacoins`]; every input is stamped with the
/// caller's claim address.
pub fn fund_siafunds<R: Rng + ?Sized>(
    txn: &mut Transaction,
    amount: u64,
    change_address: Address,
    claim_address: Address,
    mut utxos: Vec<SiafundElement>,
    pool: &[Transaction],
    locks: &OutputLocks,
    rng: &mut R,
) -> Result<Vec<Hash256>, Error> {
    if amount == 0 {
        return Ok(Vec::new());
    }

    let mut used = locks.used.lock().unwrap();
    let now = Instant::now();
    used.retain(|_, expiry| *expiry > now);

    let in_pool: HashSet<Hash256> = pool
        .iter()
        .flat_map(|ptxn| ptxn.siafund_inputs.iter().map(|input| input.parent_id.0))
        .collect();

    utxos.shuffle(rng);
    let mut output_sum = 0u64;
    let mut funding_elements = Vec::new();
    for sfe in utxos {
        let id = sfe.state_element.id;
        if used.contains_key(&id) || in_pool.contains(&id) {
            continue;
        }
        output_sum += sfe.siafund_output.value;
        funding_elements.push(sfe);
        if output_sum >= amount {
            break;
        }
    }

    if output_sum < amount {
        return Err(Error::InsufficientBalance);
    } else if output_sum > amount {
        if change_address.is_void() {
            return Err(Error::ChangeAddressRequired);
        }
        txn.siafund_outputs.push(SiafundOutput {
            value: output_sum - amount,
            address: change_address,
        });
    }

    let expiry = now + FUND_LOCK_DURATION;
    let mut to_sign = Vec::with_capacity(funding_elements.len());
    for sfe in funding_elements {
        let id = sfe.state_element.id;
        txn.siafund_inputs.push(SiafundInput {
            parent_id: sfe.id(),
            claim_address,
            ..SiafundInput::default()
        });
        to_sign.push(id);
        used.insert(id, expiry);
    }
    Ok(to_sign)
}
