//! Chain update notifications.
//!
//! An `ApplyUpdate` describes one newly applied block: the element diff it
//! produced and the recomputed accumulator proof for every element that is
//! live after the block. A `RevertUpdate` describes one rolled-back block,
//! with proofs as of the parent. Consumers walk the diffs and then refresh
//! every element they track with `update_element_proof`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::block::Block;
use crate::state::State;
use crate::types::{
    hash_all, Hash256, SiacoinElement, SiafundElement, StateElement,
};

/// A recomputed accumulator position for one live element.
#[derive(Clone, Debug)]
pub(crate) struct ElementProof {
    pub leaf_index: u64,
    pub merkle_proof: Vec<Hash256>,
}

pub(crate) type ProofTable = Arc<HashMap<Hash256, ElementProof>>;

fn update_proof(proofs: &ProofTable, se: &mut StateElement) {
    // Elements spent by the update are absent from the table; their stale
    // proofs are dropped by the consumer rather than rewritten.
    if let Some(p) = proofs.get(&se.id) {
        se.leaf_index = p.leaf_index;
        se.merkle_proof = p.merkle_proof.clone();
    }
}

/// The effects of applying one block.
#[derive(Clone)]
pub struct ApplyUpdate {
    pub(crate) state: State,
    pub(crate) block: Block,
    pub(crate) siacoin_elements: Arc<Vec<(SiacoinElement, bool)>>,
    pub(crate) siafund_elements: Arc<Vec<(SiafundElement, bool)>>,
    pub(crate) proofs: ProofTable,
}

impl ApplyUpdate {
    /// Consensus state after the block.
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Visits every siacoin element the block touched, with its final spent
    /// flag. Elements created and spent within the block appear once, spent.
    pub fn for_each_siacoin_element(&self, mut f: impl FnMut(&SiacoinElement, bool)) {
        for (se, spent) in self.siacoin_elements.iter() {
            f(se, *spent);
        }
    }

    pub fn for_each_siafund_element(&self, mut f: impl FnMut(&SiafundElement, bool)) {
        for (se, spent) in self.siafund_elements.iter() {
            f(se, *spent);
        }
    }

    /// Rewrites a tracked element's proof to its post-block position.
    pub fn update_element_proof(&self, se: &mut StateElement) {
        update_proof(&self.proofs, se);
    }
}

/// The effects of reverting one block. `state` is the state after the
/// revert, i.e. the parent block's.
#[derive(Clone)]
pub struct RevertUpdate {
    pub(crate) state: State,
    pub(crate) block: Block,
    pub(crate) siacoin_elements: Arc<Vec<(SiacoinElement, bool)>>,
    pub(crate) siafund_elements: Arc<Vec<(SiafundElement, bool)>>,
    pub(crate) proofs: ProofTable,
}

impl RevertUpdate {
    /// Consensus state after the revert (the reverted block's parent).
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The block being rolled back.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Visits every element the reverted block touched, with the spent flag
    /// it carried when the block was applied.
    pub fn for_each_siacoin_element(&self, mut f: impl FnMut(&SiacoinElement, bool)) {
        for (se, spent) in self.siacoin_elements.iter() {
            f(se, *spent);
        }
    }

    pub fn for_each_siafund_element(&self, mut f: impl FnMut(&SiafundElement, bool)) {
        for (se, spent) in self.siafund_elements.iter() {
            f(se, *spent);
        }
    }

    /// Rewrites a tracked element's proof to its pre-block position.
    pub fn update_element_proof(&self, se: &mut StateElement) {
        update_proof(&self.proofs, se);
    }
}

/// Leaf hash committing to a siacoin element's contents (the accumulator
/// state itself excluded).
pub fn siacoin_leaf_hash(se: &SiacoinElement) -> Hash256 {
    hash_all(b"chain.leaf.siacoin", |t| {
        t.append_message(b"id", &se.state_element.id.0);
        t.append_message(b"address", &se.siacoin_output.address.0);
        t.append_message(b"value", &se.siacoin_output.value.0.to_le_bytes());
        t.append_u64(b"maturity", se.maturity_height);
    })
}

/// Leaf hash committing to a siafund element's contents.
pub fn siafund_leaf_hash(se: &SiafundElement) -> Hash256 {
    hash_all(b"chain.leaf.siafund", |t| {
        t.append_message(b"id", &se.state_element.id.0);
        t.append_message(b"address", &se.siafund_output.address.0);
        t.append_u64(b"value", se.siafund_output.value);
        t.append_u64(b"claim_start", se.claim_start);
    })
}
