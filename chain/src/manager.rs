//! In-memory chain manager.
//!
//! Tracks every block it has seen, keyed by id, and designates the highest
//! chain as canonical. Each accepted block is condensed into a `Summary`:
//! the element diff it produced, the ordered live-element set after it, and
//! a freshly built accumulator proof for every live element. Update streams
//! for any observer position are assembled from those summaries, so a
//! subscriber on a stale branch receives the reverts that walk it back to
//! the fork point followed by the applies up the canonical chain.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::watch;

use crate::block::{Block, Transaction, V2Transaction};
use crate::merkle::MerkleTree;
use crate::state::{Network, State};
use crate::types::{
    BlockID, ChainIndex, Currency, Hash256, SiacoinElement, SiafundElement, StateElement,
    TransactionID,
};
use crate::update::{
    siacoin_leaf_hash, siafund_leaf_hash, ApplyUpdate, ElementProof, ProofTable, RevertUpdate,
};

/// Flat fee floor; the recommendation rises with pool depth.
const BASE_FEE: Currency = Currency(1000);

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown parent block {0}")]
    UnknownParent(BlockID),
    #[error("unknown chain index {0}")]
    UnknownIndex(ChainIndex),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("invalid transaction set: {0}")]
    InvalidTransactionSet(String),
    #[error("transaction set basis {0} does not match the current tip")]
    OutdatedBasis(ChainIndex),
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

#[derive(Clone)]
enum ElementData {
    Siacoin(SiacoinElement),
    Siafund(SiafundElement),
}

impl ElementData {
    fn leaf_hash(&self) -> Hash256 {
        match self {
            ElementData::Siacoin(se) => siacoin_leaf_hash(se),
            ElementData::Siafund(se) => siafund_leaf_hash(se),
        }
    }
}

/// Condensed effects of one accepted block.
struct Summary {
    block: Block,
    state: State,
    siacoin_diff: Arc<Vec<(SiacoinElement, bool)>>,
    siafund_diff: Arc<Vec<(SiafundElement, bool)>>,
    /// Ids of all live elements after this block, in creation order.
    order: Vec<Hash256>,
    proofs: ProofTable,
}

struct PoolEntry {
    id: TransactionID,
    txn: Transaction,
    received_ms: u64,
}

struct V2PoolEntry {
    id: TransactionID,
    txn: V2Transaction,
    received_ms: u64,
}

struct Inner {
    network: Network,
    summaries: HashMap<BlockID, Arc<Summary>>,
    /// Canonical block ids indexed by height.
    canonical: Vec<BlockID>,
    /// Every non-ephemeral element ever created, proofless.
    elements: HashMap<Hash256, ElementData>,
    pool: Vec<PoolEntry>,
    v2pool: Vec<V2PoolEntry>,
}

impl Inner {
    fn tip_summary(&self) -> &Arc<Summary> {
        let id = self.canonical.last().expect("canonical chain is never empty");
        &self.summaries[id]
    }

    fn is_canonical(&self, index: ChainIndex) -> bool {
        self.canonical.get(index.height as usize) == Some(&index.id)
    }
}

/// Manages blockchain and transaction-pool state.
pub struct Manager {
    inner: Mutex<Inner>,
    tip_tx: watch::Sender<ChainIndex>,
}

impl Manager {
    /// Creates a manager from the network's genesis block. The genesis block
    /// is indexed like any other and is delivered to subscribers as the
    /// first apply update.
    pub fn new(network: Network, genesis: Block) -> Result<Manager, Error> {
        if genesis.parent_id != BlockID::default() {
            return Err(Error::InvalidBlock("genesis parent must be zero".into()));
        }
        let mut elements = HashMap::new();
        let summary = extend(&network, &mut elements, None, genesis)?;
        let index = summary.state.index;
        let mut summaries = HashMap::new();
        summaries.insert(index.id, Arc::new(summary));
        let (tip_tx, _) = watch::channel(index);
        Ok(Manager {
            inner: Mutex::new(Inner {
                network,
                summaries,
                canonical: vec![index.id],
                elements,
                pool: Vec::new(),
                v2pool: Vec::new(),
            }),
            tip_tx,
        })
    }

    /// The current tip.
    pub fn tip(&self) -> ChainIndex {
        self.inner.lock().unwrap().tip_summary().state.index
    }

    /// Consensus state at the current tip.
    pub fn tip_state(&self) -> State {
        self.inner.lock().unwrap().tip_summary().state.clone()
    }

    /// A channel that yields the tip index after every reorg or extension.
    pub fn subscribe_tip(&self) -> watch::Receiver<ChainIndex> {
        self.tip_tx.subscribe()
    }

    /// Adds blocks to the chain. Blocks must connect to known parents;
    /// already-known blocks are skipped. If the result outranks the current
    /// canonical chain the manager reorgs onto it.
    pub fn add_blocks(&self, blocks: &[Block]) -> Result<(), Error> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let mut best = inner.tip_summary().state.index;
        for block in blocks {
            let id = block.id();
            if inner.summaries.contains_key(&id) {
                continue;
            }
            let parent = inner
                .summaries
                .get(&block.parent_id)
                .cloned()
                .ok_or(Error::UnknownParent(block.parent_id))?;
            let summary = extend(
                &inner.network,
                &mut inner.elements,
                Some(&parent),
                block.clone(),
            )?;
            let index = summary.state.index;
            inner.summaries.insert(id, Arc::new(summary));
            if index.height > best.height {
                best = index;
            }
        }
        if !inner.is_canonical(best) {
            reorg_to(inner, best);
            drop(guard);
            let _ = self.tip_tx.send(best);
        }
        Ok(())
    }

    /// Returns the updates needed to move an observer at `index` to the
    /// current tip: reverts walking its branch back to the canonical chain,
    /// then applies up to the tip. A zero index replays from genesis.
    pub fn updates_since(
        &self,
        index: ChainIndex,
    ) -> Result<(Vec<RevertUpdate>, Vec<ApplyUpdate>), Error> {
        let inner = self.inner.lock().unwrap();
        let mut reverts = Vec::new();
        let base_height = if index == ChainIndex::default() {
            None
        } else {
            let mut cur = inner
                .summaries
                .get(&index.id)
                .ok_or(Error::UnknownIndex(index))?;
            if cur.state.index != index {
                return Err(Error::UnknownIndex(index));
            }
            while !inner.is_canonical(cur.state.index) {
                let parent = &inner.summaries[&cur.block.parent_id];
                reverts.push(revert_update(cur, parent));
                cur = parent;
            }
            Some(cur.state.index.height)
        };

        let first = base_height.map_or(0, |h| h + 1) as usize;
        let applies = inner.canonical[first.min(inner.canonical.len())..]
            .iter()
            .map(|id| apply_update(&inner.summaries[id]))
            .collect();
        Ok((reverts, applies))
    }

    /// Builds the revert update for a single canonical or stale block, used
    /// when an observer rewinds its own view.
    pub fn revert_update_for(&self, index: ChainIndex) -> Result<RevertUpdate, Error> {
        let inner = self.inner.lock().unwrap();
        let summary = inner
            .summaries
            .get(&index.id)
            .ok_or(Error::UnknownIndex(index))?;
        if summary.state.index != index {
            return Err(Error::UnknownIndex(index));
        }
        let parent = inner
            .summaries
            .get(&summary.block.parent_id)
            .ok_or_else(|| Error::InvalidBlock("cannot revert the genesis block".into()))?;
        Ok(revert_update(summary, parent))
    }

    /// A fee recommendation per transaction.
    pub fn recommended_fee(&self) -> Currency {
        let inner = self.inner.lock().unwrap();
        BASE_FEE + Currency((inner.pool.len() + inner.v2pool.len()) as u128 * 10)
    }

    /// The v1 transaction pool.
    pub fn pool_transactions(&self) -> Vec<Transaction> {
        let inner = self.inner.lock().unwrap();
        inner.pool.iter().map(|e| e.txn.clone()).collect()
    }

    /// The v2 transaction pool.
    pub fn v2_pool_transactions(&self) -> Vec<V2Transaction> {
        let inner = self.inner.lock().unwrap();
        inner.v2pool.iter().map(|e| e.txn.clone()).collect()
    }

    /// When the pool transaction with the given id was first seen.
    pub fn pool_received_ms(&self, id: TransactionID) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        inner
            .pool
            .iter()
            .map(|e| (e.id, e.received_ms))
            .chain(inner.v2pool.iter().map(|e| (e.id, e.received_ms)))
            .find(|(eid, _)| *eid == id)
            .map(|(_, ms)| ms)
    }

    /// Validates a v1 transaction set against the tip and pool, then admits
    /// it. Returns whether any transaction was new.
    pub fn add_pool_transactions(&self, txns: Vec<Transaction>) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        let mut available = pool_available(&inner);
        let mut spent = pool_spent(&inner);
        let known: HashSet<TransactionID> = inner.pool.iter().map(|e| e.id).collect();

        let mut added = false;
        for txn in txns {
            let id = txn.id();
            if known.contains(&id) {
                continue;
            }
            for input in &txn.siacoin_inputs {
                check_spendable(input.parent_id.0, &available, &mut spent)?;
            }
            for input in &txn.siafund_inputs {
                check_spendable(input.parent_id.0, &available, &mut spent)?;
            }
            for i in 0..txn.siacoin_outputs.len() {
                available.insert(txn.siacoin_output_id(i).0);
            }
            for i in 0..txn.siafund_outputs.len() {
                available.insert(txn.siafund_output_id(i).0);
            }
            inner.pool.push(PoolEntry {
                id,
                txn,
                received_ms: now_ms(),
            });
            added = true;
        }
        Ok(added)
    }

    /// Admits a v2 transaction set built against `basis`, which must match
    /// the current tip.
    pub fn add_v2_pool_transactions(
        &self,
        basis: ChainIndex,
        txns: Vec<V2Transaction>,
    ) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.tip_summary().state.index != basis {
            return Err(Error::OutdatedBasis(basis));
        }
        let mut available = pool_available(&inner);
        let mut spent = pool_spent(&inner);
        let known: HashSet<TransactionID> = inner.v2pool.iter().map(|e| e.id).collect();

        let mut added = false;
        for txn in txns {
            let id = txn.id();
            if known.contains(&id) {
                continue;
            }
            for input in &txn.siacoin_inputs {
                check_spendable(input.parent.state_element.id, &available, &mut spent)?;
            }
            for input in &txn.siafund_inputs {
                check_spendable(input.parent.state_element.id, &available, &mut spent)?;
            }
            for i in 0..txn.siacoin_outputs.len() {
                available.insert(txn.siacoin_output_id(i).0);
            }
            for i in 0..txn.siafund_outputs.len() {
                available.insert(txn.siafund_output_id(i).0);
            }
            inner.v2pool.push(V2PoolEntry {
                id,
                txn,
                received_ms: now_ms(),
            });
            added = true;
        }
        Ok(added)
    }

    /// Pool transactions that created outputs the given transaction spends,
    /// transitively, deepest parents first.
    pub fn unconfirmed_parents(&self, txn: &Transaction) -> Vec<Transaction> {
        let inner = self.inner.lock().unwrap();
        let mut creators: HashMap<Hash256, usize> = HashMap::new();
        for (i, entry) in inner.pool.iter().enumerate() {
            for j in 0..entry.txn.siacoin_outputs.len() {
                creators.insert(entry.txn.siacoin_output_id(j).0, i);
            }
            for j in 0..entry.txn.siafund_outputs.len() {
                creators.insert(entry.txn.siafund_output_id(j).0, i);
            }
        }

        let mut queue: Vec<Hash256> = txn
            .siacoin_inputs
            .iter()
            .map(|i| i.parent_id.0)
            .chain(txn.siafund_inputs.iter().map(|i| i.parent_id.0))
            .collect();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut parents = Vec::new();
        while let Some(id) = queue.pop() {
            if let Some(&i) = creators.get(&id) {
                if seen.insert(i) {
                    let parent = &inner.pool[i].txn;
                    queue.extend(parent.siacoin_inputs.iter().map(|i| i.parent_id.0));
                    queue.extend(parent.siafund_inputs.iter().map(|i| i.parent_id.0));
                    parents.push(parent.clone());
                }
            }
        }
        parents.reverse();
        parents
    }
}

fn check_spendable(
    id: Hash256,
    available: &HashSet<Hash256>,
    spent: &mut HashSet<Hash256>,
) -> Result<(), Error> {
    if !available.contains(&id) {
        return Err(Error::InvalidTransactionSet(format!(
            "unknown parent output {id}"
        )));
    }
    if !spent.insert(id) {
        return Err(Error::InvalidTransactionSet(format!(
            "output {id} is already spent in the pool"
        )));
    }
    Ok(())
}

fn pool_available(inner: &Inner) -> HashSet<Hash256> {
    let mut available: HashSet<Hash256> = inner.tip_summary().order.iter().copied().collect();
    for entry in &inner.pool {
        for i in 0..entry.txn.siacoin_outputs.len() {
            available.insert(entry.txn.siacoin_output_id(i).0);
        }
        for i in 0..entry.txn.siafund_outputs.len() {
            available.insert(entry.txn.siafund_output_id(i).0);
        }
    }
    for entry in &inner.v2pool {
        for i in 0..entry.txn.siacoin_outputs.len() {
            available.insert(entry.txn.siacoin_output_id(i).0);
        }
        for i in 0..entry.txn.siafund_outputs.len() {
            available.insert(entry.txn.siafund_output_id(i).0);
        }
    }
    available
}

fn pool_spent(inner: &Inner) -> HashSet<Hash256> {
    let mut spent = HashSet::new();
    for entry in &inner.pool {
        spent.extend(entry.txn.siacoin_inputs.iter().map(|i| i.parent_id.0));
        spent.extend(entry.txn.siafund_inputs.iter().map(|i| i.parent_id.0));
    }
    for entry in &inner.v2pool {
        spent.extend(
            entry
                .txn
                .siacoin_inputs
                .iter()
                .map(|i| i.parent.state_element.id),
        );
        spent.extend(
            entry
                .txn
                .siafund_inputs
                .iter()
                .map(|i| i.parent.state_element.id),
        );
    }
    spent
}

fn apply_update(summary: &Summary) -> ApplyUpdate {
    ApplyUpdate {
        state: summary.state.clone(),
        block: summary.block.clone(),
        siacoin_elements: summary.siacoin_diff.clone(),
        siafund_elements: summary.siafund_diff.clone(),
        proofs: summary.proofs.clone(),
    }
}

fn revert_update(summary: &Summary, parent: &Summary) -> RevertUpdate {
    RevertUpdate {
        state: parent.state.clone(),
        block: summary.block.clone(),
        siacoin_elements: summary.siacoin_diff.clone(),
        siafund_elements: summary.siafund_diff.clone(),
        proofs: parent.proofs.clone(),
    }
}

/// Switches the canonical chain to end at `tip` and drops pool transactions
/// that no longer connect.
fn reorg_to(inner: &mut Inner, tip: ChainIndex) {
    let mut chain = Vec::with_capacity(tip.height as usize + 1);
    let mut cur = tip.id;
    while cur != BlockID::default() {
        chain.push(cur);
        cur = inner.summaries[&cur].block.parent_id;
    }
    chain.reverse();
    inner.canonical = chain;

    // Re-admit the surviving pool entries in order against the new tip.
    let live: HashSet<Hash256> = inner.tip_summary().order.iter().copied().collect();
    let mut available = live;
    let mut spent: HashSet<Hash256> = HashSet::new();
    let mut keep = |sc_parents: Vec<Hash256>,
                    sf_parents: Vec<Hash256>,
                    sc_outputs: Vec<Hash256>,
                    sf_outputs: Vec<Hash256>,
                    available: &mut HashSet<Hash256>,
                    spent: &mut HashSet<Hash256>| {
        let parents: Vec<Hash256> = sc_parents.into_iter().chain(sf_parents).collect();
        if !parents
            .iter()
            .all(|p| available.contains(p) && !spent.contains(p))
        {
            return false;
        }
        spent.extend(parents);
        available.extend(sc_outputs);
        available.extend(sf_outputs);
        true
    };

    let pool = std::mem::take(&mut inner.pool);
    inner.pool = pool
        .into_iter()
        .filter(|e| {
            keep(
                e.txn.siacoin_inputs.iter().map(|i| i.parent_id.0).collect(),
                e.txn.siafund_inputs.iter().map(|i| i.parent_id.0).collect(),
                (0..e.txn.siacoin_outputs.len())
                    .map(|i| e.txn.siacoin_output_id(i).0)
                    .collect(),
                (0..e.txn.siafund_outputs.len())
                    .map(|i| e.txn.siafund_output_id(i).0)
                    .collect(),
                &mut available,
                &mut spent,
            )
        })
        .collect();

    let v2pool = std::mem::take(&mut inner.v2pool);
    inner.v2pool = v2pool
        .into_iter()
        .filter(|e| {
            keep(
                e.txn
                    .siacoin_inputs
                    .iter()
                    .map(|i| i.parent.state_element.id)
                    .collect(),
                e.txn
                    .siafund_inputs
                    .iter()
                    .map(|i| i.parent.state_element.id)
                    .collect(),
                (0..e.txn.siacoin_outputs.len())
                    .map(|i| e.txn.siacoin_output_id(i).0)
                    .collect(),
                (0..e.txn.siafund_outputs.len())
                    .map(|i| e.txn.siafund_output_id(i).0)
                    .collect(),
                &mut available,
                &mut spent,
            )
        })
        .collect();
}

/// Applies a block on top of `parent` (or as genesis), producing its
/// summary. Newly created elements are recorded in the registry.
fn extend(
    network: &Network,
    elements: &mut HashMap<Hash256, ElementData>,
    parent: Option<&Summary>,
    block: Block,
) -> Result<Summary, Error> {
    let height = parent.map_or(0, |p| p.state.index.height + 1);
    if let Some(p) = parent {
        if block.parent_id != p.state.index.id {
            return Err(Error::InvalidBlock("parent id mismatch".into()));
        }
        if block.timestamp_ms < p.block.timestamp_ms {
            return Err(Error::InvalidBlock("timestamp regressed".into()));
        }
    }

    // Everything the block creates, in canonical order.
    let mut created: Vec<(Hash256, ElementData)> = Vec::new();
    let payout_maturity = height + network.maturity_delay;
    for (i, payout) in block.miner_payouts.iter().enumerate() {
        let id = block.miner_output_id(i).0;
        created.push((
            id,
            ElementData::Siacoin(SiacoinElement {
                state_element: StateElement {
                    id,
                    ..StateElement::default()
                },
                siacoin_output: *payout,
                maturity_height: payout_maturity,
            }),
        ));
    }
    if !network.foundation_subsidy.is_zero() && !network.foundation_address.is_void() {
        let id = block.foundation_output_id().0;
        created.push((
            id,
            ElementData::Siacoin(SiacoinElement {
                state_element: StateElement {
                    id,
                    ..StateElement::default()
                },
                siacoin_output: crate::types::SiacoinOutput {
                    value: network.foundation_subsidy,
                    address: network.foundation_address,
                },
                maturity_height: payout_maturity,
            }),
        ));
    }
    for txn in &block.transactions {
        for (i, output) in txn.siacoin_outputs.iter().enumerate() {
            let id = txn.siacoin_output_id(i).0;
            created.push((
                id,
                ElementData::Siacoin(SiacoinElement {
                    state_element: StateElement {
                        id,
                        ..StateElement::default()
                    },
                    siacoin_output: *output,
                    maturity_height: 0,
                }),
            ));
        }
        for (i, output) in txn.siafund_outputs.iter().enumerate() {
            let id = txn.siafund_output_id(i).0;
            created.push((
                id,
                ElementData::Siafund(SiafundElement {
                    state_element: StateElement {
                        id,
                        ..StateElement::default()
                    },
                    siafund_output: *output,
                    claim_start: height,
                }),
            ));
        }
    }
    for txn in &block.v2_transactions {
        for (i, output) in txn.siacoin_outputs.iter().enumerate() {
            let id = txn.siacoin_output_id(i).0;
            created.push((
                id,
                ElementData::Siacoin(SiacoinElement {
                    state_element: StateElement {
                        id,
                        ..StateElement::default()
                    },
                    siacoin_output: *output,
                    maturity_height: 0,
                }),
            ));
        }
        for (i, output) in txn.siafund_outputs.iter().enumerate() {
            let id = txn.siafund_output_id(i).0;
            created.push((
                id,
                ElementData::Siafund(SiafundElement {
                    state_element: StateElement {
                        id,
                        ..StateElement::default()
                    },
                    siafund_output: *output,
                    claim_start: height,
                }),
            ));
        }
        for resolution in &txn.file_contract_resolutions {
            let id = resolution.payout_id().0;
            created.push((
                id,
                ElementData::Siacoin(SiacoinElement {
                    state_element: StateElement {
                        id,
                        ..StateElement::default()
                    },
                    siacoin_output: resolution.payout,
                    maturity_height: payout_maturity,
                }),
            ));
        }
    }
    let created_by_id: HashMap<Hash256, &ElementData> =
        created.iter().map(|(id, e)| (*id, e)).collect();

    // Everything the block spends.
    let live: HashSet<Hash256> = parent.map_or_else(HashSet::new, |p| {
        p.order.iter().copied().collect()
    });
    let mut spent: Vec<Hash256> = Vec::new();
    let mut spent_set: HashSet<Hash256> = HashSet::new();
    {
        let mut spend = |id: Hash256| -> Result<(), Error> {
            if !live.contains(&id) && !created_by_id.contains_key(&id) {
                return Err(Error::InvalidBlock(format!("unknown parent output {id}")));
            }
            if !spent_set.insert(id) {
                return Err(Error::InvalidBlock(format!("double spend of {id}")));
            }
            spent.push(id);
            Ok(())
        };
        for txn in &block.transactions {
            for input in &txn.siacoin_inputs {
                spend(input.parent_id.0)?;
            }
            for input in &txn.siafund_inputs {
                spend(input.parent_id.0)?;
            }
        }
        for txn in &block.v2_transactions {
            for input in &txn.siacoin_inputs {
                spend(input.parent.state_element.id)?;
            }
            for input in &txn.siafund_inputs {
                spend(input.parent.state_element.id)?;
            }
        }
    }

    // The element diff: created entries first (spent flag set if consumed
    // within this very block), then the live elements the block destroyed.
    let mut siacoin_diff: Vec<(SiacoinElement, bool)> = Vec::new();
    let mut siafund_diff: Vec<(SiafundElement, bool)> = Vec::new();
    for (id, data) in &created {
        let spent_here = spent_set.contains(id);
        match data {
            ElementData::Siacoin(se) => siacoin_diff.push((se.clone(), spent_here)),
            ElementData::Siafund(se) => siafund_diff.push((se.clone(), spent_here)),
        }
    }
    for id in &spent {
        if created_by_id.contains_key(id) {
            continue;
        }
        match &elements[id] {
            ElementData::Siacoin(se) => siacoin_diff.push((se.clone(), true)),
            ElementData::Siafund(se) => siafund_diff.push((se.clone(), true)),
        }
    }

    // New live-element order: survivors, then non-ephemeral creations.
    let mut order: Vec<Hash256> = parent.map_or_else(Vec::new, |p| {
        p.order
            .iter()
            .filter(|id| !spent_set.contains(id))
            .copied()
            .collect()
    });
    for (id, data) in &created {
        if !spent_set.contains(id) {
            order.push(*id);
            elements.insert(*id, data.clone());
        }
    }

    // Rebuild the accumulator and read out a proof per live element.
    let leaves: Vec<Hash256> = order.iter().map(|id| elements[id].leaf_hash()).collect();
    let tree = MerkleTree::build(leaves);
    let proofs: HashMap<Hash256, ElementProof> = order
        .iter()
        .enumerate()
        .map(|(i, id)| {
            (
                *id,
                ElementProof {
                    leaf_index: i as u64,
                    merkle_proof: tree.path(i),
                },
            )
        })
        .collect();

    let state = State {
        network: network.clone(),
        index: ChainIndex {
            height,
            id: block.id(),
        },
        elements_root: tree.root(),
    };
    Ok(Summary {
        block,
        state,
        siacoin_diff: Arc::new(siacoin_diff),
        siafund_diff: Arc::new(siafund_diff),
        order,
        proofs: Arc::new(proofs),
    })
}
