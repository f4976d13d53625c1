use std::sync::Arc;
use std::time::Duration;

use chain::{
    Address, Block, ChainIndex, Currency, Network, SiacoinInput, SiacoinOutput, SiafundOutput,
    Transaction,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::*;
use crate::reserve::{fund_siacoins, OutputLocks};

fn addr(n: u8) -> Address {
    Address([n; 32])
}

fn test_network(maturity_delay: u64) -> Network {
    Network {
        name: "test".into(),
        maturity_delay,
        foundation_address: Address::VOID,
        foundation_subsidy: Currency::ZERO,
    }
}

fn genesis() -> Block {
    Block {
        timestamp_ms: 1,
        ..Block::default()
    }
}

/// Chain manager plus a synced wallet manager over a fresh in-memory store.
struct Sim {
    cm: Arc<chain::Manager>,
    wm: WalletManager<MemStore>,
    ts: u64,
}

impl Sim {
    fn new(maturity_delay: u64) -> Sim {
        let cm = Arc::new(chain::Manager::new(test_network(maturity_delay), genesis()).unwrap());
        let wm = WalletManager::new(MemStore::new(), cm.clone()).unwrap();
        Sim { cm, wm, ts: 1 }
    }

    /// Creates a wallet with one registered address.
    fn wallet_with_address(&self, address: Address) -> WalletID {
        let wallet = self
            .wm
            .add_wallet(Wallet {
                name: "primary".into(),
                ..Wallet::default()
            })
            .unwrap();
        self.wm
            .add_address(
                wallet.id,
                WalletAddress {
                    address,
                    spend_policy: None,
                    metadata: serde_json::Value::Null,
                },
            )
            .unwrap();
        wallet.id
    }

    fn mine(&mut self, mut block: Block) -> ChainIndex {
        self.ts += 1000;
        block.parent_id = self.cm.tip().id;
        block.timestamp_ms = self.ts;
        self.cm.add_blocks(&[block]).unwrap();
        self.wm.sync().unwrap();
        self.cm.tip()
    }

    fn mine_empty(&mut self) -> ChainIndex {
        self.mine(Block::default())
    }

    fn mine_payout(&mut self, to: Address, value: u64) -> ChainIndex {
        self.mine(Block {
            miner_payouts: vec![SiacoinOutput {
                value: Currency::from(value),
                address: to,
            }],
            ..Block::default()
        })
    }

    fn mine_txns(&mut self, transactions: Vec<Transaction>) -> ChainIndex {
        self.mine(Block {
            transactions,
            ..Block::default()
        })
    }
}

/// A transaction creating outputs from nothing; the chain layer does not
/// enforce conservation, which keeps seeding tests simple.
fn seed_siacoins(to: Address, value: u64) -> Transaction {
    Transaction {
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(value),
            address: to,
        }],
        ..Transaction::default()
    }
}

fn seed_siafunds(to: Address, value: u64) -> Transaction {
    Transaction {
        siafund_outputs: vec![SiafundOutput { value, address: to }],
        ..Transaction::default()
    }
}

#[test]
fn miner_payout_matures_after_the_delay() {
    let mut sim = Sim::new(144);
    let a = addr(1);
    let id = sim.wallet_with_address(a);

    sim.mine_payout(a, 100);
    let balance = sim.wm.wallet_balance(id).unwrap();
    assert_eq!(balance.siacoins, Currency::ZERO);
    assert_eq!(balance.immature_siacoins, Currency::from(100));
    assert_eq!(balance.siafunds, 0);

    // the payout was created at height 1 and matures at height 145
    for _ in 0..143 {
        sim.mine_empty();
    }
    let balance = sim.wm.wallet_balance(id).unwrap();
    assert_eq!(balance.immature_siacoins, Currency::from(100));

    sim.mine_empty();
    let balance = sim.wm.wallet_balance(id).unwrap();
    assert_eq!(balance.siacoins, Currency::from(100));
    assert_eq!(balance.immature_siacoins, Currency::ZERO);

    let events = sim.wm.events(id, 0, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].data, EventData::MinerPayout { .. }));
}

#[test]
fn balance_matches_unspent_outputs() {
    let mut sim = Sim::new(5);
    let a = addr(1);
    let id = sim.wallet_with_address(a);

    sim.mine_payout(a, 100);
    sim.mine_txns(vec![seed_siacoins(a, 25), seed_siacoins(a, 17)]);
    sim.mine_txns(vec![seed_siafunds(a, 9)]);
    sim.mine_empty();

    let tip = sim.wm.tip().unwrap();
    let outputs = sim.wm.unspent_siacoin_outputs(id, 0, 1000).unwrap();
    let mut mature = Currency::ZERO;
    let mut immature = Currency::ZERO;
    for se in &outputs {
        if se.maturity_height > tip.height {
            immature = immature + se.siacoin_output.value;
        } else {
            mature = mature + se.siacoin_output.value;
        }
    }
    let funds: u64 = sim
        .wm
        .unspent_siafund_outputs(id, 0, 1000)
        .unwrap()
        .iter()
        .map(|se| se.siafund_output.value)
        .sum();

    let balance = sim.wm.wallet_balance(id).unwrap();
    assert_eq!(balance.siacoins, mature);
    assert_eq!(balance.immature_siacoins, immature);
    assert_eq!(balance.siafunds, funds);
}

#[test]
fn spend_moves_balance_between_addresses() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let b = addr(2);
    let id_a = sim.wallet_with_address(a);
    let id_b = sim.wallet_with_address(b);

    let seed = seed_siacoins(a, 50);
    let parent = seed.siacoin_output_id(0);
    sim.mine_txns(vec![seed]);
    assert_eq!(
        sim.wm.wallet_balance(id_a).unwrap().siacoins,
        Currency::from(50)
    );

    sim.mine_txns(vec![Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: parent,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(50),
            address: b,
        }],
        ..Transaction::default()
    }]);

    assert_eq!(sim.wm.wallet_balance(id_a).unwrap().siacoins, Currency::ZERO);
    assert_eq!(
        sim.wm.wallet_balance(id_b).unwrap().siacoins,
        Currency::from(50)
    );
    // the spend is an event for both sides
    assert_eq!(sim.wm.events(id_a, 0, 10).unwrap().len(), 2);
    assert_eq!(sim.wm.events(id_b, 0, 10).unwrap().len(), 1);
}

/// Observable store state for equality comparisons.
type Snapshot = (
    Balance,
    Vec<chain::SiacoinElement>,
    Vec<chain::SiafundElement>,
    Vec<Event>,
    ChainIndex,
);

fn observe<S: Store>(store: &S, id: WalletID) -> Snapshot {
    (
        store.wallet_balance(id).unwrap(),
        store.wallet_unspent_siacoin_elements(id, 0, 1000).unwrap(),
        store.wallet_unspent_siafund_elements(id, 0, 1000).unwrap(),
        store.wallet_events(id, 0, 500).unwrap(),
        store.tip().unwrap(),
    )
}

fn register(store: &MemStore, address: Address) -> WalletID {
    let wallet = store.add_wallet(Wallet::default()).unwrap();
    store
        .add_address(
            wallet.id,
            WalletAddress {
                address,
                spend_policy: None,
                metadata: serde_json::Value::Null,
            },
        )
        .unwrap();
    wallet.id
}

fn apply_batch(store: &MemStore, updates: &[chain::ApplyUpdate]) {
    let index = updates.last().unwrap().state().index;
    store
        .apply_chain_state(index, &mut |tx| apply_chain_updates(tx, updates))
        .unwrap();
}

fn revert_one(store: &MemStore, cru: &chain::RevertUpdate) {
    store
        .revert_chain_state(cru.state().index, &mut |tx| revert_chain_update(tx, cru))
        .unwrap();
}

#[test]
fn reverting_blocks_restores_prior_state() {
    // the payout must not mature inside the replayed batch: maturation
    // reads the store, and elements created earlier in the same batch are
    // still pending there
    let mut sim = Sim::new(10);
    let a = addr(1);

    // five blocks of wallet activity: a payout, seeds, and a spend
    sim.mine_payout(a, 40);
    let seed = seed_siacoins(a, 30);
    let parent = seed.siacoin_output_id(0);
    sim.mine_txns(vec![seed]);
    sim.mine_txns(vec![seed_siafunds(a, 4)]);
    sim.mine_txns(vec![Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: parent,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(30),
            address: addr(9),
        }],
        ..Transaction::default()
    }]);
    sim.mine_payout(a, 11);

    let (_, updates) = sim.cm.updates_since(ChainIndex::default()).unwrap();
    assert_eq!(updates.len(), 6); // genesis + five blocks

    // one store sees all five blocks, then reverts the last two
    let full = MemStore::new();
    let id_full = register(&full, a);
    apply_batch(&full, &updates);
    let after_all = observe(&full, id_full);

    let tip5 = updates[5].state().index;
    let tip4 = updates[4].state().index;
    revert_one(&full, &sim.cm.revert_update_for(tip5).unwrap());
    revert_one(&full, &sim.cm.revert_update_for(tip4).unwrap());

    // the other store never saw them
    let partial = MemStore::new();
    let id_partial = register(&partial, a);
    apply_batch(&partial, &updates[..4]);

    assert_eq!(observe(&full, id_full), observe(&partial, id_partial));

    // re-applying the reverted blocks restores the original state exactly
    apply_batch(&full, &updates[4..]);
    assert_eq!(observe(&full, id_full), after_all);
}

#[test]
fn ephemeral_outputs_never_touch_the_store() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);
    sim.mine_payout(a, 10);
    let before_events = sim.wm.events(id, 0, 100).unwrap();
    let before_outputs = sim.wm.unspent_siacoin_outputs(id, 0, 1000).unwrap();

    // an output created and spent within one block, unrelated to the wallet
    let create = seed_siacoins(addr(7), 5);
    let ephemeral_id = create.siacoin_output_id(0);
    let spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: ephemeral_id,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(5),
            address: addr(8),
        }],
        ..Transaction::default()
    };
    sim.mine_txns(vec![create, spend]);

    assert_eq!(sim.wm.events(id, 0, 100).unwrap(), before_events);
    assert_eq!(
        sim.wm.unspent_siacoin_outputs(id, 0, 1000).unwrap(),
        before_outputs
    );
}

#[test]
fn funding_selects_and_reserves_outputs() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let c = addr(2);
    let id = sim.wallet_with_address(a);
    sim.mine_txns(vec![seed_siacoins(a, 100)]);

    let funded = sim
        .wm
        .fund(id, Transaction::default(), Currency::from(40), c)
        .unwrap();
    assert_eq!(funded.to_sign.len(), 1);
    assert_eq!(funded.transaction.siacoin_inputs.len(), 1);
    assert_eq!(funded.transaction.siacoin_outputs.len(), 1);
    assert_eq!(
        funded.transaction.siacoin_outputs[0],
        SiacoinOutput {
            value: Currency::from(60),
            address: c,
        }
    );
    assert!(funded.depends_on.is_empty());

    // the only output is reserved now
    let err = sim
        .wm
        .fund(id, Transaction::default(), Currency::from(40), c)
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance));

    // releasing makes it selectable again
    sim.wm.release(&funded.to_sign);
    sim.wm
        .fund(id, Transaction::default(), Currency::from(40), c)
        .unwrap();
}

#[test]
fn funding_requires_a_change_address_only_for_change() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);
    sim.mine_txns(vec![seed_siacoins(a, 40), seed_siacoins(a, 60)]);

    // exact-sum selection never needs change
    let funded = sim
        .wm
        .fund(id, Transaction::default(), Currency::from(100), Address::VOID)
        .unwrap();
    assert_eq!(funded.transaction.siacoin_outputs.len(), 0);
    sim.wm.release(&funded.to_sign);

    let err = sim
        .wm
        .fund(id, Transaction::default(), Currency::from(30), Address::VOID)
        .unwrap_err();
    assert!(matches!(err, Error::ChangeAddressRequired));
}

#[test]
fn funding_skips_mempool_spent_outputs() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);
    let seed = seed_siacoins(a, 75);
    let parent = seed.siacoin_output_id(0);
    sim.mine_txns(vec![seed]);

    // a pool transaction already spends the wallet's only output
    sim.cm
        .add_pool_transactions(vec![Transaction {
            siacoin_inputs: vec![SiacoinInput {
                parent_id: parent,
                ..SiacoinInput::default()
            }],
            siacoin_outputs: vec![SiacoinOutput {
                value: Currency::from(75),
                address: addr(5),
            }],
            ..Transaction::default()
        }])
        .unwrap();

    let err = sim
        .wm
        .fund(id, Transaction::default(), Currency::from(10), addr(2))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientBalance));
}

#[test]
fn siafund_inputs_carry_the_claim_address() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let c = addr(2);
    let k = addr(3);
    let id = sim.wallet_with_address(a);
    sim.mine_txns(vec![seed_siafunds(a, 10)]);

    let funded = sim
        .wm
        .fund_siafunds(id, Transaction::default(), 3, c, k)
        .unwrap();
    assert_eq!(funded.to_sign.len(), 1);
    assert_eq!(funded.transaction.siafund_inputs.len(), 1);
    assert_eq!(funded.transaction.siafund_inputs[0].claim_address, k);
    assert_eq!(
        funded.transaction.siafund_outputs,
        vec![SiafundOutput { value: 7, address: c }]
    );
}

#[test]
fn reservations_conflict_until_they_expire() {
    let sim = Sim::new(3);
    let o = chain::Hash256([5; 32]);

    sim.wm.reserve(&[o], Duration::from_millis(50)).unwrap();
    assert!(matches!(
        sim.wm.reserve(&[o], Duration::from_millis(50)),
        Err(Error::Conflict)
    ));
    std::thread::sleep(Duration::from_millis(60));
    sim.wm.reserve(&[o], Duration::from_millis(50)).unwrap();
}

#[test]
fn concurrent_funding_never_shares_outputs() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);
    let seeds: Vec<Transaction> = (0..10).map(|_| seed_siacoins(a, 10)).collect();
    sim.mine_txns(seeds);

    let wm = &sim.wm;
    let results: Vec<Result<FundResult, Error>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(move || {
                    wm.fund(id, Transaction::default(), Currency::from(30), addr(2))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = std::collections::HashSet::new();
    for funded in results.into_iter().flatten() {
        for id in funded.to_sign {
            assert!(seen.insert(id), "output selected twice");
        }
    }
}

#[test]
fn injected_rng_makes_selection_deterministic() {
    let locks_a = OutputLocks::new();
    let locks_b = OutputLocks::new();
    let utxos: Vec<chain::SiacoinElement> = (0..20u8)
        .map(|i| chain::SiacoinElement {
            state_element: chain::StateElement {
                id: chain::Hash256([i; 32]),
                leaf_index: 0,
                merkle_proof: Vec::new(),
            },
            siacoin_output: SiacoinOutput {
                value: Currency::from(10),
                address: addr(1),
            },
            maturity_height: 0,
        })
        .collect();

    let mut txn_a = Transaction::default();
    let sel_a = fund_siacoins(
        &mut txn_a,
        Currency::from(35),
        addr(2),
        utxos.clone(),
        &[],
        &locks_a,
        &mut SmallRng::seed_from_u64(7),
    )
    .unwrap();
    let mut txn_b = Transaction::default();
    let sel_b = fund_siacoins(
        &mut txn_b,
        Currency::from(35),
        addr(2),
        utxos,
        &[],
        &locks_b,
        &mut SmallRng::seed_from_u64(7),
    )
    .unwrap();
    assert_eq!(sel_a, sel_b);
    assert_eq!(sel_a.len(), 4);
}

#[test]
#[should_panic(expected = "negative siafund balance")]
fn siafund_underflow_is_an_invariant_violation() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    sim.mine_txns(vec![seed_siafunds(a, 5)]);

    // reverting the same creation twice would drive the balance negative;
    // the second revert must abort instead of wrapping
    let tip = sim.cm.tip();
    let cru = sim.cm.revert_update_for(tip).unwrap();
    let store = MemStore::new();
    let _ = register(&store, a);
    let (_, updates) = sim.cm.updates_since(ChainIndex::default()).unwrap();
    apply_batch(&store, &updates);
    revert_one(&store, &cru);
    revert_one(&store, &cru);
}

#[test]
fn subscribe_replays_to_the_same_state() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);

    sim.mine_payout(a, 40);
    let seed = seed_siacoins(a, 30);
    let parent = seed.siacoin_output_id(0);
    sim.mine_txns(vec![seed]);
    sim.mine_txns(vec![Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: parent,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(30),
            address: a,
        }],
        ..Transaction::default()
    }]);
    sim.mine_empty();

    let before = (
        sim.wm.wallet_balance(id).unwrap(),
        sim.wm.unspent_siacoin_outputs(id, 0, 1000).unwrap(),
        sim.wm.events(id, 0, 500).unwrap(),
    );

    sim.wm.subscribe(1).unwrap();

    let after = (
        sim.wm.wallet_balance(id).unwrap(),
        sim.wm.unspent_siacoin_outputs(id, 0, 1000).unwrap(),
        sim.wm.events(id, 0, 500).unwrap(),
    );
    assert_eq!(before, after);
    assert_eq!(sim.wm.tip().unwrap(), sim.cm.tip());
}

#[test]
fn annotate_reports_wallet_relevant_pool_flow() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);
    let seed = seed_siacoins(a, 80);
    let parent = seed.siacoin_output_id(0);
    sim.mine_txns(vec![seed]);

    let spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: parent,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![
            SiacoinOutput {
                value: Currency::from(50),
                address: addr(9),
            },
            SiacoinOutput {
                value: Currency::from(30),
                address: a,
            },
        ],
        ..Transaction::default()
    };
    let unrelated = seed_siacoins(addr(8), 3);
    sim.cm
        .add_pool_transactions(vec![spend.clone(), unrelated])
        .unwrap();

    let annotated = sim
        .wm
        .annotate(id, sim.cm.pool_transactions())
        .unwrap();
    assert_eq!(annotated.len(), 1);
    assert_eq!(annotated[0].id, spend.id());
    assert_eq!(annotated[0].outflow, Currency::from(80));
    assert_eq!(annotated[0].inflow, Currency::from(30));
}

#[test]
fn wallet_crud_preserves_request_fields() {
    let sim = Sim::new(3);
    let created = sim
        .wm
        .add_wallet(Wallet {
            name: "cold storage".into(),
            description: "offline".into(),
            metadata: serde_json::json!({"tier": 2}),
            ..Wallet::default()
        })
        .unwrap();
    assert_ne!(created.id, WalletID::default());
    assert_eq!(created.name, "cold storage");
    assert_eq!(created.description, "offline");
    assert_eq!(created.metadata, serde_json::json!({"tier": 2}));
    assert!(created.created_at_ms > 0);

    let updated = sim
        .wm
        .update_wallet(Wallet {
            id: created.id,
            name: "hot".into(),
            ..Wallet::default()
        })
        .unwrap();
    assert_eq!(updated.name, "hot");
    assert_eq!(updated.created_at_ms, created.created_at_ms);

    assert!(matches!(
        sim.wm.update_wallet(Wallet {
            id: WalletID(0xffff),
            ..Wallet::default()
        }),
        Err(Error::NotFound)
    ));
}

#[test]
fn shared_addresses_survive_wallet_deletion() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id1 = sim.wallet_with_address(a);
    let id2 = sim.wallet_with_address(a);
    sim.mine_txns(vec![seed_siacoins(a, 42)]);

    sim.wm.delete_wallet(id1).unwrap();
    // the second claim keeps the rows alive
    assert_eq!(
        sim.wm.wallet_balance(id2).unwrap().siacoins,
        Currency::from(42)
    );
    assert_eq!(sim.wm.unspent_siacoin_outputs(id2, 0, 10).unwrap().len(), 1);
    assert_eq!(sim.wm.events(id2, 0, 10).unwrap().len(), 1);

    // removing the last claim cascades
    sim.wm.remove_address(id2, a).unwrap();
    let err = sim.wm.wallet_balance(id1).unwrap_err();
    assert!(matches!(err, Error::NotFound));
    assert!(sim.wm.unspent_siacoin_outputs(id2, 0, 10).unwrap().is_empty());
    assert!(sim.wm.events(id2, 0, 10).unwrap().is_empty());
    let funded = sim.wm.fund(id2, Transaction::default(), Currency::from(1), addr(3));
    assert!(matches!(funded, Err(Error::InsufficientBalance)));
}

#[test]
fn reorg_rewrites_the_indexed_view() {
    let mut sim = Sim::new(3);
    let a = addr(1);
    let id = sim.wallet_with_address(a);

    let base = sim.cm.tip();
    sim.mine_payout(a, 10);
    assert_eq!(
        sim.wm.wallet_balance(id).unwrap().immature_siacoins,
        Currency::from(10)
    );

    // a longer branch without the payout
    let b1 = Block {
        parent_id: base.id,
        timestamp_ms: sim.ts + 1,
        ..Block::default()
    };
    let b2 = Block {
        parent_id: b1.id(),
        timestamp_ms: sim.ts + 2,
        ..Block::default()
    };
    sim.cm.add_blocks(&[b1, b2]).unwrap();
    sim.wm.sync().unwrap();

    assert_eq!(sim.wm.tip().unwrap(), sim.cm.tip());
    assert_eq!(
        sim.wm.wallet_balance(id).unwrap().immature_siacoins,
        Currency::ZERO
    );
    assert!(sim.wm.events(id, 0, 10).unwrap().is_empty());
}
