use super::*;
use crate::merkle::verify_path;

fn addr(n: u8) -> Address {
    Address([n; 32])
}

fn genesis() -> Block {
    Block {
        timestamp_ms: 1,
        ..Block::default()
    }
}

fn test_network() -> Network {
    Network {
        name: "test".into(),
        maturity_delay: 3,
        foundation_address: Address::VOID,
        foundation_subsidy: Currency::ZERO,
    }
}

fn payout_block(parent: ChainIndex, ts: u64, to: Address, value: u64) -> Block {
    Block {
        parent_id: parent.id,
        timestamp_ms: ts,
        miner_payouts: vec![SiacoinOutput {
            value: Currency::from(value),
            address: to,
        }],
        ..Block::default()
    }
}

/// A minimal subscriber: tracks every element the chain creates and keeps
/// its proof fresh, the way the wallet indexer does.
#[derive(Default)]
struct Tracker {
    siacoins: Vec<SiacoinElement>,
    tip: ChainIndex,
}

impl Tracker {
    fn sync(&mut self, cm: &Manager) {
        let (reverts, applies) = cm.updates_since(self.tip).unwrap();
        for cru in &reverts {
            cru.for_each_siacoin_element(|se, spent| {
                if spent {
                    self.siacoins.push(se.clone());
                } else {
                    self.siacoins.retain(|e| e.id() != se.id());
                }
            });
            for se in &mut self.siacoins {
                cru.update_element_proof(&mut se.state_element);
            }
            self.tip = cru.state().index;
        }
        for cau in &applies {
            cau.for_each_siacoin_element(|se, spent| {
                if spent {
                    self.siacoins.retain(|e| e.id() != se.id());
                } else {
                    self.siacoins.push(se.clone());
                }
            });
            for se in &mut self.siacoins {
                cau.update_element_proof(&mut se.state_element);
            }
            self.tip = cau.state().index;
        }
    }

    fn assert_proofs_valid(&self, cm: &Manager) {
        let state = cm.tip_state();
        for se in &self.siacoins {
            let leaf = siacoin_leaf_hash(se);
            assert!(
                verify_path(
                    leaf,
                    se.state_element.leaf_index,
                    &se.state_element.merkle_proof,
                    &state.elements_root,
                ),
                "stale proof for {:?}",
                se.id()
            );
        }
    }
}

#[test]
fn proofs_track_the_tip() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let mut tracker = Tracker::default();
    tracker.sync(&cm);

    let mut tip = cm.tip();
    for i in 0..10u64 {
        let b = payout_block(tip, 100 + i, addr(i as u8 + 1), 100 + i);
        cm.add_blocks(&[b]).unwrap();
        tip = cm.tip();
        tracker.sync(&cm);
        tracker.assert_proofs_valid(&cm);
    }
    assert_eq!(tracker.siacoins.len(), 10);
}

#[test]
fn spending_removes_elements_and_proofs_stay_valid() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let b1 = payout_block(cm.tip(), 10, addr(1), 50);
    let payout_id = b1.miner_output_id(0);
    cm.add_blocks(&[b1]).unwrap();

    let spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: payout_id,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(50),
            address: addr(2),
        }],
        ..Transaction::default()
    };
    let b2 = Block {
        parent_id: cm.tip().id,
        timestamp_ms: 20,
        transactions: vec![spend],
        ..Block::default()
    };
    cm.add_blocks(&[b2]).unwrap();

    let mut tracker = Tracker::default();
    tracker.sync(&cm);
    tracker.assert_proofs_valid(&cm);
    assert_eq!(tracker.siacoins.len(), 1);
    assert_eq!(tracker.siacoins[0].siacoin_output.address, addr(2));
}

#[test]
fn ephemeral_outputs_are_reported_spent() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let create = Transaction {
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(7),
            address: addr(9),
        }],
        ..Transaction::default()
    };
    let spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: create.siacoin_output_id(0),
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(7),
            address: addr(10),
        }],
        ..Transaction::default()
    };
    let b = Block {
        parent_id: cm.tip().id,
        timestamp_ms: 5,
        transactions: vec![create.clone(), spend],
        ..Block::default()
    };
    cm.add_blocks(&[b]).unwrap();

    let (_, applies) = cm.updates_since(ChainIndex::default()).unwrap();
    let mut flags = Vec::new();
    applies.last().unwrap().for_each_siacoin_element(|se, spent| {
        flags.push((se.id(), spent));
    });
    // The ephemeral output appears once, already spent.
    assert!(flags.contains(&(create.siacoin_output_id(0), true)));
}

#[test]
fn reorg_streams_reverts_then_applies() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let base = cm.tip();
    let a1 = payout_block(base, 10, addr(1), 10);
    cm.add_blocks(&[a1.clone()]).unwrap();
    let stale = cm.tip();

    let mut tracker = Tracker::default();
    tracker.sync(&cm);
    assert_eq!(tracker.tip, stale);

    // A longer competing branch from the same base.
    let b1 = payout_block(base, 11, addr(2), 20);
    let b1_index = ChainIndex {
        height: 1,
        id: b1.id(),
    };
    let b2 = payout_block(b1_index, 12, addr(3), 30);
    cm.add_blocks(&[b1, b2]).unwrap();
    assert_eq!(cm.tip().height, 2);

    let (reverts, applies) = cm.updates_since(stale).unwrap();
    assert_eq!(reverts.len(), 1);
    assert_eq!(reverts[0].block().id(), a1.id());
    assert_eq!(applies.len(), 2);

    tracker.sync(&cm);
    tracker.assert_proofs_valid(&cm);
    let addrs: Vec<Address> = tracker
        .siacoins
        .iter()
        .map(|se| se.siacoin_output.address)
        .collect();
    assert!(addrs.contains(&addr(2)) && addrs.contains(&addr(3)));
    assert!(!addrs.contains(&addr(1)));
}

#[test]
fn pool_rejects_conflicts_and_finds_parents() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let b1 = payout_block(cm.tip(), 10, addr(1), 50);
    let payout_id = b1.miner_output_id(0);
    cm.add_blocks(&[b1]).unwrap();

    let spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: payout_id,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(50),
            address: addr(2),
        }],
        ..Transaction::default()
    };
    assert!(cm.add_pool_transactions(vec![spend.clone()]).unwrap());
    // Same set again: nothing new.
    assert!(!cm.add_pool_transactions(vec![spend.clone()]).unwrap());

    // A conflicting spend of the same parent is rejected.
    let conflict = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: payout_id,
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(50),
            address: addr(3),
        }],
        ..Transaction::default()
    };
    assert!(cm.add_pool_transactions(vec![conflict]).is_err());

    // A child spending the pool output depends on its unconfirmed parent.
    let child = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: spend.siacoin_output_id(0),
            ..SiacoinInput::default()
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: Currency::from(50),
            address: addr(4),
        }],
        ..Transaction::default()
    };
    let parents = cm.unconfirmed_parents(&child);
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id(), spend.id());
}

#[test]
fn v2_pool_requires_current_basis() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let b1 = payout_block(cm.tip(), 10, addr(1), 50);
    cm.add_blocks(&[b1]).unwrap();

    let stale = ChainIndex::default();
    assert!(matches!(
        cm.add_v2_pool_transactions(stale, Vec::new()),
        Err(Error::OutdatedBasis(_))
    ));
    assert!(!cm.add_v2_pool_transactions(cm.tip(), Vec::new()).unwrap());
}

#[test]
fn maturity_heights_follow_network_delay() {
    let cm = Manager::new(test_network(), genesis()).unwrap();
    let b1 = payout_block(cm.tip(), 10, addr(1), 50);
    cm.add_blocks(&[b1]).unwrap();

    let (_, applies) = cm.updates_since(ChainIndex::default()).unwrap();
    let mut maturity = None;
    applies.last().unwrap().for_each_siacoin_element(|se, _| {
        maturity = Some(se.maturity_height);
    });
    // Created at height 1 with a delay of 3.
    assert_eq!(maturity, Some(4));
}
