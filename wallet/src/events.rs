//! Event extraction.
//!
//! A pure function of the consensus snapshot, the block and its element
//! diff: no store access beyond the relevance predicate handed in by the
//! caller. Synthetic payout events (miner, foundation, contract) precede
//! user-transaction events within a block; transactions keep block order.

use std::collections::HashMap;

use chain::{Address, ApplyUpdate, Block, Hash256, SiacoinElement, SiafundElement, State};

use crate::errors::StoreError;
use crate::types::{Event, EventData};

fn push_unique(addrs: &mut Vec<Address>, addr: Address) {
    if !addrs.contains(&addr) {
        addrs.push(addr);
    }
}

/// Extracts the wallet-visible events attributable to one applied block.
pub fn applied_events(
    state: &State,
    block: &Block,
    update: &ApplyUpdate,
    mut relevant: impl FnMut(&Address) -> Result<bool, StoreError>,
) -> Result<Vec<Event>, StoreError> {
    let index = state.index;
    let timestamp_ms = block.timestamp_ms;

    // The diff carries the full element for everything the block touched,
    // which is the only way to learn the address behind a v1 input.
    let mut siacoin_elements: HashMap<Hash256, SiacoinElement> = HashMap::new();
    update.for_each_siacoin_element(|se, _| {
        siacoin_elements.insert(se.state_element.id, se.clone());
    });
    let mut siafund_elements: HashMap<Hash256, SiafundElement> = HashMap::new();
    update.for_each_siafund_element(|se, _| {
        siafund_elements.insert(se.state_element.id, se.clone());
    });

    let mut events = Vec::new();

    // miner payouts
    for (i, payout) in block.miner_payouts.iter().enumerate() {
        if !relevant(&payout.address)? {
            continue;
        }
        let id = block.miner_output_id(i).0;
        let element = siacoin_elements
            .get(&id)
            .cloned()
            .expect("the diff contains every payout the block created");
        events.push(Event {
            id,
            index,
            timestamp_ms,
            relevant: vec![payout.address],
            data: EventData::MinerPayout {
                siacoin_element: element,
            },
        });
    }

    // foundation subsidy
    let foundation = state.network.foundation_address;
    if !state.network.foundation_subsidy.is_zero()
        && !foundation.is_void()
        && relevant(&foundation)?
    {
        let id = block.foundation_output_id().0;
        if let Some(element) = siacoin_elements.get(&id).cloned() {
            events.push(Event {
                id,
                index,
                timestamp_ms,
                relevant: vec![foundation],
                data: EventData::FoundationSubsidy {
                    siacoin_element: element,
                },
            });
        }
    }

    // contract-resolution payouts
    for txn in &block.v2_transactions {
        for resolution in &txn.file_contract_resolutions {
            if !relevant(&resolution.payout.address)? {
                continue;
            }
            let id = resolution.payout_id().0;
            let element = siacoin_elements
                .get(&id)
                .cloned()
                .expect("the diff contains every payout the block created");
            events.push(Event {
                id,
                index,
                timestamp_ms,
                relevant: vec![resolution.payout.address],
                data: EventData::ContractPayout {
                    siacoin_element: element,
                    missed: resolution.missed,
                },
            });
        }
    }

    // v1 transactions
    for txn in &block.transactions {
        let mut addrs = Vec::new();
        for input in &txn.siacoin_inputs {
            if let Some(se) = siacoin_elements.get(&input.parent_id.0) {
                push_unique(&mut addrs, se.siacoin_output.address);
            }
        }
        for output in &txn.siacoin_outputs {
            push_unique(&mut addrs, output.address);
        }
        for input in &txn.siafund_inputs {
            if let Some(se) = siafund_elements.get(&input.parent_id.0) {
                push_unique(&mut addrs, se.siafund_output.address);
            }
        }
        for output in &txn.siafund_outputs {
            push_unique(&mut addrs, output.address);
        }

        let mut relevant_addrs = Vec::new();
        for addr in addrs {
            if relevant(&addr)? {
                relevant_addrs.push(addr);
            }
        }
        if relevant_addrs.is_empty() {
            continue;
        }
        events.push(Event {
            id: txn.id().0,
            index,
            timestamp_ms,
            relevant: relevant_addrs,
            data: EventData::Transaction {
                transaction: txn.clone(),
            },
        });
    }

    // v2 transactions carry their parents inline
    for txn in &block.v2_transactions {
        let mut addrs = Vec::new();
        for input in &txn.siacoin_inputs {
            push_unique(&mut addrs, input.parent.siacoin_output.address);
        }
        for output in &txn.siacoin_outputs {
            push_unique(&mut addrs, output.address);
        }
        for input in &txn.siafund_inputs {
            push_unique(&mut addrs, input.parent.siafund_output.address);
        }
        for output in &txn.siafund_outputs {
            push_unique(&mut addrs, output.address);
        }

        let mut relevant_addrs = Vec::new();
        for addr in addrs {
            if relevant(&addr)? {
                relevant_addrs.push(addr);
            }
        }
        if relevant_addrs.is_empty() {
            continue;
        }
        events.push(Event {
            id: txn.id().0,
            index,
            timestamp_ms,
            relevant: relevant_addrs,
            data: EventData::V2Transaction {
                transaction: txn.clone(),
            },
        });
    }

    Ok(events)
}
