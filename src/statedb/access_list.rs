/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! EIP-2929 access list of warm addresses and storage slots.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessListState {
    addresses: BTreeMap<Address, BTreeSet<B256>>,
}

impl AccessListState {
    pub fn contains_address(&self, address: &Address) -> bool {
        self.addresses.contains_key(address)
    }

    /// (address present, slot present)
    pub fn contains(&self, address: &Address, slot: &B256) -> (bool, bool) {
        match self.addresses.get(address) {
            Some(slots) => (true, slots.contains(slot)),
            None => (false, false),
        }
    }

    /// Returns true if the address was not present.
    pub fn add_address(&mut self, address: Address) -> bool {
        if self.addresses.contains_key(&address) {
            return false;
        }
        self.addresses.insert(address, BTreeSet::new());
        true
    }

    /// Returns whether the address and the slot were added.
    pub fn add_slot(&mut self, address: Address, slot: B256) -> (bool, bool) {
        let address_added = self.add_address(address);
        let slots = self.addresses.entry(address).or_default();
        (address_added, slots.insert(slot))
    }

    /// Undo of [AccessListState::add_address]. The address must have no slots left.
    pub(crate) fn delete_address(&mut self, address: &Address) {
        self.addresses.remove(address);
    }

    /// Undo of the slot part of [AccessListState::add_slot].
    pub(crate) fn delete_slot(&mut self, address: &Address, slot: &B256) {
        if let Some(slots) = self.addresses.get_mut(address) {
            slots.remove(slot);
        }
    }
}
