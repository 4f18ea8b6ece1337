/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Undo log of the [StateDb](super::StateDb).
//!
//! Entries are flat records: each one holds the value it overwrote and restores it on revert, so
//! reverting a suffix of the journal costs one step per entry.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256, U256};

use super::{StateDb, StateObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// An account was created where none existed.
    CreateObject { account: Address },
    /// An existing account was replaced by a fresh one.
    ResetObject { prev: Box<StateObject> },
    SelfDestruct {
        account: Address,
        prev: bool,
        prev_balance: U256,
    },
    BalanceChange { account: Address, prev: U256 },
    NonceChange { account: Address, prev: u64 },
    StorageChange {
        account: Address,
        key: B256,
        /// dirty value before the write, None if the slot was clean
        prev: Option<B256>,
    },
    CodeChange {
        account: Address,
        prev_code: Option<Bytes>,
        prev_hash: B256,
        prev_dirty: bool,
    },
    CreateContract { account: Address },
    RefundChange { prev: u64 },
    AddLog,
    AccessListAddAccount { address: Address },
    AccessListAddSlot { address: Address, slot: B256 },
    TransientStorageChange {
        account: Address,
        key: B256,
        prev: B256,
    },
}

impl JournalEntry {
    /// Account whose state object is modified by this entry.
    pub fn dirtied(&self) -> Option<Address> {
        match self {
            JournalEntry::CreateObject { account }
            | JournalEntry::SelfDestruct { account, .. }
            | JournalEntry::BalanceChange { account, .. }
            | JournalEntry::NonceChange { account, .. }
            | JournalEntry::StorageChange { account, .. }
            | JournalEntry::CodeChange { account, .. }
            | JournalEntry::CreateContract { account } => Some(*account),
            JournalEntry::ResetObject { prev } => Some(prev.address),
            JournalEntry::RefundChange { .. }
            | JournalEntry::AddLog
            | JournalEntry::AccessListAddAccount { .. }
            | JournalEntry::AccessListAddSlot { .. }
            | JournalEntry::TransientStorageChange { .. } => None,
        }
    }

    pub(crate) fn revert(self, db: &mut StateDb<'_, '_>) {
        match self {
            JournalEntry::CreateObject { account } => {
                db.state_objects.remove(&account);
            }
            JournalEntry::ResetObject { prev } => {
                db.state_objects.insert(prev.address, *prev);
            }
            JournalEntry::SelfDestruct {
                account,
                prev,
                prev_balance,
            } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    object.self_destructed = prev;
                    object.account.balance = prev_balance;
                }
            }
            JournalEntry::BalanceChange { account, prev } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    object.account.balance = prev;
                }
            }
            JournalEntry::NonceChange { account, prev } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    object.account.nonce = prev;
                }
            }
            JournalEntry::StorageChange { account, key, prev } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    match prev {
                        Some(value) => object.dirty_storage.insert(key, value),
                        None => object.dirty_storage.remove(&key),
                    };
                }
            }
            JournalEntry::CodeChange {
                account,
                prev_code,
                prev_hash,
                prev_dirty,
            } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    object.code = prev_code;
                    object.account.code_hash = prev_hash;
                    object.dirty_code = prev_dirty;
                }
            }
            JournalEntry::CreateContract { account } => {
                if let Some(object) = db.state_objects.get_mut(&account) {
                    object.created = false;
                }
            }
            JournalEntry::RefundChange { prev } => db.refund = prev,
            JournalEntry::AddLog => {
                db.logs.pop();
            }
            JournalEntry::AccessListAddAccount { address } => db.access_list.delete_address(&address),
            JournalEntry::AccessListAddSlot { address, slot } => db.access_list.delete_slot(&address, &slot),
            JournalEntry::TransientStorageChange { account, key, prev } => {
                db.transient_storage.set(account, key, prev);
            }
        }
    }
}

/// Ordered entries plus, for every account, the number of entries which modify it.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    dirties: BTreeMap<Address, usize>,
}

impl Journal {
    pub fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.dirtied() {
            *self.dirties.entry(address).or_default() += 1;
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the entries from `revision` on, in append order.
    pub(crate) fn split_off(&mut self, revision: usize) -> Vec<JournalEntry> {
        let undone = self.entries.split_off(revision);
        for entry in &undone {
            if let Some(address) = entry.dirtied() {
                if let Some(count) = self.dirties.get_mut(&address) {
                    *count -= 1;
                    if *count == 0 {
                        self.dirties.remove(&address);
                    }
                }
            }
        }
        undone
    }

    /// Accounts modified by surviving entries, in ascending order.
    pub fn sorted_dirties(&self) -> Vec<Address> {
        self.dirties.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirties.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirties_follow_surviving_entries() {
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);

        let mut journal = Journal::default();
        journal.append(JournalEntry::CreateObject { account: b });
        journal.append(JournalEntry::RefundChange { prev: 0 });
        journal.append(JournalEntry::BalanceChange { account: a, prev: U256::ZERO });
        journal.append(JournalEntry::NonceChange { account: a, prev: 0 });
        assert_eq!(journal.sorted_dirties(), vec![a, b]);

        let undone = journal.split_off(2);
        assert_eq!(undone.len(), 2);
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.sorted_dirties(), vec![b]);
    }
}
