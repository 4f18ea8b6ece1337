/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [StateDb], the journaled overlay of one transaction.
//!
//! In Read Operation, the state object of the account is looked up in the overlay first. If it is
//! not there, it is loaded from the keeper and kept for the rest of the transaction.
//!
//! In Write Operation, a [JournalEntry] holding the previous value is appended, then the state
//! object is updated.
//!
//! At the end of the transaction, if it should persist, [StateDb::commit] writes the accounts
//! touched by surviving journal entries to the keeper in ascending address order. Otherwise the
//! overlay is dropped without any change to the store.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::chain_config::Rules;
use crate::context::Context;
use crate::crypto::{keccak256, EMPTY_CODE_HASH};
use crate::types::{AccessList, Account, Log};

use super::{
    AccessListState, Journal, JournalEntry, StateError, StateKeeper, StateObject, TransientStorage, TxConfig,
    VmStateDb,
};

pub struct StateDb<'s, 'c> {
    keeper: &'s dyn StateKeeper,
    ctx: &'s mut Context<'c>,
    tx_config: TxConfig,

    pub(crate) journal: Journal,
    pub(crate) state_objects: BTreeMap<Address, StateObject>,
    pub(crate) refund: u64,
    pub(crate) logs: Vec<Log>,
    pub(crate) access_list: AccessListState,
    pub(crate) transient_storage: TransientStorage,
}

impl<'s, 'c> StateDb<'s, 'c> {
    pub fn new(ctx: &'s mut Context<'c>, keeper: &'s dyn StateKeeper, tx_config: TxConfig) -> Self {
        Self {
            keeper,
            ctx,
            tx_config,
            journal: Journal::default(),
            state_objects: BTreeMap::new(),
            refund: 0,
            logs: Vec::new(),
            access_list: AccessListState::default(),
            transient_storage: TransientStorage::default(),
        }
    }

    pub fn context(&self) -> &Context<'c> {
        &*self.ctx
    }

    pub fn tx_config(&self) -> &TxConfig {
        &self.tx_config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Logs emitted so far, stamped with their position in the block.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// State object of the account, loaded from the keeper on first access.
    pub fn state_object(&mut self, address: &Address) -> Option<&mut StateObject> {
        if !self.state_objects.contains_key(address) {
            let account = self.keeper.get_account(&*self.ctx, address)?;
            self.state_objects.insert(*address, StateObject::new(*address, account));
        }
        self.state_objects.get_mut(address)
    }

    fn get_or_new_state_object(&mut self, address: Address) -> &mut StateObject {
        if self.state_object(&address).is_none() {
            self.create_object(address);
        }
        self.state_objects
            .entry(address)
            .or_insert_with(|| StateObject::new(address, Account::default()))
    }

    /// Replace any account at `address` by a fresh one. Returns the replaced object.
    fn create_object(&mut self, address: Address) -> Option<StateObject> {
        let prev = self.state_object(&address).cloned();
        match &prev {
            None => self.journal.append(JournalEntry::CreateObject { account: address }),
            Some(prev) => self.journal.append(JournalEntry::ResetObject {
                prev: Box::new(prev.clone()),
            }),
        }
        self.state_objects
            .insert(address, StateObject::new(address, Account::default()));
        prev
    }

    /// Write the net effect of the surviving journal entries to the keeper and clear the
    /// journal. Self-destructed accounts are deleted. A failure here leaves the store partially
    /// written and must stop block processing.
    pub fn commit(&mut self) -> Result<(), StateError> {
        let dirties = self.journal.sorted_dirties();
        for address in &dirties {
            let Some(object) = self.state_objects.get(address) else {
                continue;
            };

            if object.self_destructed {
                self.keeper.delete_account(&mut *self.ctx, address)?;
                continue;
            }

            if object.dirty_code {
                if let Some(code) = &object.code {
                    self.keeper.set_code(&mut *self.ctx, &object.account.code_hash, code)?;
                }
            }

            self.keeper.set_account(&mut *self.ctx, address, &object.account)?;

            for (key, value) in &object.dirty_storage {
                if object.origin_storage.get(key) == Some(value) {
                    continue;
                }
                self.keeper.set_state(&mut *self.ctx, address, key, value)?;
            }
        }

        tracing::debug!(target: "statedb", accounts = dirties.len(), logs = self.logs.len(), "committed state");

        self.journal.clear();
        self.state_objects.clear();
        Ok(())
    }
}

impl VmStateDb for StateDb<'_, '_> {
    fn create_account(&mut self, address: Address) {
        if let Some(prev) = self.create_object(address) {
            if let Some(object) = self.state_objects.get_mut(&address) {
                object.account.balance = prev.account.balance;
            }
        }
    }

    fn create_contract(&mut self, address: Address) {
        let marked = match self.state_object(&address) {
            Some(object) if !object.created => {
                object.created = true;
                true
            }
            _ => false,
        };
        if marked {
            self.journal.append(JournalEntry::CreateContract { account: address });
        }
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        // a missing account holds nothing, and must not be created by a failed debit
        let prev = self
            .state_object(&address)
            .map(|object| object.account.balance)
            .ok_or(StateError::InsufficientBalance { address })?;
        let balance = prev
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance { address })?;
        self.get_or_new_state_object(address).account.balance = balance;
        self.journal.append(JournalEntry::BalanceChange { account: address, prev });
        Ok(())
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        let prev = self.get_balance(address);
        let balance = prev
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow { address })?;
        self.get_or_new_state_object(address).account.balance = balance;
        self.journal.append(JournalEntry::BalanceChange { account: address, prev });
        Ok(())
    }

    fn get_balance(&mut self, address: Address) -> U256 {
        self.state_object(&address)
            .map_or(U256::ZERO, |object| object.account.balance)
    }

    fn get_nonce(&mut self, address: Address) -> u64 {
        self.state_object(&address).map_or(0, |object| object.account.nonce)
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        let object = self.get_or_new_state_object(address);
        let prev = object.account.nonce;
        object.account.nonce = nonce;
        self.journal.append(JournalEntry::NonceChange { account: address, prev });
    }

    fn get_code_hash(&mut self, address: Address) -> B256 {
        self.state_object(&address).map_or(B256::ZERO, |object| object.code_hash())
    }

    fn get_code(&mut self, address: Address) -> Bytes {
        let code_hash = match self.state_object(&address) {
            None => return Bytes::new(),
            Some(object) => match &object.code {
                Some(code) => return code.clone(),
                None => object.code_hash(),
            },
        };
        if code_hash == EMPTY_CODE_HASH {
            return Bytes::new();
        }
        let code = self.keeper.get_code(&*self.ctx, &code_hash);
        if let Some(object) = self.state_objects.get_mut(&address) {
            object.code = Some(code.clone());
        }
        code
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        let object = self.get_or_new_state_object(address);
        let entry = JournalEntry::CodeChange {
            account: address,
            prev_code: object.code.take(),
            prev_hash: object.account.code_hash,
            prev_dirty: object.dirty_code,
        };
        object.account.code_hash = keccak256(&code);
        object.code = Some(code);
        object.dirty_code = true;
        self.journal.append(entry);
    }

    fn get_code_size(&mut self, address: Address) -> usize {
        self.get_code(address).len()
    }

    fn add_refund(&mut self, gas: u64) {
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        self.refund = self.refund.saturating_add(gas);
    }

    fn sub_refund(&mut self, gas: u64) -> Result<(), StateError> {
        if gas > self.refund {
            return Err(StateError::RefundUnderflow {
                refund: self.refund,
                gas,
            });
        }
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        self.refund -= gas;
        Ok(())
    }

    fn get_refund(&self) -> u64 {
        self.refund
    }

    fn get_committed_state(&mut self, address: Address, key: B256) -> B256 {
        match self.state_object(&address) {
            None => return B256::ZERO,
            Some(object) => {
                if let Some(value) = object.origin_storage.get(&key) {
                    return *value;
                }
            }
        }
        let value = self.keeper.get_state(&*self.ctx, &address, &key);
        if let Some(object) = self.state_objects.get_mut(&address) {
            object.origin_storage.insert(key, value);
        }
        value
    }

    fn get_state(&mut self, address: Address, key: B256) -> B256 {
        if let Some(value) = self
            .state_object(&address)
            .and_then(|object| object.dirty_storage.get(&key).copied())
        {
            return value;
        }
        self.get_committed_state(address, key)
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) {
        self.get_or_new_state_object(address);
        if self.get_state(address, key) == value {
            return;
        }
        let object = self.get_or_new_state_object(address);
        let prev = object.dirty_storage.insert(key, value);
        self.journal.append(JournalEntry::StorageChange {
            account: address,
            key,
            prev,
        });
    }

    fn get_transient_state(&self, address: Address, key: B256) -> B256 {
        self.transient_storage.get(&address, &key)
    }

    fn set_transient_state(&mut self, address: Address, key: B256, value: B256) {
        let prev = self.transient_storage.get(&address, &key);
        if prev == value {
            return;
        }
        self.journal.append(JournalEntry::TransientStorageChange {
            account: address,
            key,
            prev,
        });
        self.transient_storage.set(address, key, value);
    }

    fn self_destruct(&mut self, address: Address) {
        let Some(object) = self.state_object(&address) else {
            return;
        };
        let entry = JournalEntry::SelfDestruct {
            account: address,
            prev: object.self_destructed,
            prev_balance: object.account.balance,
        };
        object.self_destructed = true;
        object.account.balance = U256::ZERO;
        self.journal.append(entry);
    }

    fn has_self_destructed(&mut self, address: Address) -> bool {
        self.state_object(&address)
            .is_some_and(|object| object.self_destructed)
    }

    fn self_destruct_6780(&mut self, address: Address) {
        if self.state_object(&address).is_some_and(|object| object.created) {
            self.self_destruct(address);
        }
    }

    fn exist(&mut self, address: Address) -> bool {
        self.state_object(&address).is_some()
    }

    fn empty(&mut self, address: Address) -> bool {
        self.state_object(&address).map_or(true, |object| object.is_empty())
    }

    fn address_in_access_list(&self, address: Address) -> bool {
        self.access_list.contains_address(&address)
    }

    fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool) {
        self.access_list.contains(&address, &slot)
    }

    fn add_address_to_access_list(&mut self, address: Address) {
        if self.access_list.add_address(address) {
            self.journal.append(JournalEntry::AccessListAddAccount { address });
        }
    }

    fn add_slot_to_access_list(&mut self, address: Address, slot: B256) {
        let (address_added, slot_added) = self.access_list.add_slot(address, slot);
        if address_added {
            self.journal.append(JournalEntry::AccessListAddAccount { address });
        }
        if slot_added {
            self.journal.append(JournalEntry::AccessListAddSlot { address, slot });
        }
    }

    fn prepare(
        &mut self,
        rules: &Rules,
        sender: Address,
        coinbase: Address,
        dest: Option<Address>,
        precompiles: &[Address],
        access_list: &AccessList,
    ) {
        if rules.is_berlin {
            let mut warm = AccessListState::default();
            warm.add_address(sender);
            if let Some(dest) = dest {
                warm.add_address(dest);
            }
            for address in precompiles {
                warm.add_address(*address);
            }
            for tuple in access_list.iter() {
                warm.add_address(tuple.address);
                for key in &tuple.storage_keys {
                    warm.add_slot(tuple.address, *key);
                }
            }
            if rules.is_shanghai {
                warm.add_address(coinbase);
            }
            self.access_list = warm;
        }
        self.transient_storage = TransientStorage::default();
    }

    fn snapshot(&self) -> usize {
        self.journal.len()
    }

    fn revert_to_snapshot(&mut self, revision: usize) -> Result<(), StateError> {
        if revision > self.journal.len() {
            return Err(StateError::InvalidSnapshot {
                revision,
                journal_len: self.journal.len(),
            });
        }
        let undone = self.journal.split_off(revision);
        tracing::trace!(target: "statedb", revision, entries = undone.len(), "revert to snapshot");
        for entry in undone.into_iter().rev() {
            entry.revert(self);
        }
        Ok(())
    }

    fn add_log(&mut self, mut log: Log) {
        log.tx_hash = self.tx_config.tx_hash;
        log.block_hash = self.tx_config.block_hash;
        log.tx_index = self.tx_config.tx_index;
        log.block_number = self.ctx.header.height;
        log.index = self.tx_config.log_index + self.logs.len() as u64;
        self.journal.append(JournalEntry::AddLog);
        self.logs.push(log);
    }

    fn get_block_hash(&mut self, height: u64) -> B256 {
        self.keeper.get_block_hash(&*self.ctx, height)
    }
}
