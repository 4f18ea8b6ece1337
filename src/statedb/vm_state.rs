/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Interface through which the [execution engine](crate::engine::Evm) reads and mutates state.
//!
//! Getters take `&mut self` because a first read loads the account from the keeper into the
//! overlay. Reverted reads and writes leave no trace once [VmStateDb::revert_to_snapshot] returns.

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::chain_config::Rules;
use crate::types::{AccessList, Log};

use super::StateError;

pub trait VmStateDb {
    /// Create an account, carrying over the balance of any account previously at `address`.
    fn create_account(&mut self, address: Address);

    /// Mark the account as created in this transaction. Only such accounts can self-destruct
    /// after Cancun.
    fn create_contract(&mut self, address: Address);

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;
    fn get_balance(&mut self, address: Address) -> U256;

    fn get_nonce(&mut self, address: Address) -> u64;
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Zero for a non-existent account, the empty code hash for an account without code.
    fn get_code_hash(&mut self, address: Address) -> B256;
    fn get_code(&mut self, address: Address) -> Bytes;
    fn set_code(&mut self, address: Address, code: Bytes);
    fn get_code_size(&mut self, address: Address) -> usize;

    fn add_refund(&mut self, gas: u64);
    fn sub_refund(&mut self, gas: u64) -> Result<(), StateError>;
    fn get_refund(&self) -> u64;

    /// Value of the slot at the start of the transaction.
    fn get_committed_state(&mut self, address: Address, key: B256) -> B256;
    fn get_state(&mut self, address: Address, key: B256) -> B256;
    fn set_state(&mut self, address: Address, key: B256, value: B256);

    fn get_transient_state(&self, address: Address, key: B256) -> B256;
    fn set_transient_state(&mut self, address: Address, key: B256, value: B256);

    /// Mark the account for deletion at commit and zero its balance.
    fn self_destruct(&mut self, address: Address);
    fn has_self_destructed(&mut self, address: Address) -> bool;
    /// EIP-6780 variant: only self-destructs accounts created in this transaction.
    fn self_destruct_6780(&mut self, address: Address);

    /// True for any account known to the overlay or the store, including self-destructed ones.
    fn exist(&mut self, address: Address) -> bool;
    /// EIP-161 emptiness. Non-existent accounts are empty.
    fn empty(&mut self, address: Address) -> bool;

    fn address_in_access_list(&self, address: Address) -> bool;
    fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool);
    fn add_address_to_access_list(&mut self, address: Address);
    fn add_slot_to_access_list(&mut self, address: Address, slot: B256);

    /// Reset the access list and transient storage before a transaction. From Berlin on the
    /// sender, destination, precompiles and the transaction access list start warm, and from
    /// Shanghai on so does the coinbase.
    fn prepare(
        &mut self,
        rules: &Rules,
        sender: Address,
        coinbase: Address,
        dest: Option<Address>,
        precompiles: &[Address],
        access_list: &AccessList,
    );

    fn snapshot(&self) -> usize;
    fn revert_to_snapshot(&mut self, revision: usize) -> Result<(), StateError>;

    fn add_log(&mut self, log: Log);

    /// BLOCKHASH lookup.
    fn get_block_hash(&mut self, height: u64) -> B256;
}
