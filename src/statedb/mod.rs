/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Journaled state overlay which backs the execution engine.
//!
//! [StateDb] presents the Ethereum state model (accounts, storage slots, code, logs, refund
//! counter, access list and transient storage) on top of a [StateKeeper], which persists accounts
//! and storage into the key-value store of the host chain.
//!
//! Every mutation appends one [JournalEntry] before it is applied, so that
//! [StateDb::revert_to_snapshot] can undo any suffix of the execution exactly. Nothing reaches
//! the store until [StateDb::commit].

use alloy_primitives::{Address, Bytes, B256};

use crate::context::Context;
use crate::store::StoreError;
use crate::types::Account;

pub mod access_list;
pub use access_list::AccessListState;

pub mod journal;
pub use journal::{Journal, JournalEntry};

pub mod state;
pub use state::StateDb;

pub mod state_object;
pub use state_object::StateObject;

pub mod transient_storage;
pub use transient_storage::TransientStorage;

pub mod vm_state;
pub use vm_state::VmStateDb;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("revision {revision} is beyond the journal length {journal_len}")]
    InvalidSnapshot { revision: usize, journal_len: usize },

    #[error("refund counter below zero: refund {refund}, gas {gas}")]
    RefundUnderflow { refund: u64, gas: u64 },

    #[error("insufficient balance of {address}")]
    InsufficientBalance { address: Address },

    #[error("balance of {address} overflows")]
    BalanceOverflow { address: Address },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("keeper failure: {0}")]
    Keeper(#[source] anyhow::Error),
}

/// Persistence behind the overlay. Reads see the committed state of the context; writes are only
/// issued by [StateDb::commit].
pub trait StateKeeper {
    fn get_account(&self, ctx: &Context, address: &Address) -> Option<Account>;

    /// Value of a storage slot, zero when absent.
    fn get_state(&self, ctx: &Context, address: &Address, key: &B256) -> B256;

    fn get_code(&self, ctx: &Context, code_hash: &B256) -> Bytes;

    /// Hash of the block at `height` as seen from the block of the context: zero for heights
    /// above it or outside of the retained history.
    fn get_block_hash(&self, ctx: &Context, height: u64) -> B256;

    /// Storage of an account in ascending key order. Iteration stops when `f` returns false.
    fn for_each_storage(&self, ctx: &Context, address: &Address, f: &mut dyn FnMut(B256, B256) -> bool);

    fn set_account(&self, ctx: &mut Context, address: &Address, account: &Account) -> Result<(), StateError>;

    /// A zero value deletes the slot.
    fn set_state(&self, ctx: &mut Context, address: &Address, key: &B256, value: &B256) -> Result<(), StateError>;

    fn set_code(&self, ctx: &mut Context, code_hash: &B256, code: &[u8]) -> Result<(), StateError>;

    /// Remove the account with its storage and code hash.
    fn delete_account(&self, ctx: &mut Context, address: &Address) -> Result<(), StateError>;
}

/// Position of the transaction being executed, stamped on every log it emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxConfig {
    pub block_hash: B256,
    pub tx_hash: B256,
    pub tx_index: u64,
    /// index of the first log of this transaction in the block
    pub log_index: u64,
}

impl TxConfig {
    pub fn new(block_hash: B256, tx_hash: B256, tx_index: u64, log_index: u64) -> Self {
        Self {
            block_hash,
            tx_hash,
            tx_index,
            log_index,
        }
    }

    /// Config used outside of block processing, e.g. for queries.
    pub fn empty(block_hash: B256) -> Self {
        Self {
            block_hash,
            ..Default::default()
        }
    }
}
