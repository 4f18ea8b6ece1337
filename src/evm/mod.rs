/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! EVM module of the host chain.
//!
//! The [Keeper] persists the Ethereum state (code, storage, code hashes, recent header hashes) in
//! the `evm/` namespace, delegates nonces to the account collaborator and balances to the bank
//! collaborator, and drives the external [Evm](crate::engine::Evm) through the state transition:
//! - [Keeper::apply_transaction]: executes a transaction of the block and settles its fees.
//! - [Keeper::apply_message]: executes a message, optionally without committing (queries).
//! - [Keeper::begin_block] / [Keeper::end_block]: header hash history and block bloom.

use alloy_primitives::Address;

use crate::error::FatalError;
use crate::store::StoreError;

pub mod abci;

pub mod config;
pub use config::EvmConfig;

pub mod keeper;
pub use keeper::Keeper;

pub mod params;
pub use params::{AccessControl, AccessControlType, AccessType, Params};

pub mod query;

pub mod state_transition;

/// Namespace of the EVM keys in the persistent and transient stores.
pub const STORE_KEY: &[u8] = b"evm/";

pub mod keys {
    use alloy_primitives::{Address, B256};

    pub const PREFIX_CODE: u8 = 0x01;
    pub const PREFIX_STORAGE: u8 = 0x02;
    pub const PREFIX_PARAMS: u8 = 0x03;
    pub const PREFIX_CODE_HASH: u8 = 0x04;
    pub const PREFIX_HEADER_HASH: u8 = 0x05;

    pub const PREFIX_TRANSIENT_BLOOM: u8 = 0x01;
    pub const PREFIX_TRANSIENT_TX_INDEX: u8 = 0x02;
    pub const PREFIX_TRANSIENT_LOG_SIZE: u8 = 0x03;
    pub const PREFIX_TRANSIENT_GAS_USED: u8 = 0x04;

    pub fn code(code_hash: &B256) -> Vec<u8> {
        [&[PREFIX_CODE][..], code_hash.as_slice()].concat()
    }

    /// Prefix of every slot of one account.
    pub fn address_storage_prefix(address: &Address) -> Vec<u8> {
        [&[PREFIX_STORAGE][..], address.as_slice()].concat()
    }

    pub fn storage(address: &Address, key: &B256) -> Vec<u8> {
        [&[PREFIX_STORAGE][..], address.as_slice(), key.as_slice()].concat()
    }

    pub fn params() -> Vec<u8> {
        vec![PREFIX_PARAMS]
    }

    pub fn code_hash(address: &Address) -> Vec<u8> {
        [&[PREFIX_CODE_HASH][..], address.as_slice()].concat()
    }

    pub fn header_hash(height: u64) -> Vec<u8> {
        [&[PREFIX_HEADER_HASH][..], &height.to_be_bytes()].concat()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("invalid params: {0}")]
    Invalid(String),

    #[error("invalid authority; expected {expected}, got {got}")]
    InvalidAuthority { expected: Address, got: Address },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}
