/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fee market controller: EIP-1559 style base fee maintained across blocks.
//!
//! During the block every Ethereum transaction adds its gas limit to a transient accumulator.
//! At [end of block](Keeper::end_block) the accumulator, bounded below by the gas actually used,
//! becomes the block gas wanted, and the base fee of the next block is derived from it by
//! [calculate_base_fee].

use alloy_primitives::Address;

use crate::error::FatalError;
use crate::store::StoreError;

pub mod abci;

pub mod base_fee;
pub use base_fee::calculate_base_fee;

pub mod keeper;
pub use keeper::Keeper;

pub mod msg_server;
pub use msg_server::MsgUpdateParams;

pub mod params;
pub use params::Params;

/// Namespace of the fee market keys in the persistent and transient stores.
pub const STORE_KEY: &[u8] = b"feemarket/";

pub mod keys {
    pub const PARAMS: &[u8] = &[0x01];
    pub const BLOCK_GAS_WANTED: &[u8] = &[0x02];

    /// transient
    pub const TRANSIENT_GAS_WANTED: &[u8] = &[0x01];
}

#[derive(Debug, thiserror::Error)]
pub enum FeeMarketError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid authority; expected {expected}, got {got}")]
    InvalidAuthority { expected: Address, got: Address },

    #[error("gas computation overflow: {0}")]
    GasOverflow(String),

    #[error("block gas meter is not set")]
    BlockGasMeterNotSet,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}
