/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Capability interface of the external bytecode interpreter.
//!
//! The state transition never depends on a concrete interpreter: it hands an implementation of
//! [Evm] the [VmStateDb] to execute against, an [Environment] describing the block and the
//! transaction, and the call or create to perform.

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::chain_config::Rules;
use crate::statedb::VmStateDb;
use crate::types::{ExecutionResult, Message};

/// Block level fields visible to bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub coinbase: Address,
    pub gas_limit: u64,
    pub number: u64,
    /// unix seconds
    pub time: u64,
    pub difficulty: U256,
    pub base_fee: U256,
    pub random: B256,
}

/// Transaction level fields visible to bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    pub origin: Address,
    pub gas_price: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub chain_id: u64,
    pub rules: Rules,
    /// EIPs activated on top of the fork schedule
    pub extra_eips: Vec<i64>,
    pub block: BlockContext,
    pub tx: TxContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    pub caller: Address,
    pub to: Address,
    pub input: Bytes,
    pub gas: u64,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParams {
    pub caller: Address,
    pub init_code: Bytes,
    pub gas: u64,
    pub value: U256,
}

/// Reasons for which execution reverts. Gas is charged in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("execution reverted")]
    Reverted,

    #[error("out of gas")]
    OutOfGas,

    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    #[error("max call depth exceeded")]
    Depth,

    #[error("contract address collision")]
    ContractAddressCollision,

    #[error("create not authorized")]
    CreateNotAuthorized,

    #[error("call not authorized")]
    CallNotAuthorized,

    #[error("{0}")]
    Other(String),
}

/// What the interpreter reports back. `error` is None on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub output: Bytes,
    pub leftover_gas: u64,
    pub error: Option<VmError>,
    /// address of the deployed contract, for creations
    pub created_address: Option<Address>,
}

impl CallOutcome {
    pub fn success(output: Bytes, leftover_gas: u64) -> Self {
        Self {
            output,
            leftover_gas,
            error: None,
            created_address: None,
        }
    }

    pub fn failure(error: VmError, leftover_gas: u64) -> Self {
        Self {
            output: Bytes::new(),
            leftover_gas,
            error: Some(error),
            created_address: None,
        }
    }
}

/// External bytecode interpreter. An implementation holds no per-execution state: every call
/// receives everything it needs.
///
/// A call transfers `value` and runs the code at `to`. A create increments the caller nonce,
/// derives the contract address, runs the init code and stores the returned code. Both must revert
/// their own state changes through [VmStateDb::snapshot] and [VmStateDb::revert_to_snapshot]
/// when they fail.
pub trait Evm: Send + Sync {
    fn call(&self, state: &mut dyn VmStateDb, env: &Environment, params: CallParams) -> CallOutcome;

    fn create(&self, state: &mut dyn VmStateDb, env: &Environment, params: CreateParams) -> CallOutcome;

    /// Precompiled contracts active under `rules`. They start warm in the access list.
    fn active_precompiles(&self, rules: &Rules) -> Vec<Address>;
}

/// Hooks invoked around the application of a message. Every hook has an empty default.
pub trait Tracer {
    fn on_tx_start(&mut self, _env: &Environment, _msg: &Message) {}

    /// `reason` names the step which changed the remaining gas.
    fn on_gas_change(&mut self, _old: u64, _new: u64, _reason: &'static str) {}

    fn on_tx_end(&mut self, _result: &ExecutionResult) {}
}
