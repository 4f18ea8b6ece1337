/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only queries. They are meant to run on a [Context] over a snapshot of the committed
//! state; in any case nothing they execute is ever flushed to the context stores.

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::context::Context;
use crate::engine::VmError;
use crate::error::TransitionError;
use crate::gas::TX_GAS;
use crate::statedb::StateKeeper;
use crate::types::{ExecutionResult, Message};

use super::Keeper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAccountResponse {
    pub balance: U256,
    pub code_hash: B256,
    pub nonce: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Execution fails for a reason other than running out of gas, whatever the gas limit.
    #[error("execution failed: {vm_error}")]
    ExecutionFailed { vm_error: String, ret: Bytes },

    #[error("gas required exceeds allowance ({0})")]
    GasCapExceeded(u64),
}

impl Keeper {
    pub fn query_account(&self, ctx: &Context, address: &Address) -> QueryAccountResponse {
        let account = StateKeeper::get_account(self, ctx, address).unwrap_or_default();
        QueryAccountResponse {
            balance: account.balance,
            code_hash: account.code_hash,
            nonce: account.nonce,
        }
    }

    pub fn query_storage(&self, ctx: &Context, address: &Address, key: &B256) -> B256 {
        self.get_state(ctx, address, key)
    }

    pub fn query_code(&self, ctx: &Context, address: &Address) -> Bytes {
        let code_hash = self.get_code_hash(ctx, address);
        self.get_code(ctx, &code_hash)
    }

    /// Execute `msg` without committing anything.
    pub fn eth_call(&self, ctx: &mut Context, msg: &Message) -> Result<ExecutionResult, TransitionError> {
        ctx.branch_if(|ctx| self.apply_message(ctx, msg, None, false), |_| false)?
    }

    /// Smallest gas limit with which `msg` executes successfully, searched between the
    /// intrinsic cost of a transfer and `gas_cap`. The gas limit of `msg` is an upper bound
    /// when it is at least the cost of a transfer.
    pub fn estimate_gas(&self, ctx: &mut Context, msg: &Message, gas_cap: u64) -> Result<u64, QueryError> {
        let mut lo = TX_GAS - 1;
        let mut hi = if msg.gas_limit >= TX_GAS {
            msg.gas_limit
        } else {
            ctx.consensus_params.block_gas_limit()
        };
        if gas_cap != 0 && hi > gas_cap {
            hi = gas_cap;
        }
        let cap = hi;

        let mut probe = msg.clone();
        let mut executable = |ctx: &mut Context, gas: u64| -> Result<Option<ExecutionResult>, TransitionError> {
            probe.gas_limit = gas;
            match self.eth_call(ctx, &probe) {
                Ok(result) => Ok(Some(result)),
                // too little gas to even start
                Err(TransitionError::IntrinsicGas { .. }) => Ok(None),
                Err(error) => Err(error),
            }
        };

        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            match executable(ctx, mid)? {
                Some(result) if !result.failed() => hi = mid,
                _ => lo = mid,
            }
        }

        if hi == cap {
            match executable(ctx, hi)? {
                Some(result) if !result.failed() => {}
                Some(result) if result.vm_error != VmError::OutOfGas.to_string() => {
                    return Err(QueryError::ExecutionFailed { vm_error: result.vm_error, ret: result.ret });
                }
                _ => return Err(QueryError::GasCapExceeded(cap)),
            }
        }
        Ok(hi)
    }
}
