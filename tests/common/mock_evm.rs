/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use alloy_primitives::{Address, Bytes, B256, U256};

use pchain_evm::chain_config::Rules;
use pchain_evm::crypto::keccak256;
use pchain_evm::engine::{CallOutcome, CallParams, CreateParams, Environment, Evm, VmError};
use pchain_evm::statedb::VmStateDb;
use pchain_evm::types::Log;

/// Slot every successful call writes to: it holds the length of the call input.
pub const CALL_SLOT: B256 = B256::with_last_byte(1);

/// Topic of the log every successful call emits.
pub const CALL_TOPIC: B256 = B256::with_last_byte(7);

pub const PRECOMPILE: Address = Address::with_last_byte(1);

/// Interpreter standing in for bytecode execution. Every call or create burns `exec_gas`,
/// transfers the value, writes [CALL_SLOT], emits one log and adds `refund` to the refund
/// counter. With `revert` set it undoes all of that and fails. `extra_leftover` is added to the
/// gas it reports as left over, which lets it return more gas than it was given.
#[derive(Debug, Clone, Default)]
pub struct MockEvm {
    pub exec_gas: u64,
    pub refund: u64,
    pub revert: bool,
    pub extra_leftover: u64,
}

impl MockEvm {
    pub fn new(exec_gas: u64) -> Self {
        Self { exec_gas, ..Default::default() }
    }

    pub fn with_refund(mut self, refund: u64) -> Self {
        self.refund = refund;
        self
    }

    pub fn reverting(mut self) -> Self {
        self.revert = true;
        self
    }

    pub fn with_extra_leftover(mut self, extra_leftover: u64) -> Self {
        self.extra_leftover = extra_leftover;
        self
    }

    /// Address of the contract `caller` creates with `nonce`.
    pub fn contract_address(caller: Address, nonce: u64) -> Address {
        let hash = keccak256([caller.as_slice(), &nonce.to_be_bytes()].concat());
        Address::from_slice(&hash[12..])
    }

    fn execute(
        &self,
        state: &mut dyn VmStateDb,
        caller: Address,
        target: Address,
        input: &Bytes,
        gas: u64,
        value: U256,
    ) -> Result<u64, CallOutcome> {
        if gas < self.exec_gas {
            return Err(CallOutcome::failure(VmError::OutOfGas, 0));
        }
        let leftover = gas - self.exec_gas + self.extra_leftover;

        if state.sub_balance(caller, value).is_err() {
            return Err(CallOutcome::failure(VmError::InsufficientBalance, gas));
        }
        state.add_balance(target, value).unwrap();

        state.set_state(target, CALL_SLOT, B256::from(U256::from(input.len() + 1)));
        state.add_log(Log {
            address: target,
            topics: vec![CALL_TOPIC],
            data: input.clone(),
            ..Default::default()
        });
        state.add_refund(self.refund);

        if self.revert {
            return Err(CallOutcome::failure(VmError::Reverted, leftover));
        }
        Ok(leftover)
    }
}

impl Evm for MockEvm {
    fn call(&self, state: &mut dyn VmStateDb, _env: &Environment, params: CallParams) -> CallOutcome {
        let snapshot = state.snapshot();
        match self.execute(state, params.caller, params.to, &params.input, params.gas, params.value) {
            Ok(leftover) => CallOutcome::success(Bytes::from(params.input.to_vec()), leftover),
            Err(outcome) => {
                state.revert_to_snapshot(snapshot).unwrap();
                outcome
            }
        }
    }

    fn create(&self, state: &mut dyn VmStateDb, _env: &Environment, params: CreateParams) -> CallOutcome {
        let nonce = state.get_nonce(params.caller);
        state.set_nonce(params.caller, nonce + 1);
        let address = Self::contract_address(params.caller, nonce);

        let snapshot = state.snapshot();
        state.create_account(address);
        state.create_contract(address);
        state.set_nonce(address, 1);

        match self.execute(state, params.caller, address, &params.init_code, params.gas, params.value) {
            Ok(leftover) => {
                state.set_code(address, params.init_code.clone());
                CallOutcome {
                    created_address: Some(address),
                    ..CallOutcome::success(Bytes::new(), leftover)
                }
            }
            Err(outcome) => {
                state.revert_to_snapshot(snapshot).unwrap();
                outcome
            }
        }
    }

    fn active_precompiles(&self, _rules: &Rules) -> Vec<Address> {
        vec![PRECOMPILE]
    }
}
