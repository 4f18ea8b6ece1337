/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! State transition of Ethereum transactions.
//!
//! [Keeper::apply_transaction] runs the phases of one transaction of the block:
//! 1. Resolve the block configuration and the message (effective gas price against the base fee).
//! 2. Execute the message on a [StateDb] and commit it ([Keeper::apply_message_with_config]).
//! 3. Refund the unused gas to the sender from the fee collector.
//! 4. Update the block bookkeeping: bloom, log size, transaction index, gas used, the gas meter
//!   of the host transaction and the gas wanted of the fee market.
//!
//! Errors at any step reject the transaction and leave the context untouched. A reverted
//! execution is not an error: it is reported in [ExecutionResult::vm_error] and still pays gas.

use alloy_primitives::U256;

use crate::collaborators::FEE_COLLECTOR;
use crate::context::Context;
use crate::decimal::Dec;
use crate::engine::{CallOutcome, CallParams, CreateParams, Tracer, VmError};
use crate::error::{FatalError, TransitionError};
use crate::gas::{gas_to_refund, intrinsic_gas, refund_quotient};
use crate::statedb::{StateDb, TxConfig, VmStateDb};
use crate::types::{logs_bloom, Coin, EthTx, ExecutionResult, Message};

use super::{EvmConfig, Keeper};

impl Keeper {
    /// Execute a transaction of the block and settle its fees. The context is only written when
    /// the transaction is not rejected.
    pub fn apply_transaction(&self, ctx: &mut Context, tx: &EthTx) -> Result<ExecutionResult, TransitionError> {
        let cfg = self.evm_config(ctx, &[])?;
        let tx_config = self.tx_config(ctx, tx.hash);
        let msg = tx.to_message(cfg.base_fee)?;

        // refunds are paid at the effective gas price, it must not be negative
        if msg.gas_price.is_negative() {
            return Err(TransitionError::InvalidRefund(msg.gas_price));
        }

        let result = ctx.branch(|ctx| -> Result<ExecutionResult, TransitionError> {
            let result = self.apply_message_with_config(ctx, &msg, None, true, &cfg, tx_config)?;

            let leftover_gas = msg
                .gas_limit
                .checked_sub(result.gas_used)
                .ok_or_else(|| TransitionError::GasOverflow("gas used exceeds gas limit".to_string()))?;
            self.refund_gas(ctx, &msg, leftover_gas)?;

            if !result.logs.is_empty() {
                let mut bloom = self.get_block_bloom_transient(ctx);
                bloom.accrue_bloom(&result.bloom);
                self.set_block_bloom_transient(ctx, bloom)?;

                let log_size = tx_config
                    .log_index
                    .checked_add(result.logs.len() as u64)
                    .ok_or_else(|| FatalError::Overflow("log size".to_string()))?;
                self.set_log_size_transient(ctx, log_size)?;
            }

            let tx_index = tx_config
                .tx_index
                .checked_add(1)
                .ok_or_else(|| FatalError::Overflow("tx index".to_string()))?;
            self.set_tx_index_transient(ctx, tx_index)?;

            // the host gas meter is charged with the gas used by every EVM transaction of the
            // host transaction, in place of what it metered itself
            let total_gas_used = self.add_transient_gas_used(ctx, result.gas_used)?;
            self.reset_gas_meter_and_consume_gas(ctx, total_gas_used)?;

            // gas wanted only feeds the base fee, so it is not tracked while the base fee is
            // disabled; within an enabled fee market it counts whether or not execution failed
            if cfg.base_fee.is_some() {
                self.fee_market_keeper()
                    .add_transient_gas_wanted(ctx, msg.gas_limit)?;
            }

            Ok(result)
        });

        match &result {
            Ok(result) => tracing::debug!(
                target: "evm",
                hash = ?tx.hash,
                gas_used = result.gas_used,
                failed = result.failed(),
                "applied transaction"
            ),
            Err(error) if error.is_fatal() => {
                tracing::error!(target: "evm", hash = ?tx.hash, %error, "fatal error applying transaction")
            }
            Err(error) => tracing::debug!(target: "evm", hash = ?tx.hash, %error, "rejected transaction"),
        }
        result
    }

    /// Execute a message against the current block, outside of the transaction bookkeeping of
    /// the block. With `commit` false the state changes are discarded, as for `eth_call`.
    pub fn apply_message(
        &self,
        ctx: &mut Context,
        msg: &Message,
        tracer: Option<&mut dyn Tracer>,
        commit: bool,
    ) -> Result<ExecutionResult, TransitionError> {
        let cfg = self.evm_config(ctx, &[])?;
        let tx_config = TxConfig::empty(ctx.header.header_hash);
        self.apply_message_with_config(ctx, msg, tracer, commit, &cfg, tx_config)
    }

    /// Execute a message on a fresh [StateDb] over `ctx`.
    ///
    /// - The gas limit must cover the intrinsic gas.
    /// - Creations take over the nonce management from the engine: the nonce of the sender is
    ///   set to the message nonce before the create and to nonce + 1 after it, whatever the
    ///   outcome.
    /// - Calls and creations denied by the access control policy fail with a VM error without
    ///   reaching the engine.
    /// - Gas used is the gas consumed minus the refund, but at least `gas_limit *
    ///   min_gas_multiplier`.
    /// - With `commit`, the state is committed even when the execution failed, so that the
    ///   nonce update persists.
    pub fn apply_message_with_config(
        &self,
        ctx: &mut Context,
        msg: &Message,
        mut tracer: Option<&mut dyn Tracer>,
        commit: bool,
        cfg: &EvmConfig,
        tx_config: TxConfig,
    ) -> Result<ExecutionResult, TransitionError> {
        if msg.value.is_negative() {
            return Err(TransitionError::NegativeValue(msg.value));
        }
        let value = msg.value.into_raw();

        let env = self.environment(ctx, cfg, msg);
        let rules = env.rules;
        let is_contract_creation = msg.is_contract_creation();

        let intrinsic = intrinsic_gas(&msg.data, &msg.access_list, is_contract_creation, &rules)?;
        if msg.gas_limit < intrinsic {
            return Err(TransitionError::IntrinsicGas { gas_limit: msg.gas_limit, intrinsic });
        }
        let mut leftover_gas = msg.gas_limit - intrinsic;

        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.on_tx_start(&env, msg);
            tracer.on_gas_change(msg.gas_limit, leftover_gas, "intrinsic gas");
        }

        let precompiles = self.evm().active_precompiles(&rules);
        let access_control = &cfg.params.access_control;

        let mut state = StateDb::new(ctx, self, tx_config);
        state.prepare(&rules, msg.from, cfg.coinbase, msg.to, &precompiles, &msg.access_list);

        let outcome = match msg.to {
            None => {
                state.set_nonce(msg.from, msg.nonce);
                let outcome = if access_control.create.is_allowed(&msg.from) {
                    let params = CreateParams {
                        caller: msg.from,
                        init_code: msg.data.clone(),
                        gas: leftover_gas,
                        value,
                    };
                    self.evm().create(&mut state, &env, params)
                } else {
                    CallOutcome::failure(VmError::CreateNotAuthorized, leftover_gas)
                };
                state.set_nonce(msg.from, msg.nonce.saturating_add(1));
                outcome
            }
            Some(to) => {
                if access_control.call.is_allowed(&msg.from) {
                    let params = CallParams {
                        caller: msg.from,
                        to,
                        input: msg.data.clone(),
                        gas: leftover_gas,
                        value,
                    };
                    self.evm().call(&mut state, &env, params)
                } else {
                    CallOutcome::failure(VmError::CallNotAuthorized, leftover_gas)
                }
            }
        };
        leftover_gas = outcome.leftover_gas;

        if msg.gas_limit < leftover_gas {
            return Err(TransitionError::GasOverflow(format!(
                "message gas limit {} < leftover gas {}",
                msg.gas_limit, leftover_gas
            )));
        }
        let mut gas_used = msg.gas_limit - leftover_gas;

        let refund = gas_to_refund(state.get_refund(), gas_used, refund_quotient(&rules))?;
        leftover_gas = leftover_gas
            .checked_add(refund)
            .ok_or_else(|| TransitionError::GasOverflow("leftover gas plus refund".to_string()))?;
        gas_used -= refund;

        if msg.gas_limit < leftover_gas {
            return Err(TransitionError::GasOverflow(format!(
                "message gas limit {} < leftover gas {} after refund",
                msg.gas_limit, leftover_gas
            )));
        }

        if commit {
            state.commit()?;
        }
        let logs = state.logs().to_vec();
        drop(state);

        // minimum_gas_used = gas_limit * min_gas_multiplier, charged when the limit is far above the
        // gas actually consumed
        let minimum_gas_used = Dec::from_u64(msg.gas_limit)
            .checked_mul(cfg.fee_market_params.min_gas_multiplier)
            .and_then(|minimum| minimum.truncate_u64())
            .ok_or_else(|| TransitionError::GasOverflow("minimum gas used".to_string()))?;
        let gas_used = std::cmp::max(minimum_gas_used, gas_used);

        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.on_gas_change(leftover_gas, msg.gas_limit - gas_used, "gas refund");
        }

        let result = ExecutionResult {
            hash: tx_config.tx_hash,
            bloom: logs_bloom(&logs),
            logs,
            ret: outcome.output,
            vm_error: outcome.error.map(|error| error.to_string()).unwrap_or_default(),
            gas_used,
        };

        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.on_tx_end(&result);
        }

        tracing::trace!(
            target: "evm",
            from = %msg.from,
            intrinsic,
            refund,
            gas_used,
            vm_error = %result.vm_error,
            "applied message"
        );
        Ok(result)
    }

    /// Return `leftover_gas * gas_price` to the sender from the fee collector.
    pub fn refund_gas(&self, ctx: &mut Context, msg: &Message, leftover_gas: u64) -> Result<(), TransitionError> {
        if msg.gas_price.is_negative() {
            return Err(TransitionError::InvalidRefund(msg.gas_price));
        }

        // remaining = leftover_gas * gas_price
        let remaining = U256::from(leftover_gas)
            .checked_mul(msg.gas_price.into_raw())
            .ok_or_else(|| TransitionError::GasOverflow("refund amount".to_string()))?;
        if remaining.is_zero() {
            return Ok(());
        }

        let coins = [Coin::new(self.chain_config().denom(), remaining)?];
        self.bank_keeper()
            .send_coins_from_module_to_account(ctx, FEE_COLLECTOR, &msg.from, &coins)
            .map_err(|e| TransitionError::Collaborator(e.context("fee collector failed to refund fees")))
    }

    /// Replace what the host gas meter consumed so far with `gas_used`.
    pub fn reset_gas_meter_and_consume_gas(&self, ctx: &mut Context, gas_used: u64) -> Result<(), FatalError> {
        let consumed = ctx.gas_meter.gas_consumed();
        ctx.gas_meter.refund_gas(consumed, "reset the gas count")?;
        ctx.gas_meter.consume_gas(gas_used, "apply evm transaction")?;
        Ok(())
    }

    /// Intrinsic gas of a message under the rules of the current block.
    pub fn get_eth_intrinsic_gas(&self, ctx: &Context, msg: &Message) -> Result<u64, TransitionError> {
        let rules = self.chain_config().rules(ctx.block_height(), ctx.block_time());
        intrinsic_gas(&msg.data, &msg.access_list, msg.is_contract_creation(), &rules)
    }
}
