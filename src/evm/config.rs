/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-block execution configuration, rebuilt for every block from on-chain state.

use alloy_primitives::{Address, B256, I256, U256};

use crate::context::Context;
use crate::engine::{BlockContext, Environment, TxContext};
use crate::error::{FatalError, TransitionError};
use crate::feemarket;
use crate::statedb::TxConfig;
use crate::store::display_key;
use crate::types::Message;

use super::{Keeper, Params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmConfig {
    pub params: Params,
    pub fee_market_params: feemarket::Params,
    /// operator address of the block proposer
    pub coinbase: Address,
    /// None before London or when the fee market runs in fixed price mode
    pub base_fee: Option<U256>,
}

impl Keeper {
    /// Execution configuration of the current block. An empty `proposer` falls back to the
    /// proposer in the block header.
    pub fn evm_config(&self, ctx: &Context, proposer: &[u8]) -> Result<EvmConfig, TransitionError> {
        Ok(EvmConfig {
            params: self.get_params(ctx)?,
            fee_market_params: self.fee_market_keeper().get_params(ctx)?,
            coinbase: self.get_coinbase_address(ctx, proposer)?,
            base_fee: self.get_base_fee(ctx)?,
        })
    }

    /// Operator address of the validator with the given consensus address.
    pub fn get_coinbase_address(&self, ctx: &Context, proposer: &[u8]) -> Result<Address, TransitionError> {
        let proposer = if proposer.is_empty() {
            ctx.header.proposer_address.as_slice()
        } else {
            proposer
        };
        self.staking_keeper()
            .validator_by_cons_addr(ctx, proposer)
            .map(|validator| validator.operator_address)
            .ok_or_else(|| TransitionError::ValidatorNotFound(display_key(proposer)))
    }

    /// Base fee applied by the EVM in the current block.
    pub fn get_base_fee(&self, ctx: &Context) -> Result<Option<U256>, FatalError> {
        if !self.chain_config().is_london(ctx.block_height()) {
            return Ok(None);
        }
        self.fee_market_keeper().get_base_fee_int(ctx)
    }

    /// Position of the next transaction of the block.
    pub fn tx_config(&self, ctx: &Context, tx_hash: B256) -> TxConfig {
        TxConfig::new(
            ctx.header.header_hash,
            tx_hash,
            self.get_tx_index_transient(ctx),
            self.get_log_size_transient(ctx),
        )
    }

    /// Environment handed to the execution engine for `msg`.
    pub fn environment(&self, ctx: &Context, cfg: &EvmConfig, msg: &Message) -> Environment {
        let chain_config = self.chain_config();
        Environment {
            chain_id: chain_config.chain_id,
            rules: chain_config.rules(ctx.block_height(), ctx.block_time()),
            extra_eips: cfg.params.extra_eips.clone(),
            block: BlockContext {
                coinbase: cfg.coinbase,
                gas_limit: ctx.consensus_params.block_gas_limit(),
                number: ctx.block_height(),
                time: ctx.block_time(),
                difficulty: U256::ZERO,
                base_fee: cfg.base_fee.unwrap_or_default(),
                random: B256::ZERO,
            },
            tx: TxContext {
                origin: msg.from,
                gas_price: non_negative(msg.gas_price),
            },
        }
    }
}

fn non_negative(value: I256) -> U256 {
    if value.is_negative() {
        U256::ZERO
    } else {
        value.into_raw()
    }
}
