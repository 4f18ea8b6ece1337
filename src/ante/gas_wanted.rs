/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Gas limit ceilings and the accounting of the gas wanted by the block.

use crate::context::Context;
use crate::evm;
use crate::feemarket;

use super::{AnteDecorator, AnteError, Tx};

/// Rejects gas limits above the per-transaction ceiling or, once London is active, above the
/// block gas limit. Transactions without Ethereum messages add their gas limit to the gas wanted
/// by the block; Ethereum messages are counted when they are applied.
pub struct GasWanted {
    evm_keeper: evm::Keeper,
    fee_market_keeper: feemarket::Keeper,
    max_tx_gas_wanted: u64,
}

impl GasWanted {
    pub fn new(evm_keeper: evm::Keeper, fee_market_keeper: feemarket::Keeper, max_tx_gas_wanted: u64) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
            max_tx_gas_wanted,
        }
    }
}

impl AnteDecorator for GasWanted {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, _simulate: bool) -> Result<(), AnteError> {
        let gas_wanted = tx.gas();
        if self.max_tx_gas_wanted != 0 && gas_wanted > self.max_tx_gas_wanted {
            return Err(AnteError::InvalidGasLimit(format!(
                "tx gas wanted {gas_wanted} exceeds max tx gas wanted {}",
                self.max_tx_gas_wanted
            )));
        }

        if !self.evm_keeper.chain_config().is_london(ctx.block_height()) {
            return Ok(());
        }

        let block_gas_limit = ctx.consensus_params.block_gas_limit();
        if gas_wanted > block_gas_limit {
            return Err(AnteError::OutOfGas(format!(
                "tx gas ({gas_wanted}) exceeds block gas limit ({block_gas_limit})"
            )));
        }

        if !self.fee_market_keeper.get_base_fee_enabled(ctx)? || tx.has_ethereum_tx() {
            return Ok(());
        }
        let total = self.fee_market_keeper.add_transient_gas_wanted(ctx, gas_wanted)?;
        tracing::trace!(target: "ante", gas_wanted, total, "block gas wanted");
        Ok(())
    }
}
