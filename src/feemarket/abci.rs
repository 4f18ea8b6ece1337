/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! End of block processing of the fee market.

use crate::context::Context;
use crate::decimal::Dec;
use crate::error::FatalError;

use super::{FeeMarketError, Keeper};

impl Keeper {
    /// Record the gas wanted of the finished block and derive the base fee of the next one.
    /// Returns the block gas wanted.
    ///
    /// To keep the base fee from being driven by gas limits nobody uses, the accumulated gas
    /// wanted is discounted by the minimum gas multiplier but never below the gas actually used:
    /// `block_gas_wanted = max(transient_gas_wanted * min_gas_multiplier, block_gas_used)`.
    pub fn end_block(&self, ctx: &mut Context) -> Result<u64, FeeMarketError> {
        let params = self.get_params(ctx)?;
        let gas_wanted = self.get_transient_gas_wanted(ctx);
        self.set_transient_gas_wanted(ctx, 0)?;

        if params.no_base_fee {
            self.set_block_gas_wanted(ctx, 0)?;
            return Ok(0);
        }

        let block_gas_meter = ctx
            .block_gas_meter
            .as_ref()
            .ok_or(FeeMarketError::BlockGasMeterNotSet)?;
        let gas_used = std::cmp::min(block_gas_meter.gas_consumed(), block_gas_meter.limit());

        let limited_gas_wanted = Dec::from_u64(gas_wanted)
            .checked_mul(params.min_gas_multiplier)
            .ok_or_else(|| FeeMarketError::GasOverflow("block gas wanted".to_string()))?;
        let block_gas_wanted = std::cmp::max(limited_gas_wanted, Dec::from_u64(gas_used))
            .truncate_int();
        let block_gas_wanted = u64::try_from(block_gas_wanted)
            .map_err(|_| FeeMarketError::GasOverflow(format!("block gas wanted {block_gas_wanted}")))?;
        self.set_block_gas_wanted(ctx, block_gas_wanted)?;

        let next_height = ctx
            .block_height()
            .checked_add(1)
            .ok_or_else(|| FatalError::Overflow("block height".to_string()))?;
        if let Some(base_fee) = self.calculate_base_fee(ctx, next_height)? {
            self.set_base_fee(ctx, base_fee)?;
            tracing::debug!(
                target: "feemarket",
                height = ctx.block_height(),
                block_gas_wanted,
                base_fee = %base_fee,
                "updated base fee"
            );
        }

        Ok(block_gas_wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feemarket::Params;
    use crate::gas::GasMeter;
    use crate::store::MemoryStore;
    use crate::types::{BlockHeader, BlockParams, ConsensusParams};
    use alloy_primitives::Address;

    fn header(height: u64) -> BlockHeader {
        BlockHeader { height, ..Default::default() }
    }

    #[test]
    fn gas_wanted_is_discounted_by_multiplier() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, header(1))
            .with_block_gas_meter(GasMeter::new(10_000_000))
            .with_consensus_params(ConsensusParams {
                block: Some(BlockParams { max_bytes: 0, max_gas: 10_000_000 }),
            });
        let keeper = Keeper::new(Address::ZERO);

        keeper.add_transient_gas_wanted(&mut ctx, 5_000_000).unwrap();
        assert_eq!(keeper.end_block(&mut ctx).unwrap(), 2_500_000);
        assert_eq!(keeper.get_block_gas_wanted(&ctx), 2_500_000);
        assert_eq!(keeper.get_transient_gas_wanted(&ctx), 0);

        // 2.5M wanted against a 5M target lowers the base fee by 1/16
        let base_fee = keeper.get_base_fee(&ctx).unwrap().unwrap();
        assert_eq!(base_fee.truncate_u64(), Some(937_500_000));
    }

    #[test]
    fn gas_used_bounds_gas_wanted_from_below() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut block_gas_meter = GasMeter::new(10_000_000);
        block_gas_meter.consume_gas(4_000_000, "block").unwrap();
        let mut ctx = Context::new(&mut store, &mut transient, header(1)).with_block_gas_meter(block_gas_meter);
        let keeper = Keeper::new(Address::ZERO);

        keeper.add_transient_gas_wanted(&mut ctx, 5_000_000).unwrap();
        assert_eq!(keeper.end_block(&mut ctx).unwrap(), 4_000_000);
    }

    #[test]
    fn fixed_price_mode_skips_arithmetic() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, header(1));
        let keeper = Keeper::new(Address::ZERO);
        let params = Params { no_base_fee: true, ..Default::default() };
        keeper.set_params(&mut ctx, &params).unwrap();

        keeper.add_transient_gas_wanted(&mut ctx, 5_000_000).unwrap();
        // no block gas meter needed
        assert_eq!(keeper.end_block(&mut ctx).unwrap(), 0);
        assert_eq!(keeper.get_transient_gas_wanted(&ctx), 0);
        assert_eq!(keeper.get_params(&ctx).unwrap().base_fee, params.base_fee);
    }

    #[test]
    fn missing_block_gas_meter() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, header(1));
        assert!(matches!(
            Keeper::new(Address::ZERO).end_block(&mut ctx),
            Err(FeeMarketError::BlockGasMeterNotSet)
        ));
    }

    #[test]
    fn first_enabled_block_uses_configured_base_fee() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, header(4)).with_block_gas_meter(GasMeter::new(100));
        let keeper = Keeper::new(Address::ZERO);
        let params = Params { enable_height: 5, ..Default::default() };
        keeper.set_params(&mut ctx, &params).unwrap();

        keeper.end_block(&mut ctx).unwrap();
        assert_eq!(keeper.get_params(&ctx).unwrap().base_fee, params.base_fee);
    }
}
