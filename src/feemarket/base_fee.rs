/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Base fee control law.

use alloy_primitives::U256;

use crate::context::Context;
use crate::decimal::Dec;
use crate::error::FatalError;

use super::Keeper;

/// Base fee of the block following a parent block with the given base fee and gas wanted.
///
/// With `target = block_gas_limit / elasticity_multiplier`:
/// - gas wanted equal to the target keeps the base fee,
/// - above the target it grows by `max(1, base_fee * (wanted - target) / target / denominator)`,
/// - below the target it shrinks by `base_fee * (target - wanted) / target / denominator`, never
///   below `min_gas_price`.
pub fn calculate_base_fee(
    parent_base_fee: Dec,
    parent_gas_wanted: u64,
    block_gas_limit: u64,
    elasticity_multiplier: u32,
    base_fee_change_denominator: u32,
    min_gas_price: Dec,
) -> Result<Dec, FatalError> {
    if elasticity_multiplier == 0 {
        return Err(FatalError::ZeroElasticityMultiplier);
    }
    if base_fee_change_denominator == 0 {
        return Err(FatalError::ZeroBaseFeeChangeDenominator);
    }

    let target = block_gas_limit / elasticity_multiplier as u64;
    if parent_gas_wanted == target {
        return Ok(parent_base_fee);
    }
    if target == 0 {
        return Ok(Dec::ZERO);
    }

    let overflow = || FatalError::Overflow("base fee delta".to_string());
    let delta = |gas_delta: u64| -> Result<Dec, FatalError> {
        parent_base_fee
            .checked_mul_int(U256::from(gas_delta))
            .and_then(|x| x.checked_quo_int(U256::from(target)))
            .and_then(|y| y.checked_quo_int(U256::from(base_fee_change_denominator)))
            .ok_or_else(overflow)
    };

    if parent_gas_wanted > target {
        let delta = std::cmp::max(delta(parent_gas_wanted - target)?, Dec::one());
        parent_base_fee.checked_add(delta).ok_or_else(overflow)
    } else {
        let delta = delta(target - parent_gas_wanted)?;
        Ok(std::cmp::max(parent_base_fee.saturating_sub(delta), min_gas_price))
    }
}

impl Keeper {
    /// Base fee of the block at `height`, given the state at the end of the previous block.
    /// None when dynamic pricing is not enabled at `height`.
    pub fn calculate_base_fee(&self, ctx: &Context, height: u64) -> Result<Option<Dec>, FatalError> {
        let params = self.get_params(ctx)?;
        if !params.is_base_fee_enabled(height) {
            return Ok(None);
        }

        // first block with dynamic pricing starts from the configured base fee
        if height == params.enable_height {
            return Ok(Some(params.base_fee));
        }

        let base_fee = calculate_base_fee(
            params.base_fee,
            self.get_block_gas_wanted(ctx),
            ctx.consensus_params.block_gas_limit(),
            params.elasticity_multiplier,
            params.base_fee_change_denominator,
            params.min_gas_price,
        )?;
        Ok(Some(base_fee))
    }
}
