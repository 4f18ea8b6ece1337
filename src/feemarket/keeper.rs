/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Keeper of the fee market state: parameters (holding the current base fee), block gas wanted
//! and the transient gas wanted accumulator.

use alloy_primitives::{Address, U256};

use crate::context::Context;
use crate::decimal::Dec;
use crate::error::FatalError;
use crate::store::{read_u64, KvStore};

use super::{keys, FeeMarketError, Params, STORE_KEY};

/// Stateless handle over the fee market namespace of a [Context].
#[derive(Debug, Clone)]
pub struct Keeper {
    /// account allowed to update the parameters
    authority: Address,
}

impl Keeper {
    pub fn new(authority: Address) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    /// Stored parameters, or the defaults before genesis has set them.
    pub fn get_params(&self, ctx: &Context) -> Result<Params, FatalError> {
        match ctx.kv(STORE_KEY).get(keys::PARAMS) {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| FatalError::CorruptParams(e.to_string()))
            }
            None => Ok(Params::default()),
        }
    }

    pub fn set_params(&self, ctx: &mut Context, params: &Params) -> Result<(), FeeMarketError> {
        params.validate()?;
        let bytes = serde_json::to_vec(params).map_err(|e| FeeMarketError::InvalidParams(e.to_string()))?;
        ctx.kv_mut(STORE_KEY).set(keys::PARAMS, bytes)?;
        Ok(())
    }

    pub fn get_base_fee_enabled(&self, ctx: &Context) -> Result<bool, FatalError> {
        Ok(self.get_params(ctx)?.is_base_fee_enabled(ctx.block_height()))
    }

    /// Base fee of the current block. None in fixed price mode. Before `enable_height` the
    /// configured base fee is still reported; whether it applies is decided by the fork schedule.
    pub fn get_base_fee(&self, ctx: &Context) -> Result<Option<Dec>, FatalError> {
        let params = self.get_params(ctx)?;
        if params.no_base_fee {
            return Ok(None);
        }
        Ok(Some(params.base_fee))
    }

    /// Base fee as an integer amount, for the execution environment.
    pub fn get_base_fee_int(&self, ctx: &Context) -> Result<Option<U256>, FatalError> {
        Ok(self.get_base_fee(ctx)?.map(|base_fee| base_fee.truncate_int()))
    }

    pub fn set_base_fee(&self, ctx: &mut Context, base_fee: Dec) -> Result<(), FeeMarketError> {
        let mut params = self.get_params(ctx)?;
        params.base_fee = base_fee;
        self.set_params(ctx, &params)
    }

    pub fn get_block_gas_wanted(&self, ctx: &Context) -> u64 {
        read_u64(ctx.kv(STORE_KEY).get(keys::BLOCK_GAS_WANTED))
    }

    pub fn set_block_gas_wanted(&self, ctx: &mut Context, gas: u64) -> Result<(), FeeMarketError> {
        ctx.kv_mut(STORE_KEY)
            .set(keys::BLOCK_GAS_WANTED, gas.to_be_bytes().to_vec())?;
        Ok(())
    }

    pub fn get_transient_gas_wanted(&self, ctx: &Context) -> u64 {
        read_u64(ctx.transient_kv(STORE_KEY).get(keys::TRANSIENT_GAS_WANTED))
    }

    pub fn set_transient_gas_wanted(&self, ctx: &mut Context, gas: u64) -> Result<(), FeeMarketError> {
        ctx.transient_kv_mut(STORE_KEY)
            .set(keys::TRANSIENT_GAS_WANTED, gas.to_be_bytes().to_vec())?;
        Ok(())
    }

    /// Fold the gas limit of one transaction into the block accumulator, returning the new total.
    pub fn add_transient_gas_wanted(&self, ctx: &mut Context, gas: u64) -> Result<u64, FeeMarketError> {
        let total = self
            .get_transient_gas_wanted(ctx)
            .checked_add(gas)
            .ok_or_else(|| FeeMarketError::GasOverflow("transient gas wanted".to_string()))?;
        self.set_transient_gas_wanted(ctx, total)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::BlockHeader;

    #[test]
    fn params_default_then_stored() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, BlockHeader::default());
        let keeper = Keeper::new(Address::ZERO);

        assert_eq!(keeper.get_params(&ctx).unwrap(), Params::default());

        keeper.set_base_fee(&mut ctx, Dec::from_u64(7)).unwrap();
        assert_eq!(keeper.get_base_fee(&ctx).unwrap(), Some(Dec::from_u64(7)));
        assert_eq!(keeper.get_base_fee_int(&ctx).unwrap(), Some(U256::from(7)));

        let params = Params { no_base_fee: true, ..Default::default() };
        keeper.set_params(&mut ctx, &params).unwrap();
        assert_eq!(keeper.get_base_fee(&ctx).unwrap(), None);
        assert!(!keeper.get_base_fee_enabled(&ctx).unwrap());

        let invalid = Params { elasticity_multiplier: 0, ..Default::default() };
        assert!(keeper.set_params(&mut ctx, &invalid).is_err());
    }

    #[test]
    fn transient_gas_wanted_accumulates() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, BlockHeader::default());
        let keeper = Keeper::new(Address::ZERO);

        assert_eq!(keeper.add_transient_gas_wanted(&mut ctx, 100).unwrap(), 100);
        assert_eq!(keeper.add_transient_gas_wanted(&mut ctx, 50).unwrap(), 150);
        assert!(matches!(
            keeper.add_transient_gas_wanted(&mut ctx, u64::MAX),
            Err(FeeMarketError::GasOverflow(_))
        ));
        assert_eq!(keeper.get_transient_gas_wanted(&ctx), 150);
        // persistent counter untouched
        assert_eq!(keeper.get_block_gas_wanted(&ctx), 0);
    }

    #[test]
    fn corrupt_params_are_fatal() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, BlockHeader::default());
        ctx.kv_mut(STORE_KEY).set(keys::PARAMS, b"not json".to_vec()).unwrap();
        assert!(matches!(
            Keeper::new(Address::ZERO).get_params(&ctx),
            Err(FatalError::CorruptParams(_))
        ));
    }
}
