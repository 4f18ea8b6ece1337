/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Governance message of the fee market.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::context::Context;

use super::{FeeMarketError, Keeper, Params};

/// Replace the fee market parameters. Only the keeper authority may send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: Address,
    pub params: Params,
}

impl Keeper {
    pub fn update_params(&self, ctx: &mut Context, msg: &MsgUpdateParams) -> Result<(), FeeMarketError> {
        if msg.authority != self.authority() {
            return Err(FeeMarketError::InvalidAuthority {
                expected: self.authority(),
                got: msg.authority,
            });
        }
        self.set_params(ctx, &msg.params)?;
        tracing::debug!(target: "feemarket", authority = %msg.authority, "params updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Dec;
    use crate::store::MemoryStore;
    use crate::types::BlockHeader;

    #[test]
    fn only_authority_updates_params() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let mut ctx = Context::new(&mut store, &mut transient, BlockHeader::default());
        let authority = Address::repeat_byte(0xaa);
        let keeper = Keeper::new(authority);

        let params = Params { min_gas_price: Dec::from_u64(10), ..Default::default() };
        let msg = MsgUpdateParams { authority: Address::repeat_byte(0xbb), params: params.clone() };
        assert!(matches!(
            keeper.update_params(&mut ctx, &msg),
            Err(FeeMarketError::InvalidAuthority { .. })
        ));
        assert_eq!(keeper.get_params(&ctx).unwrap(), Params::default());

        let msg = MsgUpdateParams { authority, params: params.clone() };
        keeper.update_params(&mut ctx, &msg).unwrap();
        assert_eq!(keeper.get_params(&ctx).unwrap(), params);
    }
}
