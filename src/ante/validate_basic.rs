/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Stateless sanity checks of the transaction and of the Ethereum messages it carries.

use crate::context::Context;
use crate::error::TransitionError;
use crate::evm;
use crate::types::{Coin, EthTx, TxType};

use super::{AnteDecorator, AnteError, Msg, Tx};

pub struct ValidateBasic {
    evm_keeper: evm::Keeper,
}

impl ValidateBasic {
    pub fn new(evm_keeper: evm::Keeper) -> Self {
        Self { evm_keeper }
    }

    fn validate_eth_tx(&self, ctx: &Context, tx: &EthTx) -> Result<(), AnteError> {
        for (name, value) in [
            ("value", tx.value),
            ("gas price", tx.gas_price),
            ("gas fee cap", tx.gas_fee_cap),
            ("gas tip cap", tx.gas_tip_cap),
        ] {
            if value.is_negative() {
                return Err(AnteError::InvalidTx(format!("{name} cannot be negative: {value}")));
            }
        }
        if tx.tx_type == TxType::DynamicFee && tx.gas_fee_cap < tx.gas_tip_cap {
            return Err(AnteError::InvalidTx(format!(
                "max priority fee per gas higher than max fee per gas ({} > {})",
                tx.gas_tip_cap, tx.gas_fee_cap
            )));
        }

        let chain_id = self.evm_keeper.chain_config().chain_id;
        if tx.chain_id != chain_id {
            return Err(AnteError::InvalidTx(format!(
                "invalid chain id: expected {chain_id}, got {}",
                tx.chain_id
            )));
        }

        let intrinsic = self.evm_keeper.get_eth_intrinsic_gas(ctx, &tx.to_message(None)?)?;
        if tx.gas_limit < intrinsic {
            return Err(TransitionError::IntrinsicGas {
                gas_limit: tx.gas_limit,
                intrinsic,
            }
            .into());
        }
        Ok(())
    }
}

fn validate_coins(what: &str, coins: &[Coin]) -> Result<(), AnteError> {
    match coins.iter().find(|coin| coin.amount.is_negative() || coin.denom.is_empty()) {
        Some(coin) => Err(AnteError::InvalidCoins(format!("{what}: {}{}", coin.amount, coin.denom))),
        None => Ok(()),
    }
}

impl AnteDecorator for ValidateBasic {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, _simulate: bool) -> Result<(), AnteError> {
        if tx.msgs.is_empty() {
            return Err(AnteError::InvalidTx("must contain at least one message".to_string()));
        }
        validate_coins("fee", tx.fee())?;

        if tx.timeout_height != 0 && ctx.block_height() > tx.timeout_height {
            return Err(AnteError::InvalidTx(format!(
                "block height {} is past the timeout height {}",
                ctx.block_height(),
                tx.timeout_height
            )));
        }

        for msg in &tx.msgs {
            match msg {
                Msg::Send { amount, .. } => validate_coins("send amount", amount)?,
                Msg::EthereumTx(eth_tx) => self.validate_eth_tx(ctx, eth_tx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{I256, U256};

    #[test]
    fn negative_coins_are_invalid() {
        let good = vec![Coin::new("aatom", U256::from(1)).unwrap()];
        validate_coins("fee", &good).unwrap();

        let negative = vec![Coin { denom: "aatom".to_string(), amount: I256::MINUS_ONE }];
        assert!(matches!(validate_coins("fee", &negative), Err(AnteError::InvalidCoins(_))));

        let unnamed = vec![Coin { denom: String::new(), amount: I256::ONE }];
        assert!(validate_coins("send amount", &unnamed).is_err());
    }
}
