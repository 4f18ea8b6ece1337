/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fee stages of the admission pipeline: the global minimum gas price, the fee checker which
//! prices a transaction against the base fee, and the deduction of the fee.
//!
//! The [TxFeeChecker] is a pure function of the context and the transaction. [TxFeeCheck]
//! runs it to reject underpaying transactions early and to assign the mempool priority;
//! [DeductFee] runs it again at the end of the pipeline to learn the amount to deduct.

use std::sync::Arc;

use alloy_primitives::U256;

use crate::collaborators::{AccountKeeper, BankKeeper, FeeGrantKeeper, FEE_COLLECTOR};
use crate::context::Context;
use crate::error::FatalError;
use crate::evm;
use crate::feemarket;
use crate::types::{amount_of, effective_gas_price, Coin};

use super::{AnteDecorator, AnteError, ExtensionOption, Tx};

/// Priority of a transaction is its tip per gas divided by this reduction.
pub const DEFAULT_PRIORITY_REDUCTION: u64 = 1_000_000;

/// Computes the fee a transaction pays and its mempool priority.
pub type TxFeeChecker = Arc<dyn Fn(&Context, &Tx) -> Result<(Vec<Coin>, i64), AnteError> + Send + Sync>;

/// Fee checker pricing transactions with EIP-1559 rules once London is active and the base fee
/// is enabled, and against the minimum gas prices of the validator otherwise.
pub fn new_dynamic_fee_checker(evm_keeper: evm::Keeper) -> TxFeeChecker {
    Arc::new(move |ctx: &Context, tx: &Tx| dynamic_fee_check(&evm_keeper, ctx, tx))
}

fn dynamic_fee_check(evm_keeper: &evm::Keeper, ctx: &Context, tx: &Tx) -> Result<(Vec<Coin>, i64), AnteError> {
    // genesis transactions and pre-London blocks
    if ctx.block_height() == 0 || !evm_keeper.chain_config().is_london(ctx.block_height()) {
        return check_tx_fee_with_validator_min_gas_prices(ctx, tx);
    }
    let Some(base_fee) = evm_keeper.get_base_fee(ctx)? else {
        return check_tx_fee_with_validator_min_gas_prices(ctx, tx);
    };
    let denom = evm_keeper.chain_config().denom();

    // without the extension option the tip is only capped by the fee
    let max_priority_price = match tx.extension_options.iter().find_map(|option| match option {
        ExtensionOption::DynamicFee { max_priority_price } => Some(*max_priority_price),
        _ => None,
    }) {
        Some(price) if price.is_negative() => {
            return Err(AnteError::InsufficientFee("max priority price cannot be negative".to_string()));
        }
        Some(price) => price.into_raw(),
        None => U256::from(i64::MAX as u64),
    };

    let gas = tx.gas();
    if gas == 0 {
        return Err(AnteError::InvalidGasLimit("must provide positive gas".to_string()));
    }
    let gas = U256::from(gas);

    // fee_cap = fee / gas
    let fee_cap = provided_amount(tx.fee(), denom)? / gas;
    if fee_cap < base_fee {
        return Err(AnteError::InsufficientFee(format!(
            "gas prices too low, got: {fee_cap}{denom} required: {base_fee}{denom}. \
             Please retry using a higher gas price or a higher fee"
        )));
    }

    let effective_price = effective_gas_price(base_fee, fee_cap, max_priority_price);
    // effective_price <= fee_cap, so the product stays within the provided fee
    let effective_fee = effective_price
        .checked_mul(gas)
        .ok_or_else(|| FatalError::Overflow("effective fee".to_string()))?;
    let effective_fee = vec![Coin::new(denom, effective_fee)?];

    // priorities beyond i64 all rank first
    let priority = (effective_price - base_fee) / U256::from(DEFAULT_PRIORITY_REDUCTION);
    Ok((effective_fee, i64::try_from(priority).unwrap_or(i64::MAX)))
}

fn provided_amount(fee: &[Coin], denom: &str) -> Result<U256, AnteError> {
    amount_of(fee, denom).ok_or_else(|| AnteError::InvalidCoins(format!("fee amount of {denom} overflows")))
}

/// Fee check against the node-local minimum gas prices, enforced only in check mode. Every
/// minimum price requires `ceil(price * gas)` of its denom and the fee must cover at least one.
pub fn check_tx_fee_with_validator_min_gas_prices(ctx: &Context, tx: &Tx) -> Result<(Vec<Coin>, i64), AnteError> {
    let fee = tx.fee();
    let gas = tx.gas();

    if ctx.is_check_tx && ctx.min_gas_prices.iter().any(|price| !price.amount.is_zero()) {
        let mut required = Vec::with_capacity(ctx.min_gas_prices.len());
        for price in &ctx.min_gas_prices {
            let amount = price
                .amount
                .checked_mul_int(U256::from(gas))
                .ok_or_else(|| AnteError::InsufficientFee("required fee overflows".to_string()))?
                .ceil_int();
            required.push(Coin::new(price.denom.clone(), amount)?);
        }
        let mut covered = false;
        for coin in &required {
            covered |= provided_amount(fee, &coin.denom)? >= coin.amount.into_raw();
        }
        if !covered {
            return Err(AnteError::InsufficientFee(format!(
                "insufficient fees; got: {} required: {}",
                display_coins(fee),
                display_coins(&required)
            )));
        }
    }

    Ok((fee.to_vec(), tx_priority(fee, gas)))
}

/// Lowest gas price among the fee coins, reduced.
fn tx_priority(fee: &[Coin], gas: u64) -> i64 {
    if gas == 0 {
        return 0;
    }
    let mut priority = 0;
    for coin in fee.iter().filter(|coin| !coin.amount.is_negative()) {
        let gas_price = coin.amount.into_raw() / U256::from(gas);
        let reduced = gas_price / U256::from(DEFAULT_PRIORITY_REDUCTION);
        let p = i64::try_from(reduced).unwrap_or(i64::MAX);
        if priority == 0 || p < priority {
            priority = p;
        }
    }
    priority
}

fn display_coins(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|coin| format!("{}{}", coin.amount, coin.denom))
        .collect::<Vec<_>>()
        .join(",")
}

/// Rejects transactions whose fee does not cover the global minimum gas price of the fee
/// market, `ceil(min_gas_price * gas)` in the gas denom.
pub struct MinGasPrice {
    fee_market_keeper: feemarket::Keeper,
    denom: String,
}

impl MinGasPrice {
    pub fn new(fee_market_keeper: feemarket::Keeper, denom: String) -> Self {
        Self { fee_market_keeper, denom }
    }
}

impl AnteDecorator for MinGasPrice {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError> {
        let min_gas_price = self.fee_market_keeper.get_params(ctx)?.min_gas_price;
        if min_gas_price.is_zero() || simulate {
            return Ok(());
        }

        let required = min_gas_price
            .checked_mul_int(U256::from(tx.gas()))
            .ok_or_else(|| AnteError::InsufficientFee("required fee overflows".to_string()))?
            .ceil_int();

        if tx.fee().is_empty() {
            return Err(AnteError::InsufficientFee(format!(
                "fee not provided. The minimum global fee for this tx is: {required}{}",
                self.denom
            )));
        }

        let provided = provided_amount(tx.fee(), &self.denom)?;
        if provided < required {
            return Err(AnteError::InsufficientFee(format!(
                "provided fee < minimum global fee ({provided}{denom} < {required}{denom}). Please increase the gas price.",
                denom = self.denom
            )));
        }
        Ok(())
    }
}

/// Runs the fee checker and assigns the priority of the transaction.
pub struct TxFeeCheck {
    checker: TxFeeChecker,
}

impl TxFeeCheck {
    pub fn new(checker: TxFeeChecker) -> Self {
        Self { checker }
    }
}

impl AnteDecorator for TxFeeCheck {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError> {
        if simulate {
            return Ok(());
        }
        if ctx.block_height() > 0 && tx.gas() == 0 {
            return Err(AnteError::InvalidGasLimit("must provide positive gas".to_string()));
        }
        let (_, priority) = (self.checker)(ctx, tx)?;
        ctx.priority = priority;
        Ok(())
    }
}

/// Moves the fee from the payer, or from the fee granter, to the fee collector.
pub struct DeductFee {
    account_keeper: Arc<dyn AccountKeeper>,
    bank_keeper: Arc<dyn BankKeeper>,
    fee_grant_keeper: Option<Arc<dyn FeeGrantKeeper>>,
    checker: TxFeeChecker,
}

impl DeductFee {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        bank_keeper: Arc<dyn BankKeeper>,
        fee_grant_keeper: Option<Arc<dyn FeeGrantKeeper>>,
        checker: TxFeeChecker,
    ) -> Self {
        Self {
            account_keeper,
            bank_keeper,
            fee_grant_keeper,
            checker,
        }
    }
}

impl AnteDecorator for DeductFee {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError> {
        let fee = if simulate {
            tx.fee().to_vec()
        } else {
            (self.checker)(ctx, tx)?.0
        };

        let payer = tx
            .fee_payer()
            .ok_or_else(|| AnteError::InvalidTx("no fee payer".to_string()))?;
        if self.account_keeper.get_account(ctx, &payer).is_none() {
            return Err(AnteError::UnknownAddress(payer));
        }

        let mut deduct_from = payer;
        if let Some(granter) = tx.fee_granter() {
            let Some(fee_grant_keeper) = &self.fee_grant_keeper else {
                return Err(AnteError::InvalidTx("fee grants are not enabled".to_string()));
            };
            if granter != payer {
                fee_grant_keeper
                    .use_granted_fees(ctx, &granter, &payer, &fee)
                    .map_err(|e| AnteError::Unauthorized(format!("{granter} does not allow to pay fees for {payer}: {e}")))?;
            }
            deduct_from = granter;
        }
        if self.account_keeper.get_account(ctx, &deduct_from).is_none() {
            return Err(AnteError::UnknownAddress(deduct_from));
        }

        let fee: Vec<Coin> = fee.into_iter().filter(|coin| !coin.amount.is_zero()).collect();
        if fee.iter().any(|coin| coin.amount.is_negative()) {
            return Err(AnteError::InvalidCoins(format!("negative fee {}", display_coins(&fee))));
        }
        if !fee.is_empty() {
            self.bank_keeper
                .send_coins_from_account_to_module(ctx, &deduct_from, FEE_COLLECTOR, &fee)
                .map_err(AnteError::InsufficientFunds)?;
        }

        tracing::trace!(target: "ante", payer = %deduct_from, fee = %display_coins(&fee), "fee deducted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Dec;
    use crate::store::MemoryStore;
    use crate::types::{BlockHeader, DecCoin};

    fn tx_with_fee(amount: u64, gas: u64) -> Tx {
        Tx {
            fee: crate::ante::Fee {
                amount: vec![Coin::new("aatom", U256::from(amount)).unwrap()],
                gas_limit: gas,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn priority_is_lowest_reduced_gas_price() {
        let fee = vec![
            Coin::new("aatom", U256::from(30_000_000_u64)).unwrap(),
            Coin::new("uosmo", U256::from(50_000_000_u64)).unwrap(),
        ];
        assert_eq!(tx_priority(&fee, 10), 3);
        assert_eq!(tx_priority(&fee, 0), 0);
        assert_eq!(tx_priority(&[], 10), 0);
    }

    #[test]
    fn validator_min_gas_prices_only_bind_in_check_mode() {
        let mut store = MemoryStore::new();
        let mut transient = MemoryStore::new();
        let min_gas_prices = vec![DecCoin { denom: "aatom".to_string(), amount: Dec::from_u64(10) }];
        let ctx = Context::new(&mut store, &mut transient, BlockHeader::default())
            .with_min_gas_prices(min_gas_prices)
            .with_check_tx(true);

        // 10 * 1000 required
        assert!(matches!(
            check_tx_fee_with_validator_min_gas_prices(&ctx, &tx_with_fee(9_999, 1000)),
            Err(AnteError::InsufficientFee(_))
        ));
        let (fee, _) = check_tx_fee_with_validator_min_gas_prices(&ctx, &tx_with_fee(10_000, 1000)).unwrap();
        assert_eq!(fee, vec![Coin::new("aatom", U256::from(10_000)).unwrap()]);

        let ctx = ctx.with_check_tx(false);
        check_tx_fee_with_validator_min_gas_prices(&ctx, &tx_with_fee(1, 1000)).unwrap();
    }
}
