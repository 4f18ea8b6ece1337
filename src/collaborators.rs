/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Interfaces of the host chain modules the execution core relies on. They are implemented
//! outside of this crate; `tests/common` carries simulated versions.
//!
//! Every keeper is a stateless handle. State lives in the [Context] stores so that it is branched
//! and reverted together with the state of this crate.

use alloy_primitives::{Address, U256};

use crate::context::Context;
use crate::crypto::PubKey;
use crate::types::Coin;

/// Name of the module account which collects transaction fees.
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Name of the module account the EVM mints into and burns from when balances change.
pub const EVM_MODULE: &str = "evm";

/// Account as seen by the host chain: sequence (the Ethereum nonce), account number and public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseAccount {
    pub address: Address,
    pub pub_key: Option<PubKey>,
    pub account_number: u64,
    pub sequence: u64,
}

pub trait AccountKeeper: Send + Sync {
    fn get_account(&self, ctx: &Context, address: &Address) -> Option<BaseAccount>;

    /// Create an account with the next account number. It is not stored until [AccountKeeper::set_account].
    fn new_account(&self, ctx: &mut Context, address: &Address) -> anyhow::Result<BaseAccount>;

    fn set_account(&self, ctx: &mut Context, account: BaseAccount) -> anyhow::Result<()>;

    fn remove_account(&self, ctx: &mut Context, address: &Address) -> anyhow::Result<()>;

    fn module_address(&self, module: &str) -> Address;
}

pub trait BankKeeper: Send + Sync {
    fn get_balance(&self, ctx: &Context, address: &Address, denom: &str) -> U256;

    fn send_coins(&self, ctx: &mut Context, from: &Address, to: &Address, amount: &[Coin]) -> anyhow::Result<()>;

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: &Address,
        amount: &[Coin],
    ) -> anyhow::Result<()>;

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: &Address,
        module: &str,
        amount: &[Coin],
    ) -> anyhow::Result<()>;

    fn mint_coins(&self, ctx: &mut Context, module: &str, amount: &[Coin]) -> anyhow::Result<()>;

    fn burn_coins(&self, ctx: &mut Context, module: &str, amount: &[Coin]) -> anyhow::Result<()>;
}

pub trait FeeGrantKeeper: Send + Sync {
    /// Charge `fee` against the allowance `granter` gave to `grantee`.
    fn use_granted_fees(
        &self,
        ctx: &mut Context,
        granter: &Address,
        grantee: &Address,
        fee: &[Coin],
    ) -> anyhow::Result<()>;
}

/// Validator resolved from a consensus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub operator_address: Address,
    pub consensus_address: Vec<u8>,
}

pub trait StakingKeeper: Send + Sync {
    fn validator_by_cons_addr(&self, ctx: &Context, consensus_address: &[u8]) -> Option<Validator>;
}
