/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

use pchain_evm::collaborators::{
    AccountKeeper, BankKeeper, BaseAccount, FeeGrantKeeper, StakingKeeper, Validator,
};
use pchain_evm::crypto::{keccak256, PubKey};
use pchain_evm::store::KvStore;
use pchain_evm::types::{amount_of, Coin};
use pchain_evm::Context;

const ACCOUNT_STORE: &[u8] = b"acc/";
const BANK_STORE: &[u8] = b"bank/";
const FEE_GRANT_STORE: &[u8] = b"feegrant/";
const NEXT_ACCOUNT_NUMBER: &[u8] = b"next";

pub fn module_address(module: &str) -> Address {
    Address::from_slice(&keccak256(module.as_bytes())[12..])
}

#[derive(Serialize, Deserialize)]
struct StoredAccount {
    pub_key: Option<PubKey>,
    account_number: u64,
    sequence: u64,
}

/// Accounts kept in the persistent store of the context, so they branch with it.
#[derive(Default)]
pub struct SimulateAccountKeeper;

impl AccountKeeper for SimulateAccountKeeper {
    fn get_account(&self, ctx: &Context, address: &Address) -> Option<BaseAccount> {
        let bytes = ctx.kv(ACCOUNT_STORE).get(address.as_slice())?;
        let stored: StoredAccount = serde_json::from_slice(&bytes).ok()?;
        Some(BaseAccount {
            address: *address,
            pub_key: stored.pub_key,
            account_number: stored.account_number,
            sequence: stored.sequence,
        })
    }

    fn new_account(&self, ctx: &mut Context, address: &Address) -> anyhow::Result<BaseAccount> {
        let next = ctx
            .kv(ACCOUNT_STORE)
            .get(NEXT_ACCOUNT_NUMBER)
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map_or(0, u64::from_be_bytes);
        ctx.kv_mut(ACCOUNT_STORE)
            .set(NEXT_ACCOUNT_NUMBER, (next + 1).to_be_bytes().to_vec())?;
        Ok(BaseAccount {
            address: *address,
            pub_key: None,
            account_number: next,
            sequence: 0,
        })
    }

    fn set_account(&self, ctx: &mut Context, account: BaseAccount) -> anyhow::Result<()> {
        let stored = StoredAccount {
            pub_key: account.pub_key,
            account_number: account.account_number,
            sequence: account.sequence,
        };
        ctx.kv_mut(ACCOUNT_STORE)
            .set(account.address.as_slice(), serde_json::to_vec(&stored)?)?;
        Ok(())
    }

    fn remove_account(&self, ctx: &mut Context, address: &Address) -> anyhow::Result<()> {
        ctx.kv_mut(ACCOUNT_STORE).delete(address.as_slice())?;
        Ok(())
    }

    fn module_address(&self, module: &str) -> Address {
        module_address(module)
    }
}

/// Balances kept in the persistent store of the context, keyed by address and denom.
#[derive(Default)]
pub struct SimulateBankKeeper;

impl SimulateBankKeeper {
    fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
        [address.as_slice(), denom.as_bytes()].concat()
    }

    fn set_balance(&self, ctx: &mut Context, address: &Address, denom: &str, amount: U256) -> anyhow::Result<()> {
        let key = Self::balance_key(address, denom);
        if amount.is_zero() {
            ctx.kv_mut(BANK_STORE).delete(&key)?;
        } else {
            ctx.kv_mut(BANK_STORE).set(&key, amount.to_be_bytes::<32>().to_vec())?;
        }
        Ok(())
    }

    fn add(&self, ctx: &mut Context, address: &Address, coins: &[Coin]) -> anyhow::Result<()> {
        for coin in coins {
            let amount = non_negative(coin)?;
            let balance = self.get_balance(ctx, address, &coin.denom);
            let balance = balance.checked_add(amount).ok_or_else(|| anyhow!("balance overflow"))?;
            self.set_balance(ctx, address, &coin.denom, balance)?;
        }
        Ok(())
    }

    fn sub(&self, ctx: &mut Context, address: &Address, coins: &[Coin]) -> anyhow::Result<()> {
        for coin in coins {
            let amount = non_negative(coin)?;
            let balance = self.get_balance(ctx, address, &coin.denom);
            let Some(balance) = balance.checked_sub(amount) else {
                bail!("insufficient funds: {balance}{} < {amount}{}", coin.denom, coin.denom);
            };
            self.set_balance(ctx, address, &coin.denom, balance)?;
        }
        Ok(())
    }
}

fn non_negative(coin: &Coin) -> anyhow::Result<U256> {
    if coin.amount.is_negative() {
        bail!("negative coin amount {}{}", coin.amount, coin.denom);
    }
    Ok(coin.amount.into_raw())
}

impl BankKeeper for SimulateBankKeeper {
    fn get_balance(&self, ctx: &Context, address: &Address, denom: &str) -> U256 {
        ctx.kv(BANK_STORE)
            .get(&Self::balance_key(address, denom))
            .map_or(U256::ZERO, |bytes| U256::from_be_slice(&bytes))
    }

    fn send_coins(&self, ctx: &mut Context, from: &Address, to: &Address, amount: &[Coin]) -> anyhow::Result<()> {
        self.sub(ctx, from, amount)?;
        self.add(ctx, to, amount)
    }

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: &Address,
        amount: &[Coin],
    ) -> anyhow::Result<()> {
        self.send_coins(ctx, &module_address(module), to, amount)
    }

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: &Address,
        module: &str,
        amount: &[Coin],
    ) -> anyhow::Result<()> {
        self.send_coins(ctx, from, &module_address(module), amount)
    }

    fn mint_coins(&self, ctx: &mut Context, module: &str, amount: &[Coin]) -> anyhow::Result<()> {
        self.add(ctx, &module_address(module), amount)
    }

    fn burn_coins(&self, ctx: &mut Context, module: &str, amount: &[Coin]) -> anyhow::Result<()> {
        self.sub(ctx, &module_address(module), amount)
    }
}

/// Fee allowances in a single denom, keyed by granter and grantee.
pub struct SimulateFeeGrantKeeper {
    pub denom: String,
}

impl SimulateFeeGrantKeeper {
    fn key(granter: &Address, grantee: &Address) -> Vec<u8> {
        [granter.as_slice(), grantee.as_slice()].concat()
    }

    pub fn grant(&self, ctx: &mut Context, granter: &Address, grantee: &Address, allowance: U256) {
        ctx.kv_mut(FEE_GRANT_STORE)
            .set(&Self::key(granter, grantee), allowance.to_be_bytes::<32>().to_vec())
            .unwrap();
    }

    pub fn allowance(&self, ctx: &Context, granter: &Address, grantee: &Address) -> Option<U256> {
        ctx.kv(FEE_GRANT_STORE)
            .get(&Self::key(granter, grantee))
            .map(|bytes| U256::from_be_slice(&bytes))
    }
}

impl FeeGrantKeeper for SimulateFeeGrantKeeper {
    fn use_granted_fees(&self, ctx: &mut Context, granter: &Address, grantee: &Address, fee: &[Coin]) -> anyhow::Result<()> {
        let Some(allowance) = self.allowance(ctx, granter, grantee) else {
            bail!("fee allowance not found");
        };
        let Some(spent) = amount_of(fee, &self.denom) else {
            bail!("fee amount overflows");
        };
        let Some(left) = allowance.checked_sub(spent) else {
            bail!("basic allowance limit exceeded");
        };
        ctx.kv_mut(FEE_GRANT_STORE)
            .set(&Self::key(granter, grantee), left.to_be_bytes::<32>().to_vec())?;
        Ok(())
    }
}

/// Fixed validator set.
#[derive(Default)]
pub struct SimulateStakingKeeper {
    pub validators: Vec<Validator>,
}

impl StakingKeeper for SimulateStakingKeeper {
    fn validator_by_cons_addr(&self, _ctx: &Context, consensus_address: &[u8]) -> Option<Validator> {
        self.validators
            .iter()
            .find(|validator| validator.consensus_address == consensus_address)
            .cloned()
    }
}
