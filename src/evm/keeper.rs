/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Keeper of the EVM module and its [StateKeeper] implementation.
//!
//! Layout of the Ethereum state on the host chain:
//!
//! |Field     |Owner                 |Location                                  |
//! |:---      |:---                  |:---                                      |
//! |nonce     |account collaborator  |account sequence                          |
//! |balance   |bank collaborator     |balance in the denom of the chain config  |
//! |code hash |EVM module            |`evm/` 0x04 address                       |
//! |code      |EVM module            |`evm/` 0x01 code hash                     |
//! |storage   |EVM module            |`evm/` 0x02 address key                   |

use std::sync::Arc;

use alloy_primitives::{Address, Bloom, Bytes, B256, U256};

use crate::chain_config::ChainConfig;
use crate::collaborators::{AccountKeeper, BankKeeper, StakingKeeper, EVM_MODULE};
use crate::context::Context;
use crate::crypto::EMPTY_CODE_HASH;
use crate::engine::Evm;
use crate::error::FatalError;
use crate::feemarket;
use crate::statedb::{StateError, StateKeeper};
use crate::store::{read_u64, KvStore, StoreError};
use crate::types::{Account, Coin};

use super::{keys, Params, ParamsError, STORE_KEY};

/// Stateless handle over the EVM namespace of a [Context], together with the collaborators the
/// EVM state is spread over.
#[derive(Clone)]
pub struct Keeper {
    /// account allowed to update the parameters
    authority: Address,
    chain_config: Arc<ChainConfig>,
    evm: Arc<dyn Evm>,
    account_keeper: Arc<dyn AccountKeeper>,
    bank_keeper: Arc<dyn BankKeeper>,
    staking_keeper: Arc<dyn StakingKeeper>,
    fee_market_keeper: feemarket::Keeper,
}

impl Keeper {
    pub fn new(
        authority: Address,
        chain_config: ChainConfig,
        evm: Arc<dyn Evm>,
        account_keeper: Arc<dyn AccountKeeper>,
        bank_keeper: Arc<dyn BankKeeper>,
        staking_keeper: Arc<dyn StakingKeeper>,
        fee_market_keeper: feemarket::Keeper,
    ) -> Self {
        Self {
            authority,
            chain_config: Arc::new(chain_config),
            evm,
            account_keeper,
            bank_keeper,
            staking_keeper,
            fee_market_keeper,
        }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    pub(crate) fn evm(&self) -> &dyn Evm {
        self.evm.as_ref()
    }

    pub(crate) fn bank_keeper(&self) -> &dyn BankKeeper {
        self.bank_keeper.as_ref()
    }

    pub(crate) fn staking_keeper(&self) -> &dyn StakingKeeper {
        self.staking_keeper.as_ref()
    }

    pub fn fee_market_keeper(&self) -> &feemarket::Keeper {
        &self.fee_market_keeper
    }

    /* ↓↓↓ Params ↓↓↓ */

    /// Stored parameters, or the defaults before genesis has set them.
    pub fn get_params(&self, ctx: &Context) -> Result<Params, FatalError> {
        match ctx.kv(STORE_KEY).get(&keys::params()) {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| FatalError::CorruptParams(e.to_string())),
            None => Ok(Params::default()),
        }
    }

    pub fn set_params(&self, ctx: &mut Context, params: &Params) -> Result<(), ParamsError> {
        params.validate()?;
        let bytes = serde_json::to_vec(params).map_err(|e| ParamsError::Invalid(e.to_string()))?;
        ctx.kv_mut(STORE_KEY).set(&keys::params(), bytes)?;
        Ok(())
    }

    /// Governance update of the parameters.
    pub fn update_params(&self, ctx: &mut Context, authority: &Address, params: &Params) -> Result<(), ParamsError> {
        if *authority != self.authority {
            return Err(ParamsError::InvalidAuthority { expected: self.authority, got: *authority });
        }
        self.set_params(ctx, params)
    }

    /* ↓↓↓ Header hash history ↓↓↓ */

    pub fn get_header_hash(&self, ctx: &Context, height: u64) -> B256 {
        ctx.kv(STORE_KEY)
            .get(&keys::header_hash(height))
            .map_or(B256::ZERO, |bytes| read_b256(&bytes))
    }

    pub fn set_header_hash(&self, ctx: &mut Context, height: u64, hash: B256) -> Result<(), StoreError> {
        ctx.kv_mut(STORE_KEY).set(&keys::header_hash(height), hash.to_vec())
    }

    pub fn delete_header_hash(&self, ctx: &mut Context, height: u64) -> Result<(), StoreError> {
        ctx.kv_mut(STORE_KEY).delete(&keys::header_hash(height))
    }

    /* ↓↓↓ Transient block bookkeeping ↓↓↓ */

    pub fn get_block_bloom_transient(&self, ctx: &Context) -> Bloom {
        ctx.transient_kv(STORE_KEY)
            .get(&[keys::PREFIX_TRANSIENT_BLOOM])
            .and_then(|bytes| <[u8; 256]>::try_from(bytes.as_slice()).ok())
            .map_or(Bloom::ZERO, Bloom::from)
    }

    pub fn set_block_bloom_transient(&self, ctx: &mut Context, bloom: Bloom) -> Result<(), StoreError> {
        ctx.transient_kv_mut(STORE_KEY)
            .set(&[keys::PREFIX_TRANSIENT_BLOOM], bloom.as_slice().to_vec())
    }

    /// Index of the next transaction in the block.
    pub fn get_tx_index_transient(&self, ctx: &Context) -> u64 {
        read_u64(ctx.transient_kv(STORE_KEY).get(&[keys::PREFIX_TRANSIENT_TX_INDEX]))
    }

    pub fn set_tx_index_transient(&self, ctx: &mut Context, index: u64) -> Result<(), StoreError> {
        ctx.transient_kv_mut(STORE_KEY)
            .set(&[keys::PREFIX_TRANSIENT_TX_INDEX], index.to_be_bytes().to_vec())
    }

    /// Number of logs emitted so far in the block.
    pub fn get_log_size_transient(&self, ctx: &Context) -> u64 {
        read_u64(ctx.transient_kv(STORE_KEY).get(&[keys::PREFIX_TRANSIENT_LOG_SIZE]))
    }

    pub fn set_log_size_transient(&self, ctx: &mut Context, size: u64) -> Result<(), StoreError> {
        ctx.transient_kv_mut(STORE_KEY)
            .set(&[keys::PREFIX_TRANSIENT_LOG_SIZE], size.to_be_bytes().to_vec())
    }

    /// EVM gas used by the host transaction being processed.
    pub fn get_transient_gas_used(&self, ctx: &Context) -> u64 {
        read_u64(ctx.transient_kv(STORE_KEY).get(&[keys::PREFIX_TRANSIENT_GAS_USED]))
    }

    pub fn set_transient_gas_used(&self, ctx: &mut Context, gas_used: u64) -> Result<(), StoreError> {
        ctx.transient_kv_mut(STORE_KEY)
            .set(&[keys::PREFIX_TRANSIENT_GAS_USED], gas_used.to_be_bytes().to_vec())
    }

    pub fn reset_transient_gas_used(&self, ctx: &mut Context) -> Result<(), StoreError> {
        ctx.transient_kv_mut(STORE_KEY).delete(&[keys::PREFIX_TRANSIENT_GAS_USED])
    }

    pub fn add_transient_gas_used(&self, ctx: &mut Context, gas_used: u64) -> Result<u64, FatalError> {
        let total = self
            .get_transient_gas_used(ctx)
            .checked_add(gas_used)
            .ok_or_else(|| FatalError::Overflow("transient gas used".to_string()))?;
        self.set_transient_gas_used(ctx, total).map_err(StateError::from)?;
        Ok(total)
    }

    /* ↓↓↓ Accounts ↓↓↓ */

    pub fn get_code_hash(&self, ctx: &Context, address: &Address) -> B256 {
        ctx.kv(STORE_KEY)
            .get(&keys::code_hash(address))
            .map_or(EMPTY_CODE_HASH, |bytes| read_b256(&bytes))
    }

    fn set_code_hash(&self, ctx: &mut Context, address: &Address, code_hash: &B256) -> Result<(), StoreError> {
        if *code_hash == EMPTY_CODE_HASH {
            ctx.kv_mut(STORE_KEY).delete(&keys::code_hash(address))
        } else {
            ctx.kv_mut(STORE_KEY).set(&keys::code_hash(address), code_hash.to_vec())
        }
    }

    pub fn get_balance(&self, ctx: &Context, address: &Address) -> U256 {
        self.bank_keeper.get_balance(ctx, address, self.chain_config.denom())
    }

    /// Move the balance to `balance` by minting into or burning from the EVM module account.
    pub fn set_balance(&self, ctx: &mut Context, address: &Address, balance: U256) -> Result<(), StateError> {
        let denom = self.chain_config.denom();
        let current = self.get_balance(ctx, address);

        if balance > current {
            let coins = [Coin::new(denom, balance - current).map_err(|_| StateError::BalanceOverflow { address: *address })?];
            self.bank_keeper
                .mint_coins(ctx, EVM_MODULE, &coins)
                .and_then(|_| self.bank_keeper.send_coins_from_module_to_account(ctx, EVM_MODULE, address, &coins))
                .map_err(StateError::Keeper)?;
        } else if balance < current {
            let coins = [Coin::new(denom, current - balance).map_err(|_| StateError::BalanceOverflow { address: *address })?];
            self.bank_keeper
                .send_coins_from_account_to_module(ctx, address, EVM_MODULE, &coins)
                .and_then(|_| self.bank_keeper.burn_coins(ctx, EVM_MODULE, &coins))
                .map_err(StateError::Keeper)?;
        }
        Ok(())
    }

    /// Ethereum nonce of the account, the sequence of its host chain account.
    pub fn get_nonce(&self, ctx: &Context, address: &Address) -> u64 {
        self.account_keeper
            .get_account(ctx, address)
            .map_or(0, |account| account.sequence)
    }
}

impl StateKeeper for Keeper {
    fn get_account(&self, ctx: &Context, address: &Address) -> Option<Account> {
        let account = self.account_keeper.get_account(ctx, address)?;
        Some(Account {
            nonce: account.sequence,
            balance: self.get_balance(ctx, address),
            code_hash: self.get_code_hash(ctx, address),
        })
    }

    fn get_state(&self, ctx: &Context, address: &Address, key: &B256) -> B256 {
        ctx.kv(STORE_KEY)
            .get(&keys::storage(address, key))
            .map_or(B256::ZERO, |bytes| read_b256(&bytes))
    }

    fn get_code(&self, ctx: &Context, code_hash: &B256) -> Bytes {
        if *code_hash == EMPTY_CODE_HASH || code_hash.is_zero() {
            return Bytes::new();
        }
        ctx.kv(STORE_KEY)
            .get(&keys::code(code_hash))
            .map(Bytes::from)
            .unwrap_or_default()
    }

    fn get_block_hash(&self, ctx: &Context, height: u64) -> B256 {
        let current = ctx.block_height();
        match height.cmp(&current) {
            std::cmp::Ordering::Equal => ctx.header.header_hash,
            std::cmp::Ordering::Less => self.get_header_hash(ctx, height),
            std::cmp::Ordering::Greater => B256::ZERO,
        }
    }

    fn for_each_storage(&self, ctx: &Context, address: &Address, f: &mut dyn FnMut(B256, B256) -> bool) {
        let prefix = keys::address_storage_prefix(address);
        for (key, value) in ctx.kv(STORE_KEY).iter_prefix(&prefix) {
            let Some(slot) = key.get(prefix.len()..).filter(|slot| slot.len() == 32) else {
                continue;
            };
            if !f(B256::from_slice(slot), read_b256(&value)) {
                break;
            }
        }
    }

    fn set_account(&self, ctx: &mut Context, address: &Address, account: &Account) -> Result<(), StateError> {
        let mut base_account = match self.account_keeper.get_account(ctx, address) {
            Some(base_account) => base_account,
            None => self
                .account_keeper
                .new_account(ctx, address)
                .map_err(StateError::Keeper)?,
        };
        base_account.sequence = account.nonce;
        self.account_keeper
            .set_account(ctx, base_account)
            .map_err(StateError::Keeper)?;

        self.set_code_hash(ctx, address, &account.code_hash)?;
        self.set_balance(ctx, address, account.balance)?;

        tracing::trace!(
            target: "statedb",
            %address,
            nonce = account.nonce,
            balance = %account.balance,
            code_hash = %account.code_hash,
            "account updated"
        );
        Ok(())
    }

    fn set_state(&self, ctx: &mut Context, address: &Address, key: &B256, value: &B256) -> Result<(), StateError> {
        let store_key = keys::storage(address, key);
        if value.is_zero() {
            ctx.kv_mut(STORE_KEY).delete(&store_key)?;
        } else {
            ctx.kv_mut(STORE_KEY).set(&store_key, value.to_vec())?;
        }
        Ok(())
    }

    fn set_code(&self, ctx: &mut Context, code_hash: &B256, code: &[u8]) -> Result<(), StateError> {
        let key = keys::code(code_hash);
        if code.is_empty() {
            ctx.kv_mut(STORE_KEY).delete(&key)?;
        } else {
            ctx.kv_mut(STORE_KEY).set(&key, code.to_vec())?;
        }
        Ok(())
    }

    fn delete_account(&self, ctx: &mut Context, address: &Address) -> Result<(), StateError> {
        if self.account_keeper.get_account(ctx, address).is_none() {
            return Ok(());
        }

        self.set_balance(ctx, address, U256::ZERO)?;

        let mut slots = Vec::new();
        self.for_each_storage(ctx, address, &mut |key, _| {
            slots.push(key);
            true
        });
        for key in &slots {
            self.set_state(ctx, address, key, &B256::ZERO)?;
        }

        self.set_code_hash(ctx, address, &EMPTY_CODE_HASH)?;
        self.account_keeper
            .remove_account(ctx, address)
            .map_err(StateError::Keeper)?;

        tracing::debug!(target: "statedb", %address, slots = slots.len(), "account deleted");
        Ok(())
    }
}

fn read_b256(bytes: &[u8]) -> B256 {
    if bytes.len() == 32 {
        B256::from_slice(bytes)
    } else {
        B256::left_padding_from(&bytes[..bytes.len().min(32)])
    }
}
