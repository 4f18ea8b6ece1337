/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::sync::Arc;

use alloy_primitives::{Address, B256, I256, U256};

use pchain_evm::collaborators::{AccountKeeper, BankKeeper, Validator, EVM_MODULE};
use pchain_evm::types::{BlockHeader, Coin, EthTx, TxType};
use pchain_evm::{evm, feemarket, ChainConfig, Context};

use super::{MockEvm, SimulateAccountKeeper, SimulateBankKeeper, SimulateFeeGrantKeeper, SimulateStakingKeeper};

pub const DENOM: &str = "aatom";
pub const CHAIN_ID: &str = "pchain_9000-1";
pub const PROPOSER: [u8; 20] = [9u8; 20];
pub const COINBASE: Address = Address::repeat_byte(0xcb);
pub const AUTHORITY: Address = Address::repeat_byte(0xaa);
pub const SENDER: Address = Address::repeat_byte(0x11);
pub const RECIPIENT: Address = Address::repeat_byte(0x22);

/// One gwei, the default initial base fee.
pub const GWEI: u64 = 1_000_000_000;

/// The keepers of one chain, wired together like an application would.
pub struct TestApp {
    pub evm_keeper: evm::Keeper,
    pub fee_market_keeper: feemarket::Keeper,
    pub account_keeper: Arc<SimulateAccountKeeper>,
    pub bank_keeper: Arc<SimulateBankKeeper>,
    pub fee_grant_keeper: Arc<SimulateFeeGrantKeeper>,
}

impl TestApp {
    pub fn new(mock_evm: MockEvm) -> Self {
        Self::with_chain_config(mock_evm, ChainConfig::default())
    }

    pub fn with_chain_config(mock_evm: MockEvm, chain_config: ChainConfig) -> Self {
        let account_keeper = Arc::new(SimulateAccountKeeper);
        let bank_keeper = Arc::new(SimulateBankKeeper);
        let fee_grant_keeper = Arc::new(SimulateFeeGrantKeeper { denom: DENOM.to_string() });
        let staking_keeper = Arc::new(SimulateStakingKeeper {
            validators: vec![Validator {
                operator_address: COINBASE,
                consensus_address: PROPOSER.to_vec(),
            }],
        });
        let fee_market_keeper = feemarket::Keeper::new(AUTHORITY);
        let evm_keeper = evm::Keeper::new(
            AUTHORITY,
            chain_config,
            Arc::new(mock_evm),
            account_keeper.clone(),
            bank_keeper.clone(),
            staking_keeper,
            fee_market_keeper.clone(),
        );
        Self {
            evm_keeper,
            fee_market_keeper,
            account_keeper,
            bank_keeper,
            fee_grant_keeper,
        }
    }

    /// Create the account of `address` if needed and mint `amount` to it.
    pub fn fund(&self, ctx: &mut Context, address: &Address, amount: u64) {
        self.ensure_account(ctx, address);
        let coins = [Coin::new(DENOM, U256::from(amount)).unwrap()];
        self.bank_keeper.mint_coins(ctx, EVM_MODULE, &coins).unwrap();
        self.bank_keeper
            .send_coins_from_module_to_account(ctx, EVM_MODULE, address, &coins)
            .unwrap();
    }

    /// Mint `amount` straight into a module account.
    pub fn fund_module(&self, ctx: &mut Context, module: &str, amount: u64) {
        let coins = [Coin::new(DENOM, U256::from(amount)).unwrap()];
        self.bank_keeper.mint_coins(ctx, module, &coins).unwrap();
    }

    pub fn ensure_account(&self, ctx: &mut Context, address: &Address) {
        if self.account_keeper.get_account(ctx, address).is_none() {
            let account = self.account_keeper.new_account(ctx, address).unwrap();
            self.account_keeper.set_account(ctx, account).unwrap();
        }
    }

    pub fn balance(&self, ctx: &Context, address: &Address) -> U256 {
        self.bank_keeper.get_balance(ctx, address, DENOM)
    }

    pub fn module_balance(&self, ctx: &Context, module: &str) -> U256 {
        self.balance(ctx, &super::module_address(module))
    }
}

pub fn header(height: u64) -> BlockHeader {
    BlockHeader {
        chain_id: CHAIN_ID.to_string(),
        height,
        time: 1_700_000_000 + height * 6,
        proposer_address: PROPOSER.to_vec(),
        header_hash: B256::repeat_byte(height as u8),
    }
}

pub fn int(value: i64) -> I256 {
    I256::try_from(value).unwrap()
}

/// Legacy call from [SENDER] to [RECIPIENT].
pub fn eth_call_tx(nonce: u64, gas_limit: u64, gas_price: u64) -> EthTx {
    EthTx {
        tx_type: TxType::Legacy,
        hash: B256::repeat_byte(0x77),
        from: SENDER,
        chain_id: ChainConfig::default().chain_id,
        nonce,
        gas_limit,
        gas_price: int(gas_price as i64),
        to: Some(RECIPIENT),
        ..Default::default()
    }
}
