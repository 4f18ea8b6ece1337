/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines common data structures to be used inside this library, or from outside application.

use alloy_primitives::{Address, Bloom, Bytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

use crate::crypto::EMPTY_CODE_HASH;
use crate::error::FatalError;

/// Ethereum view of an account. Balance is held by the bank collaborator and nonce by the account
/// collaborator; the code hash lives in the EVM store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    pub fn is_contract(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }

    /// Empty in the sense of EIP-161: zero nonce, zero balance, no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && !self.is_contract()
    }
}

/// Log emitted by contract execution, enriched with its position in the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub tx_index: u64,
    pub block_hash: B256,
    /// index of the log in the block
    pub index: u64,
    pub removed: bool,
}

/// Bloom filter over the addresses and topics of the given logs.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue_raw_log(log.address, &log.topics);
    }
    bloom
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTuple {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// EIP-2930 access list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessList(pub Vec<AccessTuple>);

impl AccessList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn storage_keys(&self) -> usize {
        self.0.iter().map(|t| t.storage_keys.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessTuple> {
        self.0.iter()
    }
}

/// Message is the fully resolved input to a state transition: a transaction with its sender
/// recovered and its effective gas price computed against the block base fee.
///
/// `value` and `gas_price` are signed so that malformed inputs received over RPC can be
/// represented and rejected instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    /// None for contract creation
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: I256,
    pub gas_limit: u64,
    pub gas_price: I256,
    pub gas_fee_cap: I256,
    pub gas_tip_cap: I256,
    pub data: Bytes,
    pub access_list: AccessList,
}

impl Message {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    #[default]
    Legacy,
    AccessList,
    DynamicFee,
}

/// Ethereum transaction as admitted into a block. Signature recovery happens before this
/// crate sees the transaction; `from` carries the recovered sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthTx {
    pub tx_type: TxType,
    pub hash: B256,
    pub from: Address,
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Legacy and access list transactions
    pub gas_price: I256,
    /// Dynamic fee transactions
    pub gas_fee_cap: I256,
    pub gas_tip_cap: I256,
    pub to: Option<Address>,
    pub value: I256,
    pub data: Bytes,
    pub access_list: AccessList,
}

impl Default for EthTx {
    fn default() -> Self {
        Self {
            tx_type: TxType::Legacy,
            hash: B256::ZERO,
            from: Address::ZERO,
            chain_id: 0,
            nonce: 0,
            gas_limit: 0,
            gas_price: I256::ZERO,
            gas_fee_cap: I256::ZERO,
            gas_tip_cap: I256::ZERO,
            to: None,
            value: I256::ZERO,
            data: Bytes::new(),
            access_list: AccessList::default(),
        }
    }
}

impl EthTx {
    /// Fee cap of the transaction. Equal to the gas price for pre-London transaction types.
    pub fn fee_cap(&self) -> I256 {
        match self.tx_type {
            TxType::DynamicFee => self.gas_fee_cap,
            _ => self.gas_price,
        }
    }

    pub fn tip_cap(&self) -> I256 {
        match self.tx_type {
            TxType::DynamicFee => self.gas_tip_cap,
            _ => self.gas_price,
        }
    }

    /// Resolve the transaction into a [Message]. With a base fee present the gas price becomes
    /// the effective gas price `min(tip_cap + base_fee, fee_cap)`.
    pub fn to_message(&self, base_fee: Option<U256>) -> Result<Message, FatalError> {
        let fee_cap = self.fee_cap();
        let tip_cap = self.tip_cap();
        let gas_price = match base_fee {
            Some(base_fee) => {
                let base_fee = I256::try_from(base_fee)
                    .map_err(|_| FatalError::Overflow(format!("base fee {base_fee} exceeds the gas price range")))?;
                // the sum only overflows above every fee cap
                tip_cap
                    .checked_add(base_fee)
                    .map_or(fee_cap, |price| std::cmp::min(price, fee_cap))
            }
            None => self.gas_price,
        };
        Ok(Message {
            from: self.from,
            to: self.to,
            nonce: self.nonce,
            value: self.value,
            gas_limit: self.gas_limit,
            gas_price,
            gas_fee_cap: fee_cap,
            gas_tip_cap: tip_cap,
            data: self.data.clone(),
            access_list: self.access_list.clone(),
        })
    }
}

/// EIP-1559 effective gas price: `min(base_fee + tip_cap, fee_cap)`.
pub fn effective_gas_price(base_fee: U256, fee_cap: U256, tip_cap: U256) -> U256 {
    // the sum only overflows above every fee cap
    base_fee
        .checked_add(tip_cap)
        .map_or(fee_cap, |price| std::cmp::min(price, fee_cap))
}

/// Outcome of applying a message. A non-empty `vm_error` means the execution reverted: state
/// changes were discarded but gas was still charged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub hash: B256,
    pub logs: Vec<Log>,
    pub ret: Bytes,
    pub vm_error: String,
    pub gas_used: u64,
    pub bloom: Bloom,
}

impl ExecutionResult {
    pub fn failed(&self) -> bool {
        !self.vm_error.is_empty()
    }
}

/// Block header fields consumed by the execution core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
    /// unix seconds
    pub time: u64,
    /// consensus address of the proposer
    pub proposer_address: Vec<u8>,
    pub header_hash: B256,
}

/// Consensus layer parameters. A `max_gas` of -1 means the block gas is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockParams {
    pub max_bytes: i64,
    pub max_gas: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsensusParams {
    pub block: Option<BlockParams>,
}

impl ConsensusParams {
    /// Block gas limit, `u64::MAX` when unlimited or unset.
    pub fn block_gas_limit(&self) -> u64 {
        match self.block {
            Some(block) if block.max_gas > -1 => block.max_gas as u64,
            _ => u64::MAX,
        }
    }
}

/// Token amount. The amount is signed so negative fees can be detected during admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: I256,
}

impl Coin {
    /// Fails when `amount` does not fit the signed amount.
    pub fn new(denom: impl Into<String>, amount: U256) -> Result<Self, FatalError> {
        let denom = denom.into();
        let amount = I256::try_from(amount).map_err(|_| FatalError::Overflow(format!("coin amount {amount}{denom}")))?;
        Ok(Self { denom, amount })
    }
}

/// Amount of `denom` in `coins`, zero if absent or negative. None if the sum overflows.
pub fn amount_of(coins: &[Coin], denom: &str) -> Option<U256> {
    coins
        .iter()
        .filter(|c| c.denom == denom && !c.amount.is_negative())
        .try_fold(U256::ZERO, |acc, c| acc.checked_add(c.amount.into_raw()))
}

/// Decimal price per unit of gas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: crate::decimal::Dec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_is_capped() {
        let tx = EthTx {
            tx_type: TxType::DynamicFee,
            gas_fee_cap: I256::try_from(100).unwrap(),
            gas_tip_cap: I256::try_from(10).unwrap(),
            ..Default::default()
        };
        assert_eq!(tx.to_message(Some(U256::from(50))).unwrap().gas_price, I256::try_from(60).unwrap());
        assert_eq!(tx.to_message(Some(U256::from(95))).unwrap().gas_price, I256::try_from(100).unwrap());

        let legacy = EthTx { gas_price: I256::try_from(30).unwrap(), ..Default::default() };
        assert_eq!(legacy.to_message(Some(U256::from(10))).unwrap().gas_price, I256::try_from(30).unwrap());
        assert_eq!(legacy.to_message(None).unwrap().gas_price, I256::try_from(30).unwrap());

        // a tip overflowing with the base fee still pays at most the fee cap
        let greedy = EthTx { gas_tip_cap: I256::MAX, ..tx };
        assert_eq!(greedy.to_message(Some(U256::from(1))).unwrap().gas_price, I256::try_from(100).unwrap());
        assert!(greedy.to_message(Some(U256::MAX)).is_err());

        assert_eq!(effective_gas_price(U256::from(1), U256::from(100), U256::MAX), U256::from(100));
    }

    #[test]
    fn coin_amount_must_fit() {
        assert!(Coin::new("aatom", I256::MAX.into_raw()).is_ok());
        assert!(matches!(Coin::new("aatom", U256::MAX), Err(FatalError::Overflow(_))));
    }

    #[test]
    fn unlimited_block_gas() {
        assert_eq!(ConsensusParams::default().block_gas_limit(), u64::MAX);
        let params = ConsensusParams { block: Some(BlockParams { max_bytes: 0, max_gas: -1 }) };
        assert_eq!(params.block_gas_limit(), u64::MAX);
        let params = ConsensusParams { block: Some(BlockParams { max_bytes: 0, max_gas: 10_000_000 }) };
        assert_eq!(params.block_gas_limit(), 10_000_000);
    }

    #[test]
    fn amount_ignores_negative_and_other_denoms() {
        let coins = vec![
            Coin::new("aatom", U256::from(5)).unwrap(),
            Coin { denom: "aatom".into(), amount: I256::try_from(-3).unwrap() },
            Coin::new("uosmo", U256::from(7)).unwrap(),
        ];
        assert_eq!(amount_of(&coins, "aatom"), Some(U256::from(5)));

        let huge = vec![Coin { denom: "aatom".into(), amount: I256::MAX }; 3];
        assert_eq!(amount_of(&huge, "aatom"), None);
    }
}
