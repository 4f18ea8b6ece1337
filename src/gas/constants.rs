/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Constants which are primitives used in the cost calculation of [formulas](crate::gas::formulas).
//!
//! The table below lists the Ethereum protocol names of the constants defined here.
//!
//! |Protocol Name              | Related Constant                      |
//! |:---                       |:---                                   |
//! |G_transaction              | [TX_GAS]                              |
//! |G_txcreate + G_transaction | [TX_GAS_CONTRACT_CREATION]            |
//! |G_txdatazero               | [TX_DATA_ZERO_GAS]                    |
//! |G_txdatanonzero            | [TX_DATA_NON_ZERO_GAS_FRONTIER], [TX_DATA_NON_ZERO_GAS_EIP2028] |
//! |G_initcodeword             | [INIT_CODE_WORD_GAS]                  |
//! |G_accesslistaddress        | [TX_ACCESS_LIST_ADDRESS_GAS]          |
//! |G_accessliststorage        | [TX_ACCESS_LIST_STORAGE_KEY_GAS]      |
//!

/// Base cost of every transaction.
pub const TX_GAS: u64 = 21000;

/// Base cost of a contract creation once Homestead is active.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53000;

pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Non-zero data byte before Istanbul.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;

/// Non-zero data byte from Istanbul on (EIP-2028).
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// Per 32-byte word of init code, from Shanghai on (EIP-3860).
pub const INIT_CODE_WORD_GAS: u64 = 2;

pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2400;

pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1900;

/// Maximum refund quotient before London.
pub const REFUND_QUOTIENT: u64 = 2;

/// Maximum refund quotient from London on (EIP-3529).
pub const REFUND_QUOTIENT_EIP3529: u64 = 5;

/* ↓↓↓ Signature verification costs charged during admission ↓↓↓ */

pub const SIG_VERIFY_COST_ED25519: u64 = 590;

pub const SIG_VERIFY_COST_SECP256K1: u64 = 1000;

pub const SIG_VERIFY_COST_ETH_SECP256K1: u64 = 21000;
