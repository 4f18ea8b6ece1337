/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! ParallelChain EVM is the **execution core** which lets a Cosmos-style chain run Ethereum
//! transactions. Given the state of the chain, a block context and a transaction, it produces the
//! next state and an execution result.
//!
//! ```text
//! f(WS, BD, TX) -> (WS', R)
//!
//! WS = World state, the key-value store of the host chain
//! BD = Block data: header, consensus parameters, gas meters
//! TX = Ethereum transaction, admitted through the ante pipeline
//! R  = Execution result: logs, return data, VM error, gas used
//! ```
//!
//! The crate is made of:
//! - [statedb]: the journaled state overlay the bytecode interpreter executes against.
//! - [evm]: the keeper of the EVM module, with the [state transition](evm::Keeper::apply_transaction),
//!   block hooks and queries.
//! - [feemarket]: the keeper of the EIP-1559 base fee.
//! - [ante]: the admission pipeline which checks signatures, fees and gas before execution.
//!
//! The bytecode interpreter itself is external and plugged in through [engine::Evm]. Accounts,
//! balances and validators belong to host chain modules described in [collaborators].

pub mod ante;

pub mod chain_config;
pub use chain_config::ChainConfig;

pub mod collaborators;

pub mod context;
pub use context::Context;

pub mod crypto;

pub mod decimal;

pub mod engine;

pub mod error;
pub use error::{FatalError, TransitionError};

pub mod evm;

pub mod feemarket;

pub mod gas;

pub mod statedb;

pub mod store;

pub mod types;
