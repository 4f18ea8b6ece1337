/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines the error tiers of a state transition.
//!
//! - [TransitionError]: the message is rejected before or while it is applied. Nothing is committed.
//! - VM errors: the execution reverted. They are not Rust errors; they are carried as a string in
//!   [ExecutionResult::vm_error](crate::types::ExecutionResult) and gas is still charged.
//! - [FatalError]: a broken invariant or misconfiguration. Block processing must stop, since
//!   continuing would make replicas diverge.

use alloy_primitives::I256;

use crate::feemarket::FeeMarketError;
use crate::gas::GasError;
use crate::statedb::StateError;
use crate::store::StoreError;

/// Descriptive error definitions of a rejected state transition.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// Gas limit does not cover the intrinsic gas of the message.
    #[error("intrinsic gas too low: gas limit {gas_limit} < intrinsic gas {intrinsic}")]
    IntrinsicGas { gas_limit: u64, intrinsic: u64 },

    /// A gas computation does not fit in u64, or more gas was left over than provided.
    #[error("gas computation overflow: {0}")]
    GasOverflow(String),

    /// Transferred value is negative.
    #[error("invalid amount: negative value {0}")]
    NegativeValue(I256),

    /// Refund credited at a negative effective gas price.
    #[error("invalid refund: gas price {0} is negative")]
    InvalidRefund(I256),

    /// Proposer of the block cannot be resolved to a validator.
    #[error("failed to retrieve validator from block proposer address {0}")]
    ValidatorNotFound(String),

    /// An external collaborator (bank, account or staking keeper) refused the operation.
    #[error("collaborator failure: {0}")]
    Collaborator(#[source] anyhow::Error),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl TransitionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransitionError::Fatal(_))
    }
}

impl From<StateError> for TransitionError {
    fn from(error: StateError) -> Self {
        TransitionError::Fatal(FatalError::State(error))
    }
}

impl From<StoreError> for TransitionError {
    fn from(error: StoreError) -> Self {
        TransitionError::Fatal(FatalError::State(StateError::Store(error)))
    }
}

impl From<FeeMarketError> for TransitionError {
    fn from(error: FeeMarketError) -> Self {
        match error {
            FeeMarketError::GasOverflow(what) => TransitionError::GasOverflow(what),
            FeeMarketError::Store(error) => error.into(),
            FeeMarketError::Fatal(error) => TransitionError::Fatal(error),
            other => TransitionError::Collaborator(anyhow::Error::new(other)),
        }
    }
}

/// Errors which indicate a broken invariant or misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// Refund quotient of zero would silently disable refunds.
    #[error("refund quotient must not be zero")]
    ZeroRefundQuotient,

    /// Elasticity multiplier of zero reached the base fee control law.
    #[error("elasticity multiplier must not be zero")]
    ZeroElasticityMultiplier,

    #[error("base fee change denominator must not be zero")]
    ZeroBaseFeeChangeDenominator,

    /// Arithmetic on consensus values does not fit its type.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// Misuse of the gas meter of the host chain.
    #[error(transparent)]
    GasMeter(#[from] GasError),

    /// Stored parameters cannot be decoded.
    #[error("corrupt parameters: {0}")]
    CorruptParams(String),

    /// Journal or persistent store failed.
    #[error(transparent)]
    State(#[from] StateError),
}
