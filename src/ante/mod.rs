/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Admission pipeline: the ordered chain of checks a transaction passes before it may enter a
//! block.
//!
//! |Order |Decorator                       |Checks                                                    |
//! |:---  |:---                            |:---                                                      |
//! |1     |[RejectExtensionOptions]        |no extension option, or exactly one accepted one          |
//! |2     |[SigVerification]               |signature gas, public keys, sequences, signatures         |
//! |3     |[MinGasPrice], [TxFeeCheck]     |fee against the minimum gas price and the base fee        |
//! |4     |[GasWanted]                     |gas limit against the per-transaction and block ceilings  |
//! |5     |[ValidateBasic]                 |negative or malformed values                              |
//! |6     |[DeductFee]                     |fee moved to the fee collector                            |
//! |7     |[IncrementSequence]             |sequence of every signer incremented                      |
//!
//! The chain short-circuits on the first failure. It runs on a [branch](Context::branch) of the
//! context, so a rejected transaction leaves no state change behind.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::collaborators::{AccountKeeper, BankKeeper, FeeGrantKeeper};
use crate::context::Context;
use crate::crypto::CryptoError;
use crate::error::{FatalError, TransitionError};
use crate::evm;
use crate::feemarket::{self, FeeMarketError};
use crate::gas::{GasError, GasMeter};
use crate::store::StoreError;

pub mod extension;
pub use extension::{has_dynamic_fee_extension_option, ExtensionOptionChecker, RejectExtensionOptions};

pub mod fee;
pub use fee::{new_dynamic_fee_checker, DeductFee, MinGasPrice, TxFeeCheck, TxFeeChecker};

pub mod gas_wanted;
pub use gas_wanted::GasWanted;

pub mod sequence;
pub use sequence::IncrementSequence;

pub mod sigverify;
pub use sigverify::{
    default_sig_verification_gas_consumer, LegacyJsonSignMode, SigVerification, SignModeHandler, SignatureGasConsumer,
    SignerData,
};

pub mod tx;
pub use tx::{ExtensionOption, Fee, Msg, SignerInfo, Tx};

pub mod validate_basic;
pub use validate_basic::ValidateBasic;

#[derive(Debug, thiserror::Error)]
pub enum AnteError {
    #[error("{0} is required for the ante handler")]
    MissingCollaborator(&'static str),

    #[error("unknown extension options: {0}")]
    UnknownExtensionOptions(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid public key: {0}")]
    InvalidPubKey(String),

    #[error("account {0} does not exist")]
    UnknownAddress(Address),

    #[error("account sequence mismatch of {address}: expected {expected}, got {got}")]
    WrongSequence { address: Address, expected: u64, got: u64 },

    #[error("invalid nonce of {address}: expected {expected}, got {got}")]
    InvalidNonce { address: Address, expected: u64, got: u64 },

    #[error("insufficient fee: {0}")]
    InsufficientFee(String),

    #[error("invalid gas limit: {0}")]
    InvalidGasLimit(String),

    #[error("out of gas: {0}")]
    OutOfGas(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid transaction: {0}")]
    InvalidTx(String),

    #[error("insufficient funds to pay fees: {0}")]
    InsufficientFunds(#[source] anyhow::Error),

    #[error("collaborator failure: {0}")]
    Collaborator(#[source] anyhow::Error),

    #[error(transparent)]
    Gas(#[from] GasError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    FeeMarket(#[from] FeeMarketError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// One stage of the admission pipeline.
pub trait AnteDecorator: Send + Sync {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError>;
}

/// Collaborators and settings of the admission pipeline. Every collaborator except the fee
/// grant keeper is required.
#[derive(Default)]
pub struct HandlerOptions {
    pub account_keeper: Option<Arc<dyn AccountKeeper>>,
    pub bank_keeper: Option<Arc<dyn BankKeeper>>,
    /// without it, transactions naming a fee granter are rejected
    pub fee_grant_keeper: Option<Arc<dyn FeeGrantKeeper>>,
    pub evm_keeper: Option<evm::Keeper>,
    pub fee_market_keeper: Option<feemarket::Keeper>,
    pub sign_mode_handler: Option<Arc<dyn SignModeHandler>>,
    pub sig_gas_consumer: Option<SignatureGasConsumer>,
    pub extension_option_checker: Option<ExtensionOptionChecker>,
    pub tx_fee_checker: Option<TxFeeChecker>,
    /// zero for no ceiling
    pub max_tx_gas_wanted: u64,
}

impl HandlerOptions {
    pub fn validate(&self) -> Result<(), AnteError> {
        if self.account_keeper.is_none() {
            return Err(AnteError::MissingCollaborator("account keeper"));
        }
        if self.bank_keeper.is_none() {
            return Err(AnteError::MissingCollaborator("bank keeper"));
        }
        if self.evm_keeper.is_none() {
            return Err(AnteError::MissingCollaborator("evm keeper"));
        }
        if self.fee_market_keeper.is_none() {
            return Err(AnteError::MissingCollaborator("fee market keeper"));
        }
        if self.sign_mode_handler.is_none() {
            return Err(AnteError::MissingCollaborator("sign mode handler"));
        }
        if self.sig_gas_consumer.is_none() {
            return Err(AnteError::MissingCollaborator("signature gas consumer"));
        }
        if self.extension_option_checker.is_none() {
            return Err(AnteError::MissingCollaborator("extension option checker"));
        }
        if self.tx_fee_checker.is_none() {
            return Err(AnteError::MissingCollaborator("tx fee checker"));
        }
        Ok(())
    }
}

/// The assembled admission pipeline.
pub struct AnteHandler {
    evm_keeper: evm::Keeper,
    decorators: Vec<Box<dyn AnteDecorator>>,
}

/// Assemble the admission pipeline, failing if a required collaborator is missing.
pub fn new_ante_handler(options: HandlerOptions) -> Result<AnteHandler, AnteError> {
    options.validate()?;
    let HandlerOptions {
        account_keeper: Some(account_keeper),
        bank_keeper: Some(bank_keeper),
        fee_grant_keeper,
        evm_keeper: Some(evm_keeper),
        fee_market_keeper: Some(fee_market_keeper),
        sign_mode_handler: Some(sign_mode_handler),
        sig_gas_consumer: Some(sig_gas_consumer),
        extension_option_checker: Some(extension_option_checker),
        tx_fee_checker: Some(tx_fee_checker),
        max_tx_gas_wanted,
    } = options
    else {
        return Err(AnteError::MissingCollaborator("handler options"));
    };

    let denom = evm_keeper.chain_config().denom().to_string();
    let decorators: Vec<Box<dyn AnteDecorator>> = vec![
        Box::new(RejectExtensionOptions::new(extension_option_checker)),
        Box::new(SigVerification::new(account_keeper.clone(), sign_mode_handler, sig_gas_consumer)),
        Box::new(MinGasPrice::new(fee_market_keeper.clone(), denom)),
        Box::new(TxFeeCheck::new(tx_fee_checker.clone())),
        Box::new(GasWanted::new(evm_keeper.clone(), fee_market_keeper, max_tx_gas_wanted)),
        Box::new(ValidateBasic::new(evm_keeper.clone())),
        Box::new(DeductFee::new(account_keeper.clone(), bank_keeper, fee_grant_keeper, tx_fee_checker)),
        Box::new(IncrementSequence::new(account_keeper)),
    ];

    Ok(AnteHandler { evm_keeper, decorators })
}

impl AnteHandler {
    /// Run every decorator in order on a branch of `ctx`. The gas meter of the context is set to
    /// the gas limit of the transaction, or left unlimited when simulating or at genesis. A
    /// rejected transaction leaves the context as it was, gas meter included.
    pub fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError> {
        let gas_meter = if simulate || ctx.block_height() == 0 {
            GasMeter::infinite()
        } else {
            GasMeter::new(tx.gas())
        };
        let previous_gas_meter = std::mem::replace(&mut ctx.gas_meter, gas_meter);

        let result = ctx.branch(|ctx| -> Result<(), AnteError> {
            self.evm_keeper.reset_transient_gas_used(ctx)?;
            for decorator in &self.decorators {
                decorator.ante_handle(ctx, tx, simulate)?;
            }
            Ok(())
        });

        if let Err(error) = &result {
            ctx.gas_meter = previous_gas_meter;
            tracing::debug!(target: "ante", %error, simulate, "transaction rejected");
        }
        result
    }
}
