/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signature verification stage.
//!
//! Every signer must have an account whose public key, taken from the account or else from the
//! signer info, derives the signer address. Verification is charged on the gas meter through the
//! configurable [SignatureGasConsumer] before the signature is checked, and the signed sequence
//! must be the current sequence of the account.

use std::sync::Arc;

use alloy_primitives::Address;
use serde_json::json;

use crate::collaborators::AccountKeeper;
use crate::context::Context;
use crate::crypto::PubKey;
use crate::gas::{GasMeter, SIG_VERIFY_COST_ED25519, SIG_VERIFY_COST_ETH_SECP256K1, SIG_VERIFY_COST_SECP256K1};

use super::{AnteDecorator, AnteError, Tx};

/// Charges the verification of one signature.
pub type SignatureGasConsumer = Arc<dyn Fn(&mut GasMeter, &[u8], &PubKey) -> Result<(), AnteError> + Send + Sync>;

/// Default gas schedule of signature verification.
///
/// |Key           |Gas    |
/// |:---          |:---   |
/// |ed25519       |590    |
/// |secp256k1     |1000   |
/// |eth_secp256k1 |21000  |
pub fn default_sig_verification_gas_consumer(
    meter: &mut GasMeter,
    _signature: &[u8],
    pub_key: &PubKey,
) -> Result<(), AnteError> {
    let (cost, descriptor) = match pub_key {
        PubKey::Ed25519(_) => (SIG_VERIFY_COST_ED25519, "ante verify: ed25519"),
        PubKey::Secp256k1(_) => (SIG_VERIFY_COST_SECP256K1, "ante verify: secp256k1"),
        PubKey::EthSecp256k1(_) => (SIG_VERIFY_COST_ETH_SECP256K1, "ante verify: eth_secp256k1"),
    };
    meter.consume_gas(cost, descriptor)?;
    Ok(())
}

/// What a signer commits to besides the transaction itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub address: Address,
}

/// Produces the bytes a signer signs.
pub trait SignModeHandler: Send + Sync {
    fn get_sign_bytes(&self, data: &SignerData, tx: &Tx) -> anyhow::Result<Vec<u8>>;
}

/// Legacy JSON sign mode: canonical JSON with sorted keys and integers as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyJsonSignMode;

impl SignModeHandler for LegacyJsonSignMode {
    fn get_sign_bytes(&self, data: &SignerData, tx: &Tx) -> anyhow::Result<Vec<u8>> {
        let doc = json!({
            "account_number": data.account_number.to_string(),
            "chain_id": data.chain_id,
            "fee": {
                "amount": serde_json::to_value(&tx.fee.amount)?,
                "gas": tx.fee.gas_limit.to_string(),
                "granter": tx.fee.granter,
                "payer": tx.fee.payer,
            },
            "memo": tx.memo,
            "msgs": serde_json::to_value(&tx.msgs)?,
            "sequence": data.sequence.to_string(),
            "timeout_height": tx.timeout_height.to_string(),
        });
        // objects of serde_json::Value keep their keys sorted
        Ok(serde_json::to_vec(&doc)?)
    }
}

pub struct SigVerification {
    account_keeper: Arc<dyn AccountKeeper>,
    sign_mode_handler: Arc<dyn SignModeHandler>,
    sig_gas_consumer: SignatureGasConsumer,
}

impl SigVerification {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        sign_mode_handler: Arc<dyn SignModeHandler>,
        sig_gas_consumer: SignatureGasConsumer,
    ) -> Self {
        Self {
            account_keeper,
            sign_mode_handler,
            sig_gas_consumer,
        }
    }
}

impl AnteDecorator for SigVerification {
    fn ante_handle(&self, ctx: &mut Context, tx: &Tx, simulate: bool) -> Result<(), AnteError> {
        let signers = tx.signers();
        if signers.is_empty() {
            return Err(AnteError::InvalidTx("no signers".to_string()));
        }
        if tx.signatures.len() != signers.len() || tx.signer_infos.len() != signers.len() {
            return Err(AnteError::Unauthorized(format!(
                "wrong number of signatures; expected {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }

        for ((signer, signature), signer_info) in signers.iter().zip(&tx.signatures).zip(&tx.signer_infos) {
            let account = self
                .account_keeper
                .get_account(ctx, signer)
                .ok_or(AnteError::UnknownAddress(*signer))?;

            let pub_key = account
                .pub_key
                .as_ref()
                .or(signer_info.pub_key.as_ref())
                .ok_or_else(|| AnteError::InvalidPubKey(format!("public key of {signer} is not set")))?;
            let derived = pub_key.address()?;
            if derived != *signer {
                return Err(AnteError::InvalidPubKey(format!(
                    "public key derives {derived}, expected signer {signer}"
                )));
            }

            (self.sig_gas_consumer)(&mut ctx.gas_meter, signature, pub_key)?;

            if signer_info.sequence != account.sequence {
                return Err(AnteError::WrongSequence {
                    address: *signer,
                    expected: account.sequence,
                    got: signer_info.sequence,
                });
            }

            if simulate {
                continue;
            }

            let data = SignerData {
                chain_id: ctx.header.chain_id.clone(),
                account_number: account.account_number,
                sequence: account.sequence,
                address: *signer,
            };
            let sign_bytes = self
                .sign_mode_handler
                .get_sign_bytes(&data, tx)
                .map_err(AnteError::Collaborator)?;
            if pub_key.verify(&sign_bytes, signature).is_err() {
                return Err(AnteError::Unauthorized(format!(
                    "signature verification failed; please verify account number ({}), sequence ({}) and chain-id ({})",
                    account.account_number, account.sequence, data.chain_id
                )));
            }
        }

        // the nonce of an Ethereum message is the sequence of its sender
        for eth_tx in tx.ethereum_txs() {
            let sequence = self
                .account_keeper
                .get_account(ctx, &eth_tx.from)
                .map_or(0, |account| account.sequence);
            if eth_tx.nonce != sequence {
                return Err(AnteError::InvalidNonce {
                    address: eth_tx.from,
                    expected: sequence,
                    got: eth_tx.nonce,
                });
            }
        }
        Ok(())
    }
}
