/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Host chain transaction as seen by the admission pipeline.

use alloy_primitives::{Address, I256};
use serde::{Deserialize, Serialize};

use crate::crypto::PubKey;
use crate::types::{Coin, EthTx};

/// Messages carried by a host transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    /// Bank transfer.
    Send { from: Address, to: Address, amount: Vec<Coin> },
    /// Ethereum transaction wrapped into the host chain.
    EthereumTx(EthTx),
}

impl Msg {
    /// Account which must sign a transaction carrying this message.
    pub fn signer(&self) -> Address {
        match self {
            Msg::Send { from, .. } => *from,
            Msg::EthereumTx(tx) => tx.from,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
    /// pays the fee instead of the first signer
    pub payer: Option<Address>,
    /// pays the fee through a fee allowance
    pub granter: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// required when the account has no public key yet
    pub pub_key: Option<PubKey>,
    pub sequence: u64,
}

/// Extension options a transaction may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionOption {
    /// Caps the priority tip of a transaction paying through the dynamic fee checker.
    DynamicFee { max_priority_price: I256 },
    /// Any option this chain does not know, by type URL.
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub msgs: Vec<Msg>,
    pub memo: String,
    /// zero for no timeout
    pub timeout_height: u64,
    pub extension_options: Vec<ExtensionOption>,
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
    /// one per signer, in the order of [Tx::signers]
    pub signatures: Vec<Vec<u8>>,
}

impl Tx {
    /// Signers of the messages, deduplicated, in order of first appearance.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = Vec::new();
        for msg in &self.msgs {
            let signer = msg.signer();
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        signers
    }

    pub fn gas(&self) -> u64 {
        self.fee.gas_limit
    }

    pub fn fee(&self) -> &[Coin] {
        &self.fee.amount
    }

    /// Explicit payer, or the first signer.
    pub fn fee_payer(&self) -> Option<Address> {
        self.fee.payer.or_else(|| self.signers().first().copied())
    }

    pub fn fee_granter(&self) -> Option<Address> {
        self.fee.granter
    }

    pub fn ethereum_txs(&self) -> impl Iterator<Item = &EthTx> {
        self.msgs.iter().filter_map(|msg| match msg {
            Msg::EthereumTx(tx) => Some(tx),
            _ => None,
        })
    }

    pub fn has_ethereum_tx(&self) -> bool {
        self.ethereum_txs().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signers_are_deduplicated_in_order() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let send = |from| Msg::Send { from, to: Address::ZERO, amount: vec![] };
        let tx = Tx {
            msgs: vec![send(b), send(a), send(b)],
            ..Default::default()
        };
        assert_eq!(tx.signers(), vec![b, a]);
        assert_eq!(tx.fee_payer(), Some(b));
        assert!(!tx.has_ethereum_tx());

        let tx = Tx { fee: Fee { payer: Some(a), ..Default::default() }, ..tx };
        assert_eq!(tx.fee_payer(), Some(a));
    }
}
