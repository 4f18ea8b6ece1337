/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Hashing and signature primitives used by the state overlay and the admission pipeline.
//!
//! Nothing here is a new cryptographic construction: the functions are thin adapters over
//! `tiny-keccak`, `sha2`, `ripemd`, `ed25519-dalek` and `k256`.

use alloy_primitives::{Address, B256};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// keccak256 hash of empty input, the code hash of every account without code.
pub const EMPTY_CODE_HASH: B256 = B256::new([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data.as_ref());
    hasher.finalize(&mut output);
    B256::from(output)
}

pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Sha256::digest(data.as_ref()).into()
}

/// Public keys accepted by the signature verification stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key")]
pub enum PubKey {
    /// 32 bytes
    Ed25519(Vec<u8>),
    /// 33 bytes compressed SEC1, signatures over sha256(sign bytes)
    Secp256k1(Vec<u8>),
    /// 33 bytes compressed SEC1, signatures over keccak256(sign bytes)
    EthSecp256k1(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key length {len} for {kind}")]
    InvalidKeyLength { kind: &'static str, len: usize },
    #[error("malformed public key: {0}")]
    MalformedKey(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signature verification failed")]
    VerificationFailed,
}

impl PubKey {
    pub fn kind(&self) -> &'static str {
        match self {
            PubKey::Ed25519(_) => "ed25519",
            PubKey::Secp256k1(_) => "secp256k1",
            PubKey::EthSecp256k1(_) => "eth_secp256k1",
        }
    }

    /// Account address derived from the key.
    ///
    /// |Key           |Address                                  |
    /// |:---          |:---                                     |
    /// |ed25519       |sha256(key)\[..20\]                      |
    /// |secp256k1     |ripemd160(sha256(key))                   |
    /// |eth_secp256k1 |keccak256(uncompressed key\[1..\])\[12..\] |
    pub fn address(&self) -> Result<Address, CryptoError> {
        match self {
            PubKey::Ed25519(key) => {
                if key.len() != 32 {
                    return Err(CryptoError::InvalidKeyLength { kind: self.kind(), len: key.len() });
                }
                Ok(Address::from_slice(&sha256(key)[..20]))
            }
            PubKey::Secp256k1(key) => {
                if key.len() != 33 {
                    return Err(CryptoError::InvalidKeyLength { kind: self.kind(), len: key.len() });
                }
                let hash = Ripemd160::digest(sha256(key));
                Ok(Address::from_slice(&hash))
            }
            PubKey::EthSecp256k1(key) => {
                let verifying_key = secp256k1_key(key)?;
                let uncompressed = verifying_key.to_encoded_point(false);
                let hash = keccak256(&uncompressed.as_bytes()[1..]);
                Ok(Address::from_slice(&hash[12..]))
            }
        }
    }

    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self {
            PubKey::Ed25519(key) => {
                let key: [u8; 32] = key
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidKeyLength { kind: "ed25519", len: key.len() })?;
                let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key)
                    .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
                verifying_key
                    .verify_strict(msg, &signature)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            PubKey::Secp256k1(key) => {
                let verifying_key = secp256k1_key(key)?;
                let signature = secp256k1_signature(signature)?;
                verifying_key
                    .verify_prehash(&sha256(msg), &signature)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            PubKey::EthSecp256k1(key) => {
                let verifying_key = secp256k1_key(key)?;
                let signature = secp256k1_signature(signature)?;
                verifying_key
                    .verify_prehash(keccak256(msg).as_slice(), &signature)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
        }
    }
}

fn secp256k1_key(key: &[u8]) -> Result<k256::ecdsa::VerifyingKey, CryptoError> {
    if key.len() != 33 {
        return Err(CryptoError::InvalidKeyLength { kind: "secp256k1", len: key.len() });
    }
    k256::ecdsa::VerifyingKey::from_sec1_bytes(key).map_err(|e| CryptoError::MalformedKey(e.to_string()))
}

// 64 bytes r || s; a trailing recovery id (65 bytes) is tolerated and ignored
fn secp256k1_signature(signature: &[u8]) -> Result<k256::ecdsa::Signature, CryptoError> {
    let rs = match signature.len() {
        64 => signature,
        65 => &signature[..64],
        len => return Err(CryptoError::MalformedSignature(format!("length {len}"))),
    };
    k256::ecdsa::Signature::from_slice(rs).map_err(|e| CryptoError::MalformedSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer as _;

    #[test]
    fn empty_code_hash_is_keccak_of_nothing() {
        assert_eq!(keccak256([]), EMPTY_CODE_HASH);
    }

    #[test]
    fn ed25519_verify() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let pubkey = PubKey::Ed25519(signing_key.verifying_key().to_bytes().to_vec());
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(pubkey.verify(b"hello", &signature).is_ok());
        assert_eq!(pubkey.verify(b"hellO", &signature), Err(CryptoError::VerificationFailed));
        assert_eq!(pubkey.address().unwrap().as_slice(), &sha256(signing_key.verifying_key().to_bytes())[..20]);
    }

    #[test]
    fn secp256k1_verify() {
        use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};
        let signing_key = SigningKey::from_slice(&[9u8; 32]).unwrap();
        let compressed = signing_key.verifying_key().to_encoded_point(true).as_bytes().to_vec();

        let cosmos_key = PubKey::Secp256k1(compressed.clone());
        let signature: Signature = signing_key.sign_prehash(&sha256(b"payload")).unwrap();
        assert!(cosmos_key.verify(b"payload", &signature.to_bytes()).is_ok());

        let eth_key = PubKey::EthSecp256k1(compressed);
        let signature: Signature = signing_key.sign_prehash(keccak256(b"payload").as_slice()).unwrap();
        assert!(eth_key.verify(b"payload", &signature.to_bytes()).is_ok());
        assert_eq!(cosmos_key.verify(b"payload", &signature.to_bytes()), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn rejects_wrong_key_length() {
        let key = PubKey::Ed25519(vec![1; 31]);
        assert!(matches!(key.address(), Err(CryptoError::InvalidKeyLength { .. })));
    }
}
