// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing for the provider account.
//!
//! [`TxSigner`] is the capability boundary between transaction assembly and
//! key material. The production implementation performs real secp256k1
//! ECDSA signing over the RLP-encoded legacy payload via alloy's local
//! signer; nothing in this crate fabricates signatures or hashes.

use alloy::{
    consensus::{SignableTransaction, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTx {
    /// RLP-encoded signed transaction bytes
    pub raw: Vec<u8>,
    /// Transaction hash (keccak of the signed payload)
    pub tx_hash: B256,
}

/// Signs legacy transaction descriptors on behalf of one account.
pub trait TxSigner: Send + Sync {
    /// Address of the signing account.
    fn address(&self) -> Address;

    /// Sign `tx`, returning the broadcastable bytes and the transaction hash.
    fn sign(&self, tx: &TxLegacy) -> Result<SignedTx, SignerError>;
}

/// In-process signer backed by a secp256k1 private key.
pub struct LocalSigner {
    inner: PrivateKeySigner,
}

impl LocalSigner {
    /// Create a signer from a hex-encoded private key.
    ///
    /// Accepts 64 hex characters with an optional `0x` prefix. Anything
    /// else is rejected before touching key arithmetic.
    pub fn from_hex(private_key_hex: &str) -> Result<Self, SignerError> {
        let hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);

        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SignerError::InvalidKey(
                "expected 64 hex characters".to_string(),
            ));
        }

        let key_bytes =
            alloy::hex::decode(hex).map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        let inner = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        Ok(Self { inner })
    }
}

impl TxSigner for LocalSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign(&self, tx: &TxLegacy) -> Result<SignedTx, SignerError> {
        let mut tx = tx.clone();
        let signature = self
            .inner
            .sign_transaction_sync(&mut tx)
            .map_err(|e| SignerError::Signing(e.to_string()))?;

        let signed = tx.into_signed(signature);

        Ok(SignedTx {
            raw: signed.encoded_2718(),
            tx_hash: *signed.hash(),
        })
    }
}

/// Errors raised while loading keys or signing.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}
