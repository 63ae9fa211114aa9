// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for BNB Smart Chain.
//!
//! This module provides functionality for:
//! - Querying native balances, nonces and gas prices over JSON-RPC
//! - Building, signing and broadcasting funding transactions
//! - Polling for transaction receipts

use std::future::Future;

use alloy::primitives::{Address, B256, U256};

pub mod client;
pub mod signer;
pub mod tx;

#[cfg(test)]
pub mod testutil;

pub use client::{ChainClient, ChainError};
pub use signer::{LocalSigner, SignedTx, SignerError, TxSigner};
pub use tx::{await_receipt, format_amount, parse_amount, TxBuilder};

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL
    pub explorer_url: String,
}

impl NetworkConfig {
    /// BNB Smart Chain mainnet configuration.
    pub fn bsc_mainnet() -> Self {
        Self {
            name: "BNB Smart Chain".to_string(),
            chain_id: 56,
            rpc_url: "https://bsc-dataseed.binance.org".to_string(),
            explorer_url: "https://bscscan.com".to_string(),
        }
    }

    /// BNB Smart Chain testnet (Chapel) configuration.
    pub fn bsc_testnet() -> Self {
        Self {
            name: "BNB Smart Chain Testnet".to_string(),
            chain_id: 97,
            rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545".to_string(),
            explorer_url: "https://testnet.bscscan.com".to_string(),
        }
    }
}

/// Receipt data for a mined transaction.
#[derive(Debug, Clone)]
pub struct ReceiptInfo {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number where the transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Read/broadcast operations against an EVM node.
///
/// The production implementation is [`ChainClient`]; tests construct the
/// relay with an in-memory fake instead of a live endpoint. Methods use
/// return-position futures so generic callers keep `Send` bounds usable
/// from axum handlers.
pub trait Chain: Send + Sync {
    /// Native balance of `address` in wei.
    fn balance(&self, address: Address)
        -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Next transaction nonce for `address`, including pending transactions.
    fn nonce(&self, address: Address) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Current gas price in wei.
    fn gas_price(&self) -> impl Future<Output = Result<u128, ChainError>> + Send;

    /// Broadcast a signed raw transaction, returning its hash.
    fn broadcast(&self, raw_tx: &[u8])
        -> impl Future<Output = Result<B256, ChainError>> + Send;

    /// Receipt for `tx_hash`, or `None` if the transaction is not yet mined.
    fn receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Option<ReceiptInfo>, ChainError>> + Send;
}
