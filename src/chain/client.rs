// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC client for BNB Smart Chain.

use alloy::{
    eips::BlockId,
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};

use super::{Chain, NetworkConfig, ReceiptInfo};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<alloy::network::Ethereum>,
>;

/// EVM JSON-RPC client.
///
/// Every method issues a single request/response; callers decide whether
/// to retry. Failures surface as [`ChainError::Rpc`] carrying the JSON-RPC
/// method name and the upstream message.
pub struct ChainClient {
    /// Network configuration
    network: NetworkConfig,
    /// Alloy HTTP provider
    provider: HttpProvider,
}

impl ChainClient {
    /// Create a new client for the specified network.
    pub fn new(network: NetworkConfig) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self { network, provider })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

impl Chain for ChainClient {
    fn balance(
        &self,
        address: Address,
    ) -> impl std::future::Future<Output = Result<U256, ChainError>> + Send {
        async move {
            self.provider
                .get_balance(address)
                .await
                .map_err(|e| ChainError::rpc("eth_getBalance", e))
        }
    }

    fn nonce(
        &self,
        address: Address,
    ) -> impl std::future::Future<Output = Result<u64, ChainError>> + Send {
        async move {
            // Pending tag so queued provider transactions are counted.
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending())
                .await
                .map_err(|e| ChainError::rpc("eth_getTransactionCount", e))
        }
    }

    fn gas_price(&self) -> impl std::future::Future<Output = Result<u128, ChainError>> + Send {
        async move {
            self.provider
                .get_gas_price()
                .await
                .map_err(|e| ChainError::rpc("eth_gasPrice", e))
        }
    }

    fn broadcast(
        &self,
        raw_tx: &[u8],
    ) -> impl std::future::Future<Output = Result<B256, ChainError>> + Send {
        async move {
            let pending = self
                .provider
                .send_raw_transaction(raw_tx)
                .await
                .map_err(|e| ChainError::rpc("eth_sendRawTransaction", e))?;

            Ok(*pending.tx_hash())
        }
    }

    fn receipt(
        &self,
        tx_hash: B256,
    ) -> impl std::future::Future<Output = Result<Option<ReceiptInfo>, ChainError>> + Send {
        async move {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ChainError::rpc("eth_getTransactionReceipt", e))?;

            Ok(receipt.map(|r| ReceiptInfo {
                tx_hash,
                block_number: r.block_number.unwrap_or(0),
                gas_used: r.gas_used as u64,
                success: r.status(),
            }))
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC call `{method}` failed: {message}")]
    Rpc {
        method: &'static str,
        message: String,
    },
}

impl ChainError {
    /// Wrap an upstream provider error with the JSON-RPC method name.
    pub(crate) fn rpc(method: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Rpc {
            method,
            message: err.to_string(),
        }
    }
}
