// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory [`Chain`] fake for unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{keccak256, Address, B256, U256};

use super::{Chain, ChainError, ReceiptInfo};

/// Mutable world state backing a [`FakeChain`].
#[derive(Debug, Default)]
pub struct FakeChainState {
    /// Native balances by address; unknown addresses read as zero.
    pub balances: HashMap<Address, U256>,
    /// Next nonce handed out; incremented on every broadcast.
    pub nonce: u64,
    /// Quoted gas price in wei.
    pub gas_price: u128,
    /// Raw bytes of every accepted broadcast, in order.
    pub broadcasts: Vec<Vec<u8>>,
    /// Receipts by transaction hash.
    pub receipts: HashMap<B256, ReceiptInfo>,
    /// When set, broadcasts fail with this message.
    pub broadcast_failure: Option<String>,
    /// When set, every broadcast immediately gets a successful receipt.
    pub auto_mine: bool,
}

/// Deterministic in-memory chain double.
///
/// Broadcasting records the raw transaction and bumps the nonce, so nonce
/// monotonicity across sequential sends is observable from tests.
#[derive(Debug, Default)]
pub struct FakeChain {
    state: Mutex<FakeChainState>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the world state.
    pub fn state(&self) -> MutexGuard<'_, FakeChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Convenience: set the native balance of `address`.
    pub fn set_balance(&self, address: Address, balance_wei: U256) {
        self.state().balances.insert(address, balance_wei);
    }
}

impl Chain for FakeChain {
    fn balance(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send {
        let balance = self
            .state()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO);
        async move { Ok(balance) }
    }

    fn nonce(&self, _address: Address) -> impl Future<Output = Result<u64, ChainError>> + Send {
        let nonce = self.state().nonce;
        async move { Ok(nonce) }
    }

    fn gas_price(&self) -> impl Future<Output = Result<u128, ChainError>> + Send {
        let gas_price = self.state().gas_price;
        async move { Ok(gas_price) }
    }

    fn broadcast(&self, raw_tx: &[u8]) -> impl Future<Output = Result<B256, ChainError>> + Send {
        let result = {
            let mut state = self.state();
            if let Some(message) = state.broadcast_failure.clone() {
                Err(ChainError::Rpc {
                    method: "eth_sendRawTransaction",
                    message,
                })
            } else {
                let hash = keccak256(raw_tx);
                state.broadcasts.push(raw_tx.to_vec());
                state.nonce += 1;
                if state.auto_mine {
                    state.receipts.insert(
                        hash,
                        ReceiptInfo {
                            tx_hash: hash,
                            block_number: state.broadcasts.len() as u64,
                            gas_used: 21_000,
                            success: true,
                        },
                    );
                }
                Ok(hash)
            }
        };
        async move { result }
    }

    fn receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Option<ReceiptInfo>, ChainError>> + Send {
        let receipt = self.state().receipts.get(&tx_hash).cloned();
        async move { Ok(receipt) }
    }
}
