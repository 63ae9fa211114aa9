// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building and receipt polling.
//!
//! Funding transactions are legacy (gas-priced) transfers: BNB Smart Chain
//! accepts them everywhere and they keep the descriptor identical to what
//! the provider account actually broadcasts. Nonce and gas price are
//! fetched immediately before every build so a descriptor is never reused
//! against a stale nonce.

use std::time::Duration;

use alloy::{
    consensus::TxLegacy,
    primitives::{Address, Bytes, TxKind, B256, U256},
    sol,
    sol_types::SolCall,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Chain, ChainError, ReceiptInfo};

// Transfer selector for token-transfer-shaped funding (ABI-encoded
// `transfer(address,uint256)`).
sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Gas limit for a plain native-value transfer.
pub const NATIVE_TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit for a contract-call-shaped (token transfer) transaction.
pub const TOKEN_TRANSFER_GAS_LIMIT: u64 = 100_000;

// Broadcast gas price is padded 20% over the node quote so the funding
// transaction is not underpriced during fee spikes.
const GAS_PRICE_PAD_NUM: u128 = 12;
const GAS_PRICE_PAD_DEN: u128 = 10;

/// Builds unsigned legacy transaction descriptors against a [`Chain`].
pub struct TxBuilder<'a, C: Chain> {
    chain: &'a C,
    chain_id: u64,
}

impl<'a, C: Chain> TxBuilder<'a, C> {
    /// Create a builder for the given chain id.
    pub fn new(chain: &'a C, chain_id: u64) -> Self {
        Self { chain, chain_id }
    }

    /// Build a native-currency transfer of `value_wei` from `from` to `to`.
    pub async fn build_native_transfer(
        &self,
        from: Address,
        to: Address,
        value_wei: U256,
    ) -> Result<TxLegacy, ChainError> {
        let (nonce, gas_price) = self.fresh_tx_params(from).await?;

        Ok(TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit: NATIVE_TRANSFER_GAS_LIMIT,
            to: TxKind::Call(to),
            value: value_wei,
            input: Bytes::new(),
        })
    }

    /// Build a token transfer of `amount` (token smallest units) to `to`,
    /// executed against the `token` contract.
    pub async fn build_token_transfer(
        &self,
        from: Address,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxLegacy, ChainError> {
        let (nonce, gas_price) = self.fresh_tx_params(from).await?;

        Ok(TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit: TOKEN_TRANSFER_GAS_LIMIT,
            to: TxKind::Call(token),
            value: U256::ZERO,
            input: token_transfer_calldata(to, amount).into(),
        })
    }

    /// Fetch a fresh pending nonce and padded gas price for `from`.
    async fn fresh_tx_params(&self, from: Address) -> Result<(u64, u128), ChainError> {
        let nonce = self.chain.nonce(from).await?;
        let quoted = self.chain.gas_price().await?;
        let gas_price = quoted
            .saturating_mul(GAS_PRICE_PAD_NUM)
            .checked_div(GAS_PRICE_PAD_DEN)
            .unwrap_or(quoted);

        Ok((nonce, gas_price))
    }
}

/// ABI-encode a `transfer(to, amount)` call.
pub fn token_transfer_calldata(to: Address, amount: U256) -> Vec<u8> {
    IERC20::transferCall { to, amount }.abi_encode()
}

/// Poll for the receipt of `tx_hash`.
///
/// Tries up to `max_attempts` times, sleeping `poll_interval` between
/// attempts. Exhaustion returns `None`: a transaction that is not yet
/// mined is a normal outcome, not a fault. Per-attempt RPC failures are
/// logged and retried rather than propagated. Cancelling `shutdown`
/// aborts the wait early, also yielding `None`.
pub async fn await_receipt<C: Chain>(
    chain: &C,
    tx_hash: B256,
    max_attempts: u32,
    poll_interval: Duration,
    shutdown: &CancellationToken,
) -> Option<ReceiptInfo> {
    for attempt in 1..=max_attempts {
        if shutdown.is_cancelled() {
            return None;
        }

        match chain.receipt(tx_hash).await {
            Ok(Some(receipt)) => return Some(receipt),
            Ok(None) => {}
            Err(e) => {
                debug!(tx_hash = %tx_hash, attempt, error = %e, "receipt poll failed");
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown.cancelled() => return None,
            }
        }
    }

    None
}

/// Parse a human-readable decimal amount to wei (or token units).
///
/// Conversion is exact integer arithmetic; amounts with more fractional
/// digits than `decimals` are rejected rather than rounded.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountParseError> {
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 {
        return Err(AmountParseError(format!("malformed amount `{amount}`")));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| AmountParseError(format!("invalid whole part in `{amount}`")))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(AmountParseError(format!(
                "too many decimal places (max {decimals})"
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| AmountParseError(format!("invalid decimal part in `{amount}`")))?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| AmountParseError(format!("amount `{amount}` overflows")))?;

    Ok(U256::from(total))
}

/// Format wei (or token units) to a human-readable decimal amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Amount string could not be converted exactly.
#[derive(Debug, thiserror::Error)]
#[error("Invalid amount: {0}")]
pub struct AmountParseError(String);
