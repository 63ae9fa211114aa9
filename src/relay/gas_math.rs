// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsorship amount arithmetic.
//!
//! All values are wei-denominated `U256`; every step is integer
//! arithmetic. Nothing here performs I/O, so the policy is directly
//! unit-testable against the documented scenarios.

use alloy::primitives::U256;

const BPS_SCALE: u64 = 10_000;

/// Amount policy for gas sponsorship.
///
/// The sponsored amount for a recipient holding `balance` wei while
/// preparing a token transfer of `context` units is:
///
/// ```text
/// buffer  = buffer_wei * min(context / scale_reference, cap)
/// needed  = base_fee_wei + buffer
/// to_send = clamp(needed - balance, 0, hard_cap_wei)
/// ```
#[derive(Debug, Clone)]
pub struct GasPolicy {
    /// Balance at or above which a recipient needs no sponsorship.
    pub eligibility_floor_wei: U256,
    /// Base gas requirement for a token transfer.
    pub base_fee_wei: U256,
    /// Buffer scaled by the context transfer size.
    pub buffer_wei: U256,
    /// Context amount (token smallest units) at which the buffer multiplier is 1.
    pub scale_reference_units: U256,
    /// Upper bound on the buffer multiplier, in basis points (15000 = 1.5x).
    pub buffer_multiplier_cap_bps: u64,
    /// Hard cap on a single computed sponsorship.
    pub hard_cap_wei: U256,
    /// Absolute ceiling for any single send, computed or requested.
    pub max_transfer_wei: U256,
    /// Balance the provider must retain beyond the sponsored amount.
    pub provider_reserve_wei: U256,
    /// Safety margin added to eligibility top-up estimates.
    pub top_up_margin_wei: U256,
    /// Provider balance above which the account is healthy.
    pub provider_healthy_wei: U256,
    /// Provider balance above which the account is merely low (below: critical).
    pub provider_low_wei: U256,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            eligibility_floor_wei: U256::from(5_000_000_000_000_000u64), // 0.005
            base_fee_wei: U256::from(4_000_000_000_000_000u64),          // 0.004
            buffer_wei: U256::from(2_000_000_000_000_000u64),            // 0.002
            // 1000 tokens at 18 decimals.
            scale_reference_units: U256::from(1_000u64)
                * U256::from(10u64).pow(U256::from(18u64)),
            buffer_multiplier_cap_bps: 15_000, // 1.5x
            hard_cap_wei: U256::from(20_000_000_000_000_000u64), // 0.02
            max_transfer_wei: U256::from(100_000_000_000_000_000u64), // 0.1
            provider_reserve_wei: U256::from(2_000_000_000_000_000u64), // 0.002
            top_up_margin_wei: U256::from(1_000_000_000_000_000u64), // 0.001
            provider_healthy_wei: U256::from(100_000_000_000_000_000u64), // 0.1
            provider_low_wei: U256::from(10_000_000_000_000_000u64), // 0.01
        }
    }
}

impl GasPolicy {
    /// Whether a recipient holding `balance_wei` needs sponsorship at all.
    pub fn needs_gas(&self, balance_wei: U256) -> bool {
        balance_wei < self.eligibility_floor_wei
    }

    /// Optimal sponsorship amount for a recipient.
    ///
    /// `context_units` is the size of the transfer the recipient is
    /// preparing, in token smallest units; it only scales the buffer.
    /// Returns zero whenever the current balance already covers the need.
    pub fn optimal_amount(&self, context_units: U256, balance_wei: U256) -> U256 {
        let scaled = if self.scale_reference_units.is_zero() {
            U256::ZERO
        } else {
            self.buffer_wei * context_units / self.scale_reference_units
        };
        let buffer_cap =
            self.buffer_wei * U256::from(self.buffer_multiplier_cap_bps) / U256::from(BPS_SCALE);
        let buffer = scaled.min(buffer_cap);

        let needed = self.base_fee_wei + buffer;
        let to_send = needed.saturating_sub(balance_wei);

        to_send.min(self.hard_cap_wei)
    }

    /// Top-up estimate reported by the eligibility check: enough to reach
    /// the floor plus a small margin, zero if the floor is already met.
    pub fn required_top_up(&self, balance_wei: U256) -> U256 {
        if balance_wei >= self.eligibility_floor_wei {
            U256::ZERO
        } else {
            self.eligibility_floor_wei - balance_wei + self.top_up_margin_wei
        }
    }

    /// Minimum balance the provider needs to sponsor `amount_wei`.
    pub fn provider_required_balance(&self, amount_wei: U256) -> U256 {
        amount_wei + self.provider_reserve_wei
    }
}
