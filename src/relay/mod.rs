// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gas sponsorship domain logic.
//!
//! - `gas_math` - pure sponsorship amount arithmetic
//! - `rate_limit` - per-address admission windows
//! - `service` - the orchestration pipeline

pub mod gas_math;
pub mod rate_limit;
pub mod service;

pub use gas_math::GasPolicy;
pub use rate_limit::{MemoryStore, RateLimitPolicy, RateLimitRecord, RateLimitStore, RateLimiter};
pub use service::{
    ConfirmationPolicy, EligibilityReport, HealthLevel, ProviderAccount, ProviderStatus,
    RejectReason, RelayError, RelayPolicy, SponsorshipOutcome, SponsorshipRequest,
    SponsorshipService, VerificationOutcome,
};
