// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and is
//! read-only afterwards. Missing or malformed provider credentials do not
//! abort startup; they leave the relay permanently unconfigured (every
//! sponsorship is rejected) until the process restarts with corrected
//! values.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | BSC public endpoint |
//! | `CHAIN_ID` | Chain id used when signing | `56` |
//! | `GAS_PROVIDER_PRIVATE_KEY` | Provider signing key (64 hex chars) | unset |
//! | `GAS_PROVIDER_PUBLIC_ADDRESS` | Provider account address | unset |
//! | `SEND_RATE_LIMIT_MAX` | Gas sends per address per window | `5` |
//! | `SEND_RATE_LIMIT_WINDOW_SECS` | Gas send window length | `3600` |
//! | `VERIFY_RATE_LIMIT_MAX` | Verifications per address per window | `3` |
//! | `VERIFY_RATE_LIMIT_WINDOW_SECS` | Verification window length | `1800` |
//! | `GAS_FLOOR` | Eligibility floor, native units | `0.005` |
//! | `GAS_BASE_FEE` | Base sponsorship need, native units | `0.004` |
//! | `GAS_BUFFER` | Context-scaled buffer, native units | `0.002` |
//! | `GAS_HARD_CAP` | Per-send sponsorship cap, native units | `0.02` |
//! | `PROVIDER_RESERVE` | Balance the provider must retain | `0.002` |
//! | `WAIT_FOR_RECEIPT` | Poll for confirmation after broadcast | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;

use alloy::primitives::U256;
use tracing::warn;

use crate::chain::{parse_amount, NetworkConfig};
use crate::relay::service::{ConfirmationPolicy, RelayPolicy};
use crate::relay::{GasPolicy, RateLimitPolicy};

/// Environment variable for the server bind address.
pub const HOST_ENV: &str = "HOST";
/// Environment variable for the server bind port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable for the JSON-RPC endpoint URL.
pub const RPC_URL_ENV: &str = "RPC_URL";
/// Environment variable for the chain id.
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
/// Environment variable for the provider signing key.
pub const PROVIDER_KEY_ENV: &str = "GAS_PROVIDER_PRIVATE_KEY";
/// Environment variable for the provider account address.
pub const PROVIDER_ADDRESS_ENV: &str = "GAS_PROVIDER_PUBLIC_ADDRESS";
/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Raw provider credentials as configured, before validation.
///
/// Turned into a `ProviderAccount` (real key parsing plus an address
/// cross-check) during service construction.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub address: String,
    pub private_key: String,
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub network: NetworkConfig,
    pub provider: Option<ProviderCredentials>,
    pub policy: RelayPolicy,
}

impl RelayConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut network = NetworkConfig::bsc_mainnet();
        if let Some(rpc_url) = lookup(RPC_URL_ENV) {
            network.rpc_url = rpc_url;
        }
        network.chain_id = parse_or(&lookup, CHAIN_ID_ENV, network.chain_id);

        let provider = match (lookup(PROVIDER_ADDRESS_ENV), lookup(PROVIDER_KEY_ENV)) {
            (Some(address), Some(private_key)) => Some(ProviderCredentials {
                address,
                private_key,
            }),
            _ => None,
        };

        let gas = GasPolicy {
            eligibility_floor_wei: amount_or(&lookup, "GAS_FLOOR", |g: &GasPolicy| {
                g.eligibility_floor_wei
            }),
            base_fee_wei: amount_or(&lookup, "GAS_BASE_FEE", |g| g.base_fee_wei),
            buffer_wei: amount_or(&lookup, "GAS_BUFFER", |g| g.buffer_wei),
            hard_cap_wei: amount_or(&lookup, "GAS_HARD_CAP", |g| g.hard_cap_wei),
            provider_reserve_wei: amount_or(&lookup, "PROVIDER_RESERVE", |g| {
                g.provider_reserve_wei
            }),
            ..GasPolicy::default()
        };

        let policy = RelayPolicy {
            gas,
            send_limit: RateLimitPolicy {
                max_requests: parse_or(
                    &lookup,
                    "SEND_RATE_LIMIT_MAX",
                    RateLimitPolicy::send_default().max_requests,
                ),
                window_secs: parse_or(
                    &lookup,
                    "SEND_RATE_LIMIT_WINDOW_SECS",
                    RateLimitPolicy::send_default().window_secs,
                ),
            },
            verify_limit: RateLimitPolicy {
                max_requests: parse_or(
                    &lookup,
                    "VERIFY_RATE_LIMIT_MAX",
                    RateLimitPolicy::verify_default().max_requests,
                ),
                window_secs: parse_or(
                    &lookup,
                    "VERIFY_RATE_LIMIT_WINDOW_SECS",
                    RateLimitPolicy::verify_default().window_secs,
                ),
            },
            confirmation: ConfirmationPolicy {
                wait_for_receipt: lookup("WAIT_FOR_RECEIPT")
                    .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                    .unwrap_or(false),
                ..ConfirmationPolicy::default()
            },
            ..RelayPolicy::default()
        };

        Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, PORT_ENV, 8080),
            network,
            provider,
            policy,
        }
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, "ignoring malformed configuration value");
                default
            }
        },
    }
}

/// Parse a decimal native-unit amount, falling back to the policy default.
fn amount_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: impl Fn(&GasPolicy) -> U256,
) -> U256 {
    let fallback = default(&GasPolicy::default());
    match lookup(name) {
        None => fallback,
        Some(raw) => match parse_amount(raw.trim(), 18) {
            Ok(value) => value,
            Err(e) => {
                warn!(var = name, value = %raw, error = %e, "ignoring malformed amount");
                fallback
            }
        },
    }
}
