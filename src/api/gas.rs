// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gas sponsorship endpoints.
//!
//! Handlers only parse the body, call into the relay service and map
//! outcomes to HTTP statuses; all policy lives in `relay::service`.

use alloy::primitives::{Address, U256};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::chain::{format_amount, parse_amount};
use crate::error::ApiError;
use crate::relay::{
    RejectReason, SponsorshipOutcome, SponsorshipRequest, VerificationOutcome,
};
use crate::state::AppState;

/// Eligibility check request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckGasRequest {
    /// Recipient wallet address (0x-prefixed hex).
    pub address: String,
}

/// Eligibility check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckGasResponse {
    pub success: bool,
    pub address: String,
    /// Current balance in native units.
    pub balance: String,
    /// Current balance in wei.
    pub balance_wei: String,
    pub needs_gas: bool,
    /// Suggested top-up in native units, "0" when none needed.
    pub required_amount: String,
}

/// Sponsorship request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendGasRequest {
    /// Recipient wallet address (0x-prefixed hex).
    pub address: String,
    /// Size of the transfer the recipient is preparing, in tokens.
    #[serde(default)]
    pub context_amount: Option<String>,
    /// Explicit sponsorship amount override, in native units.
    #[serde(default)]
    pub amount: Option<String>,
}

/// Sponsorship result.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendGasResponse {
    pub success: bool,
    /// `sponsored`, `not_needed`, or a rejection code.
    pub status: String,
    /// Amount sent in native units, "0" for no-ops and rejections.
    pub amount_sent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Block explorer link for the funding transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Verification request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Recipient wallet address (0x-prefixed hex).
    pub address: String,
    /// Token balance the recipient wants to move.
    pub token_amount: String,
}

/// Verification result.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    /// Whether the token amount clears the transfer minimum.
    pub should_transfer: bool,
    pub gas_provided: bool,
    /// Sponsored amount in native units, "0" when nothing was sent.
    pub gas_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_tx_hash: Option<String>,
    /// Transfer minimum in tokens.
    pub minimum_required: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Provider account status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderStatusResponse {
    pub success: bool,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Provider balance in native units.
    pub balance: String,
    /// `healthy`, `low` or `critical`.
    pub status: String,
    pub can_send: bool,
}

/// Check whether an address needs gas sponsorship.
#[utoipa::path(
    post,
    path = "/v1/gas/check",
    request_body = CheckGasRequest,
    tag = "Gas",
    responses(
        (status = 200, description = "Eligibility report", body = CheckGasResponse),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "Chain endpoint unavailable")
    )
)]
pub async fn check_gas(
    State(state): State<AppState>,
    Json(request): Json<CheckGasRequest>,
) -> Result<Json<CheckGasResponse>, ApiError> {
    let recipient = parse_address(&request.address)?;

    let report = state
        .relay
        .check_eligibility(recipient)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(Json(CheckGasResponse {
        success: true,
        address: format!("{recipient:#x}"),
        balance: format_amount(report.balance_wei, 18),
        balance_wei: report.balance_wei.to_string(),
        needs_gas: report.needs_gas,
        required_amount: format_amount(report.required_wei, 18),
    }))
}

/// Sponsor gas for an address.
#[utoipa::path(
    post,
    path = "/v1/gas/send",
    request_body = SendGasRequest,
    tag = "Gas",
    responses(
        (status = 200, description = "Sponsored or no-op", body = SendGasResponse),
        (status = 400, description = "Malformed address or amount"),
        (status = 429, description = "Send window exhausted", body = SendGasResponse),
        (status = 502, description = "Broadcast failed", body = SendGasResponse),
        (status = 503, description = "Provider unconfigured or insolvent", body = SendGasResponse)
    )
)]
pub async fn send_gas(
    State(state): State<AppState>,
    Json(request): Json<SendGasRequest>,
) -> Result<(StatusCode, Json<SendGasResponse>), ApiError> {
    let sponsorship = sponsorship_request(&request)?;
    let outcome = state.relay.sponsor(&sponsorship).await?;
    let explorer = &state.relay.chain().network().explorer_url;
    Ok(send_gas_response(outcome, explorer))
}

/// Verify a pending transfer and provision gas if needed.
#[utoipa::path(
    post,
    path = "/v1/gas/verify",
    request_body = VerifyRequest,
    tag = "Gas",
    responses(
        (status = 200, description = "Verification result", body = VerifyResponse),
        (status = 400, description = "Malformed request"),
        (status = 429, description = "Verification window exhausted", body = VerifyResponse)
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>), ApiError> {
    let recipient = parse_address(&request.address)?;
    let context_amount_units = parse_amount(request.token_amount.trim(), 18)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let sponsorship = SponsorshipRequest {
        recipient,
        context_amount_units,
        requested_amount_wei: None,
    };
    let outcome = state.relay.verify_and_sponsor(&sponsorship).await?;
    Ok(verify_response(outcome, state.relay.min_transfer_units()))
}

/// Operational status of the provider account.
#[utoipa::path(
    get,
    path = "/v1/gas/provider",
    tag = "Gas",
    responses(
        (status = 200, description = "Provider status", body = ProviderStatusResponse),
        (status = 502, description = "Chain endpoint unavailable")
    )
)]
pub async fn provider_status(
    State(state): State<AppState>,
) -> Result<Json<ProviderStatusResponse>, ApiError> {
    let status = state
        .relay
        .provider_status()
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(Json(ProviderStatusResponse {
        success: status.configured,
        configured: status.configured,
        address: status.address.map(|a| format!("{a:#x}")),
        balance: format_amount(status.balance_wei, 18),
        status: status.health.as_str().to_string(),
        can_send: status.can_send,
    }))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid address format"))
}

fn sponsorship_request(request: &SendGasRequest) -> Result<SponsorshipRequest, ApiError> {
    let recipient = parse_address(&request.address)?;

    let context_amount_units = match &request.context_amount {
        Some(raw) => {
            parse_amount(raw.trim(), 18).map_err(|e| ApiError::bad_request(e.to_string()))?
        }
        None => U256::ZERO,
    };

    let requested_amount_wei = match &request.amount {
        Some(raw) => {
            Some(parse_amount(raw.trim(), 18).map_err(|e| ApiError::bad_request(e.to_string()))?)
        }
        None => None,
    };

    Ok(SponsorshipRequest {
        recipient,
        context_amount_units,
        requested_amount_wei,
    })
}

fn send_gas_response(
    outcome: SponsorshipOutcome,
    explorer: &str,
) -> (StatusCode, Json<SendGasResponse>) {
    match outcome {
        SponsorshipOutcome::Sponsored {
            tx_hash,
            amount_wei,
            confirmed,
        } => (
            StatusCode::OK,
            Json(SendGasResponse {
                success: true,
                status: "sponsored".to_string(),
                amount_sent: format_amount(amount_wei, 18),
                tx_hash: Some(format!("{tx_hash:#x}")),
                explorer_url: Some(format!("{explorer}/tx/{tx_hash:#x}")),
                confirmed: Some(confirmed),
                error: None,
            }),
        ),
        SponsorshipOutcome::NotNeeded => (
            StatusCode::OK,
            Json(SendGasResponse {
                success: true,
                status: "not_needed".to_string(),
                amount_sent: "0".to_string(),
                tx_hash: None,
                explorer_url: None,
                confirmed: None,
                error: None,
            }),
        ),
        SponsorshipOutcome::Rejected(reason) => (
            rejection_status(&reason),
            Json(SendGasResponse {
                success: false,
                status: reason.code().to_string(),
                amount_sent: "0".to_string(),
                tx_hash: None,
                explorer_url: None,
                confirmed: None,
                error: Some(reason.to_string()),
            }),
        ),
    }
}

fn rejection_status(reason: &RejectReason) -> StatusCode {
    match reason {
        RejectReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        RejectReason::NotConfigured | RejectReason::InsufficientProviderBalance => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RejectReason::SendFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn verify_response(
    outcome: VerificationOutcome,
    minimum_units: U256,
) -> (StatusCode, Json<VerifyResponse>) {
    let minimum_required = format_amount(minimum_units, 18);
    match outcome {
        VerificationOutcome::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(VerifyResponse {
                success: false,
                should_transfer: false,
                gas_provided: false,
                gas_amount: "0".to_string(),
                gas_tx_hash: None,
                minimum_required: minimum_required.clone(),
                error: Some(
                    "Verification rate limit exceeded. Please wait before trying again."
                        .to_string(),
                ),
            }),
        ),
        VerificationOutcome::BelowMinimum { minimum_units } => (
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                should_transfer: false,
                gas_provided: false,
                gas_amount: "0".to_string(),
                gas_tx_hash: None,
                minimum_required: format_amount(minimum_units, 18),
                error: None,
            }),
        ),
        VerificationOutcome::Ready { sponsorship } => {
            let (gas_provided, gas_amount, gas_tx_hash, error) = match sponsorship {
                SponsorshipOutcome::Sponsored {
                    tx_hash,
                    amount_wei,
                    ..
                } => (
                    true,
                    format_amount(amount_wei, 18),
                    Some(format!("{tx_hash:#x}")),
                    None,
                ),
                SponsorshipOutcome::NotNeeded => (false, "0".to_string(), None, None),
                SponsorshipOutcome::Rejected(reason) => {
                    (false, "0".to_string(), None, Some(reason.to_string()))
                }
            };
            (
                StatusCode::OK,
                Json(VerifyResponse {
                    success: true,
                    should_transfer: true,
                    gas_provided,
                    gas_amount,
                    gas_tx_hash,
                    minimum_required,
                    error,
                }),
            )
        }
    }
}
