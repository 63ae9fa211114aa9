// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sponsorship orchestration.
//!
//! [`SponsorshipService`] runs the full decision pipeline for one request:
//! configuration check, rate limit, recipient balance, amount computation,
//! provider solvency, then build/sign/broadcast and optional confirmation.
//! Business rejections (rate limited, insolvent provider, unconfigured)
//! are values, not errors; only validation failures and pre-send chain
//! communication failures surface as `Err`.

use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::{
    await_receipt, Chain, ChainError, LocalSigner, SignerError, TxBuilder, TxSigner,
};
use crate::config::ProviderCredentials;
use crate::relay::gas_math::GasPolicy;
use crate::relay::rate_limit::{RateLimitPolicy, RateLimiter};

/// One sponsorship request, constructed per call.
#[derive(Debug, Clone)]
pub struct SponsorshipRequest {
    /// Wallet to fund.
    pub recipient: Address,
    /// Size of the transfer the recipient is preparing, in token smallest
    /// units; zero when unknown. Only scales the sponsorship buffer.
    pub context_amount_units: U256,
    /// Explicit amount override in wei, bounded by the send ceiling.
    pub requested_amount_wei: Option<U256>,
}

impl SponsorshipRequest {
    /// Request with no context transfer and no override.
    pub fn for_recipient(recipient: Address) -> Self {
        Self {
            recipient,
            context_amount_units: U256::ZERO,
            requested_amount_wei: None,
        }
    }
}

/// Why a sponsorship was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Provider credentials missing or malformed at startup.
    NotConfigured,
    /// Recipient exceeded the send window.
    RateLimited,
    /// Provider balance cannot cover amount plus reserve.
    InsufficientProviderBalance,
    /// Build, sign or broadcast failed after all checks passed.
    SendFailed(String),
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::RateLimited => "rate_limited",
            Self::InsufficientProviderBalance => "insufficient_provider_balance",
            Self::SendFailed(_) => "send_failed",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendFailed(detail) => write!(f, "{}: {detail}", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

/// Terminal result of one sponsorship attempt.
///
/// Deliberately a tri-state: "recipient already funded" is not a fake
/// transaction with a sentinel hash, it is [`SponsorshipOutcome::NotNeeded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SponsorshipOutcome {
    /// Funding transaction broadcast.
    Sponsored {
        tx_hash: B256,
        amount_wei: U256,
        /// Receipt observed before the poll window closed. `false` means
        /// "sent, unconfirmed", not a failure.
        confirmed: bool,
    },
    /// Recipient balance already meets the need; nothing was sent.
    NotNeeded,
    /// Refused before broadcast.
    Rejected(RejectReason),
}

/// Result of a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Recipient exceeded the verification window.
    RateLimited,
    /// Context amount below the transfer minimum; no sponsorship attempted.
    BelowMinimum { minimum_units: U256 },
    /// Minimum met; gas provisioning ran.
    Ready { sponsorship: SponsorshipOutcome },
}

/// Recipient eligibility snapshot.
#[derive(Debug, Clone)]
pub struct EligibilityReport {
    pub recipient: Address,
    pub balance_wei: U256,
    pub needs_gas: bool,
    /// Estimated top-up to clear the floor, zero when already sufficient.
    pub required_wei: U256,
}

/// Provider account health, thresholded on its native balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLevel {
    Healthy,
    Low,
    Critical,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Low => "low",
            Self::Critical => "critical",
        }
    }
}

/// Operational snapshot of the provider account.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub configured: bool,
    pub address: Option<Address>,
    pub balance_wei: U256,
    pub health: HealthLevel,
    pub can_send: bool,
}

/// The custodial account that pays for sponsorships.
///
/// Immutable after construction; the signing capability never leaves it.
pub struct ProviderAccount {
    pub address: Address,
    signer: Box<dyn TxSigner>,
}

impl ProviderAccount {
    /// Bind a signer to its account address.
    ///
    /// The address the signer actually controls must match `address`;
    /// trusting either value alone would let a typo fund from (or strand
    /// reserves in) the wrong account.
    pub fn new(address: Address, signer: Box<dyn TxSigner>) -> Result<Self, ProviderAccountError> {
        let derived = signer.address();
        if derived != address {
            return Err(ProviderAccountError::AddressMismatch { address, derived });
        }
        Ok(Self { address, signer })
    }

    /// Build the account from raw configuration values.
    pub fn from_credentials(creds: &ProviderCredentials) -> Result<Self, ProviderAccountError> {
        let address: Address = creds
            .address
            .parse()
            .map_err(|_| ProviderAccountError::InvalidAddress(creds.address.clone()))?;
        let signer = LocalSigner::from_hex(&creds.private_key)?;
        Self::new(address, Box::new(signer))
    }
}

/// Provider credentials could not be turned into a usable account.
#[derive(Debug, thiserror::Error)]
pub enum ProviderAccountError {
    #[error("Invalid provider address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("signing key controls {derived}, not the configured address {address}")]
    AddressMismatch { address: Address, derived: Address },
}

/// Receipt-wait behavior after a broadcast.
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    /// Poll for the receipt before returning.
    pub wait_for_receipt: bool,
    /// Poll attempts before giving up.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            wait_for_receipt: false,
            max_attempts: 30,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Everything the service needs besides the chain itself.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    pub gas: GasPolicy,
    pub send_limit: RateLimitPolicy,
    pub verify_limit: RateLimitPolicy,
    pub confirmation: ConfirmationPolicy,
    /// Context amount (token smallest units) below which verification
    /// reports the transfer as not worth preparing.
    pub min_transfer_context_units: U256,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            gas: GasPolicy::default(),
            send_limit: RateLimitPolicy::send_default(),
            verify_limit: RateLimitPolicy::verify_default(),
            confirmation: ConfirmationPolicy::default(),
            // 5 tokens at 18 decimals.
            min_transfer_context_units: U256::from(5_000_000_000_000_000_000u64),
        }
    }
}

/// Validation or upstream failure before the send stage.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Load the provider account from optional credentials, logging the result.
///
/// Missing or malformed credentials leave the service unconfigured until
/// restart; every sponsorship is then rejected without touching the chain.
pub fn load_provider(creds: Option<&ProviderCredentials>) -> Option<ProviderAccount> {
    match creds {
        None => {
            warn!("gas provider credentials not set; relay starts unconfigured");
            None
        }
        Some(creds) => match ProviderAccount::from_credentials(creds) {
            Ok(provider) => {
                info!(provider = %provider.address, "gas provider account loaded");
                Some(provider)
            }
            Err(e) => {
                warn!(error = %e, "gas provider credentials malformed; relay starts unconfigured");
                None
            }
        },
    }
}

/// Gas sponsorship orchestrator.
pub struct SponsorshipService<C: Chain> {
    chain: C,
    chain_id: u64,
    provider: Option<ProviderAccount>,
    policy: RelayPolicy,
    send_limiter: RateLimiter,
    verify_limiter: RateLimiter,
    // Serializes nonce fetch through broadcast; without it two in-flight
    // sponsorships can observe the same provider nonce and one broadcast
    // is rejected by the network.
    nonce_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl<C: Chain> SponsorshipService<C> {
    pub fn new(
        chain: C,
        chain_id: u64,
        provider: Option<ProviderAccount>,
        policy: RelayPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        let send_limiter = RateLimiter::new(policy.send_limit);
        let verify_limiter = RateLimiter::new(policy.verify_limit);
        Self {
            chain,
            chain_id,
            provider,
            policy,
            send_limiter,
            verify_limiter,
            nonce_lock: Mutex::new(()),
            shutdown,
        }
    }

    /// Whether provider credentials were loaded at startup.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Chain access, for health probes.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Context amount (token smallest units) below which verification
    /// reports the transfer as not worth preparing.
    pub fn min_transfer_units(&self) -> U256 {
        self.policy.min_transfer_context_units
    }

    /// Check whether `recipient` needs sponsorship, and how much.
    pub async fn check_eligibility(
        &self,
        recipient: Address,
    ) -> Result<EligibilityReport, ChainError> {
        let balance_wei = self.chain.balance(recipient).await?;
        Ok(EligibilityReport {
            recipient,
            balance_wei,
            needs_gas: self.policy.gas.needs_gas(balance_wei),
            required_wei: self.policy.gas.required_top_up(balance_wei),
        })
    }

    /// Operational snapshot of the provider account.
    pub async fn provider_status(&self) -> Result<ProviderStatus, ChainError> {
        let Some(provider) = self.provider.as_ref() else {
            return Ok(ProviderStatus {
                configured: false,
                address: None,
                balance_wei: U256::ZERO,
                health: HealthLevel::Critical,
                can_send: false,
            });
        };

        let balance_wei = self.chain.balance(provider.address).await?;
        let health = if balance_wei > self.policy.gas.provider_healthy_wei {
            HealthLevel::Healthy
        } else if balance_wei > self.policy.gas.provider_low_wei {
            HealthLevel::Low
        } else {
            HealthLevel::Critical
        };

        Ok(ProviderStatus {
            configured: true,
            address: Some(provider.address),
            balance_wei,
            health,
            can_send: balance_wei > self.policy.gas.provider_low_wei,
        })
    }

    /// Run the full sponsorship pipeline for one request.
    pub async fn sponsor(
        &self,
        request: &SponsorshipRequest,
    ) -> Result<SponsorshipOutcome, RelayError> {
        let Some(provider) = self.provider.as_ref() else {
            warn!(recipient = %request.recipient, "sponsorship rejected: provider not configured");
            return Ok(SponsorshipOutcome::Rejected(RejectReason::NotConfigured));
        };

        if !self.send_limiter.admit(&limiter_key(request.recipient)) {
            info!(recipient = %request.recipient, "sponsorship rejected: send window exhausted");
            return Ok(SponsorshipOutcome::Rejected(RejectReason::RateLimited));
        }

        self.sponsor_admitted(provider, request).await
    }

    /// Verification entry point: its own rate window and a minimum-transfer
    /// gate, then the same provisioning pipeline. A verified request does
    /// not also consume a send slot; its own window covers it.
    pub async fn verify_and_sponsor(
        &self,
        request: &SponsorshipRequest,
    ) -> Result<VerificationOutcome, RelayError> {
        if request.context_amount_units.is_zero() {
            return Err(RelayError::Validation(
                "no token balance to verify".to_string(),
            ));
        }

        if !self.verify_limiter.admit(&limiter_key(request.recipient)) {
            info!(recipient = %request.recipient, "verification rejected: window exhausted");
            return Ok(VerificationOutcome::RateLimited);
        }

        if request.context_amount_units < self.policy.min_transfer_context_units {
            return Ok(VerificationOutcome::BelowMinimum {
                minimum_units: self.policy.min_transfer_context_units,
            });
        }

        let Some(provider) = self.provider.as_ref() else {
            return Ok(VerificationOutcome::Ready {
                sponsorship: SponsorshipOutcome::Rejected(RejectReason::NotConfigured),
            });
        };

        let sponsorship = self.sponsor_admitted(provider, request).await?;
        Ok(VerificationOutcome::Ready { sponsorship })
    }

    /// Pipeline stages after admission: balance, amount, solvency, send.
    async fn sponsor_admitted(
        &self,
        provider: &ProviderAccount,
        request: &SponsorshipRequest,
    ) -> Result<SponsorshipOutcome, RelayError> {
        let gas = &self.policy.gas;

        let balance_wei = self.chain.balance(request.recipient).await?;
        if balance_wei >= gas.eligibility_floor_wei {
            info!(
                recipient = %request.recipient,
                balance_wei = %balance_wei,
                "recipient already has sufficient gas"
            );
            return Ok(SponsorshipOutcome::NotNeeded);
        }

        let amount_wei = match request.requested_amount_wei {
            Some(requested) => {
                if requested > gas.max_transfer_wei {
                    return Err(RelayError::Validation(format!(
                        "requested amount {requested} wei exceeds the send ceiling"
                    )));
                }
                requested
            }
            None => gas.optimal_amount(request.context_amount_units, balance_wei),
        };
        if amount_wei.is_zero() {
            return Ok(SponsorshipOutcome::NotNeeded);
        }

        let provider_balance = self.chain.balance(provider.address).await?;
        let required = gas.provider_required_balance(amount_wei);
        if provider_balance < required {
            warn!(
                provider = %provider.address,
                balance_wei = %provider_balance,
                required_wei = %required,
                "sponsorship rejected: provider cannot cover amount plus reserve"
            );
            return Ok(SponsorshipOutcome::Rejected(
                RejectReason::InsufficientProviderBalance,
            ));
        }

        let send_result = {
            let _nonce_guard = self.nonce_lock.lock().await;
            self.build_sign_broadcast(provider, request.recipient, amount_wei)
                .await
        };

        let tx_hash = match send_result {
            Ok(tx_hash) => tx_hash,
            Err(detail) => {
                // State is ambiguous from here on; keep every detail we have.
                error!(
                    recipient = %request.recipient,
                    amount_wei = %amount_wei,
                    error = %detail,
                    "gas sponsorship send failed"
                );
                return Ok(SponsorshipOutcome::Rejected(RejectReason::SendFailed(
                    detail,
                )));
            }
        };

        info!(
            recipient = %request.recipient,
            amount_wei = %amount_wei,
            tx_hash = %tx_hash,
            "gas sponsorship broadcast"
        );

        let confirmed = if self.policy.confirmation.wait_for_receipt {
            await_receipt(
                &self.chain,
                tx_hash,
                self.policy.confirmation.max_attempts,
                self.policy.confirmation.poll_interval,
                &self.shutdown,
            )
            .await
            .map(|receipt| receipt.success)
            .unwrap_or(false)
        } else {
            false
        };

        Ok(SponsorshipOutcome::Sponsored {
            tx_hash,
            amount_wei,
            confirmed,
        })
    }

    /// Build → sign → broadcast with a fresh nonce. Must run under the
    /// nonce lock. Failures collapse to a detail string: whatever breaks
    /// inside this span is reported as a send failure, not retried here.
    async fn build_sign_broadcast(
        &self,
        provider: &ProviderAccount,
        recipient: Address,
        amount_wei: U256,
    ) -> Result<B256, String> {
        let builder = TxBuilder::new(&self.chain, self.chain_id);
        let descriptor = builder
            .build_native_transfer(provider.address, recipient, amount_wei)
            .await
            .map_err(|e| e.to_string())?;

        let signed = provider
            .signer
            .sign(&descriptor)
            .map_err(|e| e.to_string())?;

        self.chain
            .broadcast(&signed.raw)
            .await
            .map_err(|e| e.to_string())
    }
}

fn limiter_key(address: Address) -> String {
    format!("{address:#x}")
}

#[cfg(test)]
mod tests {
    use alloy::consensus::TxEnvelope;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::TxKind;

    use crate::chain::parse_amount;
    use crate::chain::testutil::FakeChain;

    use super::*;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn wei(amount: &str) -> U256 {
        parse_amount(amount, 18).expect("test amount")
    }

    fn test_provider() -> ProviderAccount {
        let signer = LocalSigner::from_hex(TEST_KEY).expect("signer");
        let address = signer.address();
        ProviderAccount::new(address, Box::new(signer)).expect("provider")
    }

    fn funded_chain(provider: &ProviderAccount) -> FakeChain {
        let chain = FakeChain::new();
        chain.set_balance(provider.address, wei("1"));
        chain.state().gas_price = 5_000_000_000;
        chain
    }

    fn service(
        chain: FakeChain,
        provider: Option<ProviderAccount>,
        policy: RelayPolicy,
    ) -> SponsorshipService<FakeChain> {
        SponsorshipService::new(chain, 56, provider, policy, CancellationToken::new())
    }

    fn recipient() -> Address {
        Address::repeat_byte(0x42)
    }

    fn decode_legacy(raw: &[u8]) -> alloy::consensus::TxLegacy {
        match TxEnvelope::decode_2718(&mut &raw[..]).expect("decode") {
            TxEnvelope::Legacy(signed) => signed.tx().clone(),
            other => panic!("expected legacy transaction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_service_rejects_without_network() {
        let svc = service(FakeChain::new(), None, RelayPolicy::default());

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        assert_eq!(
            outcome,
            SponsorshipOutcome::Rejected(RejectReason::NotConfigured)
        );
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn funded_recipient_is_a_no_op() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("0.005"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        assert_eq!(outcome, SponsorshipOutcome::NotNeeded);
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn covered_need_below_floor_is_a_no_op() {
        // Below the eligibility floor, but already above the computed need
        // (base fee 0.004 with no context buffer): nothing to send.
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("0.0045"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        assert_eq!(outcome, SponsorshipOutcome::NotNeeded);
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn send_window_exhaustion_rejects() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("1"));
        let policy = RelayPolicy {
            send_limit: RateLimitPolicy {
                max_requests: 1,
                window_secs: 3_600,
            },
            ..RelayPolicy::default()
        };
        let svc = service(chain, Some(provider), policy);
        let request = SponsorshipRequest::for_recipient(recipient());

        assert_eq!(
            svc.sponsor(&request).await.expect("first"),
            SponsorshipOutcome::NotNeeded
        );
        assert_eq!(
            svc.sponsor(&request).await.expect("second"),
            SponsorshipOutcome::Rejected(RejectReason::RateLimited)
        );
    }

    #[tokio::test]
    async fn insolvent_provider_rejects_without_broadcast() {
        let provider = test_provider();
        let chain = FakeChain::new();
        // Needs 0.004 + reserve 0.002; provider only has 0.005.
        chain.set_balance(provider.address, wei("0.005"));
        chain.state().gas_price = 5_000_000_000;
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        assert_eq!(
            outcome,
            SponsorshipOutcome::Rejected(RejectReason::InsufficientProviderBalance)
        );
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn documented_scenario_broadcasts_exact_amount() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("0.001"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let request = SponsorshipRequest {
            recipient: recipient(),
            context_amount_units: wei("10"),
            requested_amount_wei: None,
        };
        let outcome = svc.sponsor(&request).await.expect("sponsor");

        let SponsorshipOutcome::Sponsored {
            amount_wei,
            confirmed,
            ..
        } = outcome
        else {
            panic!("expected Sponsored, got {outcome:?}");
        };
        assert_eq!(amount_wei, wei("0.00302"));
        assert!(!confirmed);

        let broadcasts = svc.chain().state().broadcasts.clone();
        assert_eq!(broadcasts.len(), 1);
        let tx = decode_legacy(&broadcasts[0]);
        assert_eq!(tx.value, wei("0.00302"));
        assert_eq!(tx.to, TxKind::Call(recipient()));
        assert_eq!(tx.chain_id, Some(56));
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.gas_price, 6_000_000_000); // node quote +20%
    }

    #[tokio::test]
    async fn sequential_sends_use_monotonic_nonces() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let first = Address::repeat_byte(0x01);
        let second = Address::repeat_byte(0x02);
        svc.sponsor(&SponsorshipRequest::for_recipient(first))
            .await
            .expect("first");
        svc.sponsor(&SponsorshipRequest::for_recipient(second))
            .await
            .expect("second");

        let broadcasts = svc.chain().state().broadcasts.clone();
        assert_eq!(broadcasts.len(), 2);
        assert_eq!(decode_legacy(&broadcasts[0]).nonce, 0);
        assert_eq!(decode_legacy(&broadcasts[1]).nonce, 1);
    }

    #[tokio::test]
    async fn broadcast_failure_reports_send_failed() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.state().broadcast_failure = Some("insufficient funds for gas".to_string());
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        match outcome {
            SponsorshipOutcome::Rejected(RejectReason::SendFailed(detail)) => {
                assert!(detail.contains("eth_sendRawTransaction"));
            }
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirmation_wait_reports_mined_receipt() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.state().auto_mine = true;
        let policy = RelayPolicy {
            confirmation: ConfirmationPolicy {
                wait_for_receipt: true,
                max_attempts: 3,
                poll_interval: Duration::from_millis(1),
            },
            ..RelayPolicy::default()
        };
        let svc = service(chain, Some(provider), policy);

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        assert!(matches!(
            outcome,
            SponsorshipOutcome::Sponsored { confirmed: true, .. }
        ));
    }

    #[tokio::test]
    async fn missing_receipt_still_reports_hash() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        let policy = RelayPolicy {
            confirmation: ConfirmationPolicy {
                wait_for_receipt: true,
                max_attempts: 2,
                poll_interval: Duration::from_millis(1),
            },
            ..RelayPolicy::default()
        };
        let svc = service(chain, Some(provider), policy);

        let outcome = svc
            .sponsor(&SponsorshipRequest::for_recipient(recipient()))
            .await
            .expect("sponsor");

        // Timed-out confirmation is "sent, unconfirmed" with the real hash.
        match outcome {
            SponsorshipOutcome::Sponsored {
                tx_hash, confirmed, ..
            } => {
                assert!(!confirmed);
                assert_ne!(tx_hash, B256::ZERO);
            }
            other => panic!("expected Sponsored, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_override_is_a_validation_error() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let request = SponsorshipRequest {
            recipient: recipient(),
            context_amount_units: U256::ZERO,
            requested_amount_wei: Some(wei("0.5")),
        };

        assert!(matches!(
            svc.sponsor(&request).await,
            Err(RelayError::Validation(_))
        ));
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn eligibility_report_matches_policy() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("0.001"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let report = svc.check_eligibility(recipient()).await.expect("report");
        assert!(report.needs_gas);
        assert_eq!(report.balance_wei, wei("0.001"));
        assert_eq!(report.required_wei, wei("0.005"));
    }

    #[tokio::test]
    async fn provider_status_thresholds() {
        let provider = test_provider();
        let address = provider.address;
        let chain = FakeChain::new();
        chain.set_balance(address, wei("0.5"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let status = svc.provider_status().await.expect("status");
        assert!(status.configured);
        assert_eq!(status.health, HealthLevel::Healthy);
        assert!(status.can_send);

        svc.chain().set_balance(address, wei("0.05"));
        assert_eq!(
            svc.provider_status().await.expect("status").health,
            HealthLevel::Low
        );

        svc.chain().set_balance(address, wei("0.005"));
        let critical = svc.provider_status().await.expect("status");
        assert_eq!(critical.health, HealthLevel::Critical);
        assert!(!critical.can_send);
    }

    #[tokio::test]
    async fn unconfigured_provider_status_is_critical() {
        let svc = service(FakeChain::new(), None, RelayPolicy::default());
        let status = svc.provider_status().await.expect("status");
        assert!(!status.configured);
        assert_eq!(status.health, HealthLevel::Critical);
        assert!(!status.can_send);
    }

    #[tokio::test]
    async fn verification_below_minimum_skips_sponsorship() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let request = SponsorshipRequest {
            recipient: recipient(),
            context_amount_units: wei("1"),
            requested_amount_wei: None,
        };
        let outcome = svc.verify_and_sponsor(&request).await.expect("verify");

        assert_eq!(
            outcome,
            VerificationOutcome::BelowMinimum {
                minimum_units: wei("5")
            }
        );
        assert!(svc.chain().state().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn verification_sponsors_needy_recipient() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("0.001"));
        let svc = service(chain, Some(provider), RelayPolicy::default());

        let request = SponsorshipRequest {
            recipient: recipient(),
            context_amount_units: wei("10"),
            requested_amount_wei: None,
        };
        let outcome = svc.verify_and_sponsor(&request).await.expect("verify");

        match outcome {
            VerificationOutcome::Ready {
                sponsorship: SponsorshipOutcome::Sponsored { amount_wei, .. },
            } => assert_eq!(amount_wei, wei("0.00302")),
            other => panic!("expected sponsored verification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verification_has_its_own_window() {
        let provider = test_provider();
        let chain = funded_chain(&provider);
        chain.set_balance(recipient(), wei("1"));
        let policy = RelayPolicy {
            verify_limit: RateLimitPolicy {
                max_requests: 1,
                window_secs: 1_800,
            },
            ..RelayPolicy::default()
        };
        let svc = service(chain, Some(provider), policy);

        let request = SponsorshipRequest {
            recipient: recipient(),
            context_amount_units: wei("10"),
            requested_amount_wei: None,
        };
        assert!(matches!(
            svc.verify_and_sponsor(&request).await.expect("first"),
            VerificationOutcome::Ready { .. }
        ));
        assert_eq!(
            svc.verify_and_sponsor(&request).await.expect("second"),
            VerificationOutcome::RateLimited
        );
    }

    #[tokio::test]
    async fn verification_requires_a_context_amount() {
        let svc = service(FakeChain::new(), None, RelayPolicy::default());
        let request = SponsorshipRequest::for_recipient(recipient());

        assert!(matches!(
            svc.verify_and_sponsor(&request).await,
            Err(RelayError::Validation(_))
        ));
    }

    #[test]
    fn provider_account_rejects_mismatched_address() {
        let signer = LocalSigner::from_hex(TEST_KEY).expect("signer");
        let wrong = Address::repeat_byte(0x99);

        assert!(matches!(
            ProviderAccount::new(wrong, Box::new(signer)),
            Err(ProviderAccountError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn reject_reason_codes_are_stable() {
        assert_eq!(RejectReason::NotConfigured.code(), "not_configured");
        assert_eq!(RejectReason::RateLimited.code(), "rate_limited");
        assert_eq!(
            RejectReason::InsufficientProviderBalance.code(),
            "insufficient_provider_balance"
        );
        assert_eq!(
            RejectReason::SendFailed("boom".to_string()).to_string(),
            "send_failed: boom"
        );
    }
}
