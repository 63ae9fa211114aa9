// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-address request rate limiting.
//!
//! Fixed-window counters keyed by recipient address. Records live in a
//! [`RateLimitStore`] injected at construction; the default store is an
//! in-memory table, which means a process restart clears all limiter
//! state. That is acceptable for this service: the limits guard against
//! drain attempts, not accounting.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// One admission window for one address.
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    /// Requests admitted in the current window.
    pub count: u32,
    /// Instant after which the window is stale and replaced on next admit.
    pub window_resets_at: DateTime<Utc>,
}

/// Backing store for rate-limit records.
///
/// Implementations only need plain `get`/`put`; the [`RateLimiter`]
/// serializes every admission, so a store is never asked to resolve
/// concurrent updates itself. A distributed replacement (for multi-instance
/// deployments) must bring its own compare-and-set semantics.
pub trait RateLimitStore: Send {
    fn get(&mut self, key: &str) -> Option<RateLimitRecord>;
    fn put(&mut self, key: &str, record: RateLimitRecord);
}

/// Default in-memory record table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&mut self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).cloned()
    }

    fn put(&mut self, key: &str, record: RateLimitRecord) {
        self.records.insert(key.to_string(), record);
    }
}

/// Window length and admission ceiling for one limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum admissions per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitPolicy {
    /// Default policy for gas sends: 5 per hour per address.
    pub fn send_default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 3_600,
        }
    }

    /// Default policy for verification requests: 3 per 30 minutes per address.
    pub fn verify_default() -> Self {
        Self {
            max_requests: 3,
            window_secs: 1_800,
        }
    }
}

/// Fixed-window per-key rate limiter.
///
/// The whole check-and-increment runs under one lock, so two concurrent
/// admissions for the same key can never both claim the last slot.
pub struct RateLimiter {
    store: Mutex<Box<dyn RateLimitStore>>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    /// Create a limiter over the default in-memory store.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_store(policy, Box::new(MemoryStore::new()))
    }

    /// Create a limiter over a caller-supplied store.
    pub fn with_store(policy: RateLimitPolicy, store: Box<dyn RateLimitStore>) -> Self {
        Self {
            store: Mutex::new(store),
            policy,
        }
    }

    /// Admit one request for `key`, returning whether it is allowed.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Utc::now())
    }

    /// Admission with an explicit clock, used by tests to cross windows.
    pub(crate) fn admit_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut store = self
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match store.get(key) {
            // Window still active.
            Some(record) if now <= record.window_resets_at => {
                if record.count >= self.policy.max_requests {
                    false
                } else {
                    store.put(
                        key,
                        RateLimitRecord {
                            count: record.count + 1,
                            ..record
                        },
                    );
                    true
                }
            }
            // First request, or stale window: replace with a fresh record.
            _ => {
                store.put(
                    key,
                    RateLimitRecord {
                        count: 1,
                        window_resets_at: now + Duration::seconds(self.policy.window_secs as i64),
                    },
                );
                true
            }
        }
    }
}
