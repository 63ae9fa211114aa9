// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::chain::ChainClient;
use crate::relay::SponsorshipService;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<SponsorshipService<ChainClient>>,
}

impl AppState {
    pub fn new(relay: SponsorshipService<ChainClient>) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}
