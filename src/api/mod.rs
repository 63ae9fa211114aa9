// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod gas;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/gas/check", post(gas::check_gas))
        .route("/gas/send", post(gas::send_gas))
        .route("/gas/verify", post(gas::verify))
        .route("/gas/provider", get(gas::provider_status));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // The wallet front end is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        gas::check_gas,
        gas::send_gas,
        gas::verify,
        gas::provider_status,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            gas::CheckGasRequest,
            gas::CheckGasResponse,
            gas::SendGasRequest,
            gas::SendGasResponse,
            gas::VerifyRequest,
            gas::VerifyResponse,
            gas::ProviderStatusResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Gas", description = "Gas sponsorship operations"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
