//! HTTP API Layer
//!
//! Read-only REST API over the published claims audit snapshot, using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: audit rows, payers, consumer reports and run reports
//! - **Middleware**: request ids and request logging
//! - **DTOs**: query parameters and response envelopes
//! - **Error Handling**: consistent JSON error bodies
//!
//! Handlers only see an [`AuditReader`]; which store backs it is decided by
//! the server binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(reader, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use app_pipeline::AuditReader;

use crate::config::ApiConfig;
use crate::handlers::{audits, health, reports, runs};
use crate::middleware::request_log_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<dyn AuditReader>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(reader: Arc<dyn AuditReader>, config: ApiConfig) -> Self {
        Self { reader, config }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let audit_routes = Router::new()
        .route("/", get(audits::list_audits))
        .route("/:claim_id", get(audits::get_audit));

    let report_routes = Router::new()
        .route("/overview", get(reports::overview))
        .route("/payers", get(reports::payers))
        .route("/exceptions", get(reports::exceptions))
        .route("/monthly-payments", get(reports::monthly));

    let api_routes = Router::new()
        .nest("/audits", audit_routes)
        .route("/payers", get(audits::list_payers))
        .nest("/reports", report_routes)
        .route("/runs/latest", get(runs::latest_run))
        .layer(axum_middleware::from_fn(request_log_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
