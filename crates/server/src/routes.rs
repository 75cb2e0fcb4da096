use std::sync::Arc;

use axum::{
    routing::{get, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};
use utoipa::OpenApi;

use common::types::Health;
use service::customer::CustomerService;

use crate::metrics;
use crate::openapi::ApiDoc;

pub mod addresses;
pub mod customers;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handler state. The store is injected here; handlers never keep
/// anything of their own between calls.
#[derive(Clone)]
pub struct ServerState {
    pub customers: Arc<CustomerService>,
}

impl ServerState {
    pub fn new(customers: CustomerService) -> Self { Self { customers: Arc::new(customers) } }
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Liveness and storage status", body = crate::openapi::HealthResponse)))]
pub async fn health(axum::extract::State(state): axum::extract::State<ServerState>) -> Json<Health> {
    let storage = state.customers.backend();
    match state.customers.ping().await {
        Ok(()) => Json(Health::ok(storage, VERSION)),
        Err(e) => {
            warn!(error = %e, storage, "storage ping failed");
            Json(Health::degraded(storage, VERSION))
        }
    }
}

async fn metrics_text() -> (axum::http::StatusCode, String) { metrics::encode_metrics() }

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> { Json(ApiDoc::openapi()) }

/// Build the full application router: customer/address API plus health,
/// metrics and the OpenAPI document.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/customers", get(customers::list_customers).post(customers::create_customer))
        .route(
            "/api/customers/:id",
            get(customers::get_customer).put(customers::update_customer).delete(customers::delete_customer),
        )
        .route("/api/customers/:id/isSingleAddress", get(customers::is_single_address))
        .route("/api/customers/:id/addresses", get(addresses::list_addresses).post(addresses::add_address))
        .route("/api/addresses/:id", put(addresses::update_address).delete(addresses::delete_address));

    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api-docs/openapi.json", get(openapi_json));

    ops.merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
