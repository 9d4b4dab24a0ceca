use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use service::{
    capability::CapabilityCheck,
    objects::{ObjectListing, ReservationEngine},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::observability;

pub mod capability;
pub mod objects;

/// Shared handler state: explicit handles to the engine, listing and capability check.
#[derive(Clone)]
pub struct ServerState {
    pub engine: ReservationEngine,
    pub listing: ObjectListing,
    pub capability: Arc<dyn CapabilityCheck>,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (axum::http::StatusCode, String) {
    observability::encode_metrics()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::openapi::ApiDoc::openapi())
}

/// Build the full application router: public reads, capability-guarded writes, ops endpoints.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let reads = Router::new()
        .route("/objects", get(objects::list))
        .route("/objects/reserved", get(objects::list_reserved))
        .route("/objects/:id", get(objects::get));

    // 变更类接口需通过能力校验（X-API-Key）
    let writes = Router::new()
        .route("/objects", post(objects::create))
        .route("/objects/:id/reserve", patch(objects::reserve))
        .route("/objects/:id/unreserve", patch(objects::unreserve))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            capability::require_capability,
        ));

    ops.merge(reads)
        .merge(writes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 请求到达时打点
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
