use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::errors::JsonApiError;
use crate::routes::ServerState;

/// Credential from the `X-API-Key` header, falling back to the `api_key` query param.
fn credential(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    from_header.or_else(|| {
        req.uri().query().and_then(|q| {
            q.split('&').find_map(|pair| {
                let mut it = pair.splitn(2, '=');
                match (it.next(), it.next()) {
                    (Some("api_key"), Some(v)) => Some(v.to_string()),
                    _ => None,
                }
            })
        })
    })
}

/// Middleware: consult the capability check before any mutating object route.
pub async fn require_capability(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let key = credential(&req);
    if !state.capability.authorize(key.as_deref()).await {
        warn!(method = %req.method(), path = %req.uri().path(), "capability check rejected request");
        return Err(JsonApiError::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            Some("a valid X-API-Key is required to modify objects".into()),
        ));
    }
    Ok(next.run(req).await)
}
