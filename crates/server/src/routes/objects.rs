use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    Json,
};
use common::types::DataEnvelope;
use models::{NewObject, Object};
use serde::Deserialize;
use service::{errors::ServiceError, objects::Listing};
use tracing::{error, info, warn};

use crate::errors::JsonApiError;
use crate::observability::{LISTING_SKIPPED_TOTAL, OBJECTS_CREATED_TOTAL, STORE_FAILURES_TOTAL, TRANSITIONS_TOTAL};
use crate::routes::ServerState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Only objects in this room. `room_id` is accepted too.
    #[serde(rename = "roomId", alias = "room_id")]
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveInput {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// Log and count a failed call, then turn it into the HTTP error body.
fn reject(op: &'static str, id: Option<&str>, err: ServiceError) -> JsonApiError {
    let id = id.unwrap_or("-");
    match &err {
        ServiceError::StoreUnavailable(_) => {
            STORE_FAILURES_TOTAL.inc();
            error!(op, object_id = %id, err = %err, "object request failed");
        }
        ServiceError::Serialization(_) => error!(op, object_id = %id, err = %err, "object request failed"),
        _ => warn!(op, object_id = %id, err = %err, "object request rejected"),
    }
    JsonApiError::from(err)
}

fn listed(op: &'static str, listing: Listing) -> Json<DataEnvelope<Vec<Object>>> {
    if listing.skipped > 0 {
        LISTING_SKIPPED_TOTAL.inc_by(listing.skipped as u64);
        warn!(op, skipped = listing.skipped, "unreadable records skipped");
    }
    info!(op, count = listing.objects.len(), "objects listed");
    Json(DataEnvelope::new(listing.objects))
}

fn count_transition(op: &'static str, result: &Result<Object, ServiceError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(ServiceError::Conflict(_)) => "conflict",
        Err(ServiceError::NotFound(_)) => "not_found",
        Err(ServiceError::Validation(_)) => "invalid",
        Err(_) => "error",
    };
    TRANSITIONS_TOTAL.with_label_values(&[op, outcome]).inc();
}

#[utoipa::path(
    post, path = "/objects", tag = "objects",
    request_body = crate::openapi::CreateObjectDoc,
    responses(
        (status = 200, description = "Created", body = crate::openapi::ObjectEnvelopeDoc),
        (status = 400, description = "Validation Error"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<NewObject>, JsonRejection>,
) -> Result<Json<DataEnvelope<Object>>, JsonApiError> {
    let Json(input) = payload.map_err(|e| {
        warn!(op = "create", err = %e, "malformed create body");
        JsonApiError::bad_request(e.body_text())
    })?;
    info!(name = %input.name, kind = %input.kind, room_id = %input.room_id, "object_create_request");

    let object = state.engine.create(input).await.map_err(|e| reject("create", None, e))?;
    OBJECTS_CREATED_TOTAL.inc();
    info!(object_id = %object.id, room_id = %object.room_id, "object created");
    Ok(Json(DataEnvelope::new(object)))
}

#[utoipa::path(
    get, path = "/objects", tag = "objects",
    params(ListQuery),
    responses(
        (status = 200, description = "List OK", body = crate::openapi::ObjectListDoc),
        (status = 400, description = "Empty roomId"),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<DataEnvelope<Vec<Object>>>, JsonApiError> {
    let Query(q) = query.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    match q.room_id {
        Some(room_id) => {
            let listing = state
                .listing
                .list_by_room(&room_id)
                .await
                .map_err(|e| reject("list_by_room", None, e))?;
            Ok(listed("list_by_room", listing))
        }
        None => {
            let listing = state.listing.list_all().await.map_err(|e| reject("list", None, e))?;
            Ok(listed("list", listing))
        }
    }
}

#[utoipa::path(
    get, path = "/objects/reserved", tag = "objects",
    responses(
        (status = 200, description = "List OK", body = crate::openapi::ObjectListDoc),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn list_reserved(State(state): State<ServerState>) -> Result<Json<DataEnvelope<Vec<Object>>>, JsonApiError> {
    let listing = state.listing.list_reserved().await.map_err(|e| reject("list_reserved", None, e))?;
    Ok(listed("list_reserved", listing))
}

#[utoipa::path(
    get, path = "/objects/{id}", tag = "objects",
    params(("id" = String, Path, description = "Object ID")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::ObjectEnvelopeDoc),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn get(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<DataEnvelope<Object>>, JsonApiError> {
    let object = state.engine.get(&id).await.map_err(|e| reject("get", Some(&id), e))?;
    Ok(Json(DataEnvelope::new(object)))
}

#[utoipa::path(
    patch, path = "/objects/{id}/reserve", tag = "objects",
    params(("id" = String, Path, description = "Object ID")),
    request_body = crate::openapi::ReserveDoc,
    responses(
        (status = 200, description = "Reserved", body = crate::openapi::ObjectEnvelopeDoc),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already reserved or contended"),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn reserve(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<ReserveInput>, JsonRejection>,
) -> Result<Json<DataEnvelope<Object>>, JsonApiError> {
    let Json(input) = payload.map_err(|e| {
        warn!(op = "reserve", object_id = %id, err = %e, "malformed reserve body");
        JsonApiError::bad_request(e.body_text())
    })?;
    info!(object_id = %id, user_id = %input.user_id, "object_reserve_request");

    let result = state.engine.reserve(&id, &input.user_id).await;
    count_transition("reserve", &result);
    let object = result.map_err(|e| reject("reserve", Some(&id), e))?;
    info!(object_id = %object.id, user_id = %object.reserved_by, "object reserved");
    Ok(Json(DataEnvelope::new(object)))
}

#[utoipa::path(
    patch, path = "/objects/{id}/unreserve", tag = "objects",
    params(("id" = String, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Unreserved", body = crate::openapi::ObjectEnvelopeDoc),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Not reserved or contended"),
        (status = 500, description = "Store Unavailable")
    )
)]
pub async fn unreserve(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<DataEnvelope<Object>>, JsonApiError> {
    info!(object_id = %id, "object_unreserve_request");
    let result = state.engine.unreserve(&id).await;
    count_transition("unreserve", &result);
    let object = result.map_err(|e| reject("unreserve", Some(&id), e))?;
    info!(object_id = %object.id, "object unreserved");
    Ok(Json(DataEnvelope::new(object)))
}
