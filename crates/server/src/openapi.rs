use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Stored and returned object shape.
#[derive(ToSchema)]
pub struct ObjectDoc {
    pub id: String,
    pub name: String,
    #[schema(rename = "type")]
    pub kind: String,
    #[schema(rename = "isReserved")]
    pub is_reserved: bool,
    #[schema(rename = "reservedBy")]
    pub reserved_by: String,
    #[schema(rename = "roomId")]
    pub room_id: String,
}

#[derive(ToSchema)]
pub struct ObjectEnvelopeDoc { pub data: ObjectDoc }

#[derive(ToSchema)]
pub struct ObjectListDoc { pub data: Vec<ObjectDoc> }

#[derive(ToSchema)]
pub struct CreateObjectDoc {
    pub name: String,
    #[schema(rename = "type")]
    pub kind: String,
    #[schema(rename = "roomId")]
    pub room_id: String,
}

#[derive(ToSchema)]
pub struct ReserveDoc {
    #[schema(rename = "userId")]
    pub user_id: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::objects::create,
        crate::routes::objects::list,
        crate::routes::objects::list_reserved,
        crate::routes::objects::get,
        crate::routes::objects::reserve,
        crate::routes::objects::unreserve,
    ),
    components(
        schemas(
            HealthResponse,
            ObjectDoc,
            ObjectEnvelopeDoc,
            ObjectListDoc,
            CreateObjectDoc,
            ReserveDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "objects", description = "Object reservation"),
    )
)]
pub struct ApiDoc;
