//! Squawk HTTP handlers.
//!
//! ```text
//! POST /api/v1/squawks {"content":"Hello, flock!","userId":"3fa85f64-5717-4562-b3fc-2c963f66afa6"}
//! GET /api/v1/squawks
//! GET /api/v1/squawks/{id}
//! ```

use actix_web::{HttpResponse, get, http::header, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{CreateSquawk, Error, Squawk, SquawkId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Path prefix under which squawks are addressable.
pub const SQUAWKS_PATH: &str = "/api/v1/squawks";

/// Request payload for `POST /api/v1/squawks`.
///
/// Missing fields fall back to empty content and the nil user so the
/// validation rules report them alongside any other failure.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSquawkBody {
    #[serde(default)]
    #[schema(example = "Hello, flock!")]
    pub content: String,
    #[serde(default)]
    pub user_id: UserId,
}

impl From<CreateSquawkBody> for CreateSquawk {
    fn from(value: CreateSquawkBody) -> Self {
        Self::new(value.content, value.user_id)
    }
}

/// Response payload for a newly created squawk.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreatedSquawkResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
}

/// Response payload describing a stored squawk.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SquawkResponse {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub created_by: String,
}

impl From<Squawk> for SquawkResponse {
    fn from(value: Squawk) -> Self {
        Self {
            id: value.id().to_string(),
            created_at: value.created_at().to_rfc3339(),
            created_by: value.author_id().to_string(),
            content: value.content().to_owned(),
        }
    }
}

fn location(id: SquawkId) -> String {
    format!("{SQUAWKS_PATH}/{id}")
}

/// Returned for path segments that are not UUIDs; the input is not echoed.
pub const MALFORMED_ID_MESSAGE: &str = "Squawk was not found.";

/// Identifiers that are not UUIDs cannot name a squawk.
fn parse_squawk_id(raw: &str) -> Result<SquawkId, Error> {
    Uuid::parse_str(raw)
        .map(SquawkId::from)
        .map_err(|_| Error::not_found(MALFORMED_ID_MESSAGE))
}

/// Post a new squawk.
#[utoipa::path(
    post,
    path = "/api/v1/squawks",
    request_body = CreateSquawkBody,
    responses(
        (
            status = 201,
            description = "Squawk created",
            headers(("Location" = String, description = "URL of the new squawk")),
            body = CreatedSquawkResponse
        ),
        (status = 400, description = "Invalid request", body = Error),
        (status = 429, description = "Author is inside their rate limit window", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["squawks"],
    operation_id = "createSquawk"
)]
#[post("/squawks")]
pub async fn create_squawk(
    state: web::Data<HttpState>,
    payload: web::Json<CreateSquawkBody>,
) -> ApiResult<HttpResponse> {
    let id = state
        .squawks
        .create_squawk(payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location(id)))
        .json(CreatedSquawkResponse { id: id.to_string() }))
}

/// List every squawk, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/squawks",
    responses(
        (status = 200, description = "Squawks", body = [SquawkResponse]),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["squawks"],
    operation_id = "listSquawks"
)]
#[get("/squawks")]
pub async fn list_squawks(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<SquawkResponse>>> {
    let squawks = state.squawks_query.list_squawks().await?;
    Ok(web::Json(
        squawks.into_iter().map(SquawkResponse::from).collect(),
    ))
}

/// Fetch one squawk by identifier.
#[utoipa::path(
    get,
    path = "/api/v1/squawks/{id}",
    params(("id" = String, Path, description = "Squawk identifier")),
    responses(
        (status = 200, description = "Squawk", body = SquawkResponse),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["squawks"],
    operation_id = "getSquawk"
)]
#[get("/squawks/{id}")]
pub async fn get_squawk(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<SquawkResponse>> {
    let id = parse_squawk_id(&path.into_inner())?;
    let squawk = state.squawks_query.get_squawk(id).await?;
    Ok(web::Json(SquawkResponse::from(squawk)))
}

#[cfg(test)]
#[path = "squawks_tests.rs"]
mod tests;
