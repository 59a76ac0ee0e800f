//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the squawk endpoints, the health probes, and the
//! request, response and error schemas they use. The generated document is
//! served through Swagger UI in debug builds.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode, UserId};
use crate::inbound::http::squawks::{CreateSquawkBody, CreatedSquawkResponse, SquawkResponse};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Squawker API",
        description = "Post and read squawks. Each author may post once per rate limit window."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::squawks::create_squawk,
        crate::inbound::http::squawks::list_squawks,
        crate::inbound::http::squawks::get_squawk,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        UserId,
        CreateSquawkBody,
        CreatedSquawkResponse,
        SquawkResponse
    )),
    tags(
        (name = "squawks", description = "Posting and reading squawks"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
