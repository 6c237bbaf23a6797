//! OpenAPI / Swagger UI documentation
//!
//! - Swagger UI: `http://localhost:3000/docs`
//! - OpenAPI JSON: `http://localhost:3000/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::{ErrorResponse, HealthResponse, SendFtRequest, SendFtResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NEAR FT Relay API",
        version = "1.0.0",
        description = "Relays fungible token transfers from a custodial NEAR account, registering recipient storage when required."
    ),
    servers(
        (url = "http://localhost:3000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::root,
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::send_ft,
    ),
    components(
        schemas(
            SendFtRequest,
            SendFtResponse,
            ErrorResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Transfer", description = "Fungible token transfers"),
        (name = "System", description = "Liveness and health")
    )
)]
pub struct ApiDoc;
