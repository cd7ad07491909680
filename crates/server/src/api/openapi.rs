//! OpenAPI/Utoipa configuration.

use crate::api::{AUTH_TAG, OPS_TAG, REFRESH_COOKIE};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let cookie = ApiKey::Cookie(ApiKeyValue::with_description(
            REFRESH_COOKIE,
            "HTTP-only cookie set by `/google/callback` and rotated by `/refresh`.",
        ));
        components.add_security_scheme(REFRESH_COOKIE, SecurityScheme::ApiKey(cookie));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Session Auth API",
        version = "0.1.0",
        description = "Google login and session credentials for the Hasura GraphQL API."
    ),
    tags(
        (name = OPS_TAG, description = "Process liveness for the container runtime"),
        (name = AUTH_TAG, description = "Login, refresh and logout endpoints")
    )
)]
pub struct ApiDoc;
