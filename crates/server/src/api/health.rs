//! Liveness endpoint for the container runtime.

/// Tag for OpenAPI documentation.
pub const OPS_TAG: &str = "Operations";

/// Answers as long as the HTTP listener is up. Redis and Hasura are only
/// checked once, at startup, so an outage there keeps this green while
/// `/refresh` and `/google/callback` fail.
#[tracing::instrument()]
#[utoipa::path(
    method(get, head),
    path = "/healthz",
    tag = OPS_TAG,
    operation_id = "Liveness",
    summary = "Process liveness",
    description = "Plain-text `ok` from the auth service itself. No session, cookie or \
                   backing store is consulted, so a failing response means the process should be restarted.",
    responses(
        (status = 200, description = "Auth service process is running", body = str, content_type = "text/plain", example = "ok")
    )
)]
pub async fn liveness() -> &'static str {
    "ok"
}
