//! Refresh token exchange and logout.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::AuthState;
use crate::api::{AUTH_TAG, REFRESH_COOKIE, expired_refresh_cookie, refresh_cookie};
use crate::error::TokenError;

pub fn router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(refresh))
        .routes(routes!(logout))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    /// Signed access token carrying the Hasura claims.
    pub auth_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn token_error_response(e: &TokenError) -> Response {
    if e.is_unauthorized() {
        tracing::info!(error = %e, "Rejected refresh token");
        error_response(StatusCode::UNAUTHORIZED, "invalid refresh token")
    } else {
        tracing::error!(error = %e, "Failed to refresh session");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/refresh",
    tag = AUTH_TAG,
    operation_id = "Refresh Session",
    summary = "Exchange the refresh token for a new credential pair",
    description = "Rotates the `refresh_token` cookie and returns a fresh access token.\n\n\
                   The old refresh token stays usable for a short grace window so concurrent \
                   requests from the same client do not log it out.",
    security(("refresh_token" = [])),
    responses(
        (status = 200, description = "New access token; the refresh cookie is rotated", body = RefreshResponse),
        (status = 401, description = "Refresh token missing, unknown or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn refresh(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let Some(current) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return error_response(StatusCode::UNAUTHORIZED, "refresh_token is missing");
    };

    match state.tokens.refresh_token(&current).await {
        Ok(pair) => {
            let jar = jar.add(refresh_cookie(&state.config, pair.refresh_token));
            (
                jar,
                Json(RefreshResponse {
                    auth_token: pair.access_token,
                }),
            )
                .into_response()
        }
        Err(e) => token_error_response(&e),
    }
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/logout",
    tag = AUTH_TAG,
    operation_id = "Logout",
    summary = "Revoke the refresh token",
    description = "Deletes the refresh token named by the `refresh_token` cookie and clears the cookie. \
                   Calling it without a session is not an error.",
    security(("refresh_token" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn logout(State(state): State<AuthState>, jar: CookieJar) -> Response {
    if let Some(current) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) {
        if let Err(e) = state.tokens.remove_token(&current).await {
            tracing::error!(error = %e, "Failed to revoke refresh token");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    }

    let jar = jar.remove(expired_refresh_cookie(&state.config));
    (StatusCode::NO_CONTENT, jar).into_response()
}
