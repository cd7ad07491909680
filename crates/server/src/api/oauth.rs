//! Google login and callback endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::AuthState;
use crate::api::refresh_cookie;
use crate::error::CallbackError;
use crate::token::TokenPair;

/// Tag for OpenAPI documentation.
pub const AUTH_TAG: &str = "Authentication";

/// Cookie carrying the anti-CSRF state of a pending login.
pub const STATE_COOKIE: &str = "oauthstate";
/// Cookie carrying the path to return to after a successful login.
pub const REDIRECT_PATH_COOKIE: &str = "redirect_path";

const TRANSACTION_COOKIE_MAX_AGE: time::Duration = time::Duration::hours(1);
const STATE_BYTES: usize = 16;

pub fn router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(callback))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoginParams {
    /// Application path to return to once logged in. Defaults to `/`.
    pub redirect_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// State echoed back by the provider.
    pub state: Option<String>,
    /// Authorization code issued by the provider.
    pub code: Option<String>,
}

/// Random anti-CSRF state: 16 bytes, URL-safe base64 without padding.
pub fn generate_state() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; STATE_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Keeps only same-origin absolute paths, anything else becomes `/`.
pub fn sanitize_redirect_path(path: Option<&str>) -> String {
    match path.map(str::trim) {
        Some(p) if p.starts_with('/') && !p.starts_with("//") && !p.contains('\\') => {
            p.to_string()
        }
        _ => "/".to_string(),
    }
}

fn transaction_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TRANSACTION_COOKIE_MAX_AGE)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/google/login",
    params(LoginParams),
    tag = AUTH_TAG,
    operation_id = "Google Login",
    summary = "Start a Google login",
    description = "Stores a fresh anti-CSRF state and the requested return path in short-lived cookies, \
                   then redirects the browser to Google's consent page.",
    responses(
        (status = 307, description = "Redirect to the Google consent page"),
        (status = 500, description = "Failed to generate login state")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    query: Result<Query<LoginParams>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let params = query.map(|Query(params)| params).unwrap_or_else(|rejection| {
        tracing::warn!(error = %rejection, "Ignoring malformed login query");
        LoginParams::default()
    });
    let csrf = match generate_state() {
        Ok(csrf) => csrf,
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate oauth state");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let redirect_path = sanitize_redirect_path(params.redirect_path.as_deref());
    let authorize_url = state.provider.authorize_url(&csrf);

    let jar = jar
        .add(transaction_cookie(STATE_COOKIE, csrf))
        .add(transaction_cookie(REDIRECT_PATH_COOKIE, redirect_path));

    (jar, Redirect::temporary(&authorize_url)).into_response()
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/google/callback",
    params(CallbackParams),
    tag = AUTH_TAG,
    operation_id = "Google Callback",
    summary = "Complete a Google login",
    description = "Verifies the returned state against the `oauthstate` cookie, exchanges the code, \
                   finds or creates the user and sets the `refresh_token` cookie.\n\n\
                   Any failure, including a malformed query string, redirects to `/` without a session; \
                   details are only logged.",
    responses(
        (status = 307, description = "Redirect to the application, with a `refresh_token` cookie on success")
    )
)]
pub async fn callback(
    State(state): State<AuthState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let outcome = match query {
        Ok(Query(params)) => complete_login(&state, &jar, params).await,
        Err(rejection) => Err(CallbackError::MalformedQuery(rejection.body_text())),
    };
    match outcome {
        Ok((pair, redirect_path)) => {
            let target = format!(
                "{}{}",
                state.config.redirect_url.as_str().trim_end_matches('/'),
                redirect_path
            );
            let jar = jar
                .remove(removal_cookie(STATE_COOKIE))
                .remove(removal_cookie(REDIRECT_PATH_COOKIE))
                .add(refresh_cookie(&state.config, pair.refresh_token));
            tracing::info!(redirect_path = %redirect_path, "Login completed");
            (jar, Redirect::temporary(&target))
        }
        Err(e) => {
            tracing::warn!(stage = e.stage(), error = %e, "Login callback failed");
            (jar, Redirect::temporary("/"))
        }
    }
}

async fn complete_login(
    state: &AuthState,
    jar: &CookieJar,
    params: CallbackParams,
) -> Result<(TokenPair, String), CallbackError> {
    let expected = jar
        .get(STATE_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or(CallbackError::MissingState)?;
    let redirect_path = jar
        .get(REDIRECT_PATH_COOKIE)
        .map(|c| sanitize_redirect_path(Some(c.value())))
        .ok_or(CallbackError::MissingRedirectPath)?;

    if params.state.as_deref() != Some(expected) {
        return Err(CallbackError::StateMismatch);
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let provider_token = state.provider.exchange_code(&code).await?;
    let profile = state.provider.fetch_profile(&provider_token).await?;
    let user = state
        .identities
        .resolve(&profile.email, &profile.name)
        .await?;
    let pair = state.tokens.create_token(&user.id, &user.role).await?;

    Ok((pair, redirect_path))
}
