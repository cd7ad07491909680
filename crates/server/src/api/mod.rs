//! HTTP surface of the authentication service.
//!
//! - `oauth` - Google login and callback (`/google/*`)
//! - `session` - refresh token exchange and logout (`/refresh`, `/logout`)
//! - `health` - process liveness (`/healthz`)
//! - `openapi` - API document served at `/api-docs`

pub mod health;
pub mod oauth;
pub mod openapi;
pub mod session;

use std::net::SocketAddr;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

use crate::AuthState;
use crate::config::AppConfig;

pub use health::OPS_TAG;
pub use oauth::AUTH_TAG;

/// Cookie holding the opaque refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// HTTP-only cookie carrying a freshly issued refresh token.
pub(crate) fn refresh_cookie(config: &AppConfig, refresh_token: String) -> Cookie<'static> {
    let seconds = i64::try_from(config.jwt.refresh_ttl.as_secs()).unwrap_or(i64::MAX);
    let max_age = time::Duration::seconds(seconds);

    Cookie::build((REFRESH_COOKIE, refresh_token))
        .http_only(true)
        .secure(config.redirect_url.scheme() == "https")
        .same_site(SameSite::Lax)
        .path("/")
        .domain(config.cookie_domain())
        .max_age(max_age)
        .build()
}

/// Removal cookie matching the attributes of [`refresh_cookie`].
pub(crate) fn expired_refresh_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE)
        .path("/")
        .domain(config.cookie_domain())
        .build()
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    let origin = HeaderValue::from_str(&config.redirect_url.origin().ascii_serialization()).ok()?;
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST])
            .allow_credentials(true),
    )
}

/// Build the application router with all routes and middleware.
pub fn router(state: AuthState) -> Router {
    let config = state.config.clone();

    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(oauth::router(state.clone()))
        .merge(session::router(state))
        .routes(routes!(health::liveness))
        .split_for_parts();

    let router = router
        .merge(Redoc::with_url("/api-docs", api))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ));

    let router = match cors_layer(&config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(state), fields(port = state.config.port))]
pub async fn start_webserver(state: AuthState) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server has been started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
