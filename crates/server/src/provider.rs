//! External identity provider.
//!
//! The login flow only needs three things from a provider: where to send the
//! browser, how to turn an authorization code into a provider token, and who
//! that token belongs to.

use std::fmt;

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Access token issued by the provider. Kept out of `Debug` output.
#[derive(Clone)]
pub struct ProviderToken(String);

impl ProviderToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderToken([redacted])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page URL carrying `state` as the anti-CSRF parameter.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ExternalProfile, ProviderError>;
}

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Google OAuth2 with the v2 userinfo endpoint.
#[derive(Clone)]
pub struct GoogleProvider {
    client: GoogleClient,
    http: reqwest::Client,
    userinfo_url: Url,
}

impl GoogleProvider {
    /// `http` must not follow redirects; the token endpoint answers directly.
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Self {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::from_url(config.auth_url.clone()))
            .set_token_uri(TokenUrl::from_url(config.token_url.clone()))
            .set_redirect_uri(RedirectUrl::from_url(config.redirect_url.clone()));

        Self {
            client,
            http,
            userinfo_url: config.userinfo_url.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> String {
        let (url, _) = self
            .client
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scopes(GOOGLE_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .url();
        url.to_string()
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ProviderError::Exchange(e.to_string()))?;

        Ok(ProviderToken::new(response.access_token().secret().clone()))
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ExternalProfile, ProviderError> {
        let profile: ExternalProfile = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(token.secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProviderError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Profile(e.to_string()))?;

        if profile.email.trim().is_empty() {
            return Err(ProviderError::Profile("profile has no email".into()));
        }
        Ok(profile)
    }
}
