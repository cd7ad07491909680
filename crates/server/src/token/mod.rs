//! Session credentials.
//!
//! An access token is a short-lived HS512 JWT carrying Hasura claims. A refresh
//! token is an opaque UUID whose only meaning is the store record pointing at
//! the access token it was issued with.

mod service;

pub use service::TokenService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Namespaced claim block read by Hasura and downstream services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasuraClaims {
    #[serde(rename = "x-hasura-allowed-roles")]
    pub allowed_roles: Vec<String>,
    #[serde(rename = "x-hasura-default-role")]
    pub default_role: String,
    #[serde(rename = "x-hasura-user-id")]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub hasura: HasuraClaims,
    pub exp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, rotates and revokes credential pairs.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn create_token(&self, user_id: &str, role: &str) -> Result<TokenPair, TokenError>;

    /// Exchange a live refresh token for a new pair. The old refresh token
    /// stays usable only for a short grace window.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;

    /// Revoke a refresh token. Revoking an unknown token is not an error.
    async fn remove_token(&self, refresh_token: &str) -> Result<(), TokenError>;
}
