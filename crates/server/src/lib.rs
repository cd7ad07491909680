//! Session credentials for users signing in through an external identity provider.
//!
//! The service drives the OAuth2 login/callback flow against Google, finds or
//! creates the matching user in the Hasura user directory, and issues a pair of
//! credentials: a short-lived signed access token carrying Hasura role claims,
//! and an opaque refresh token kept in Redis.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::IdentityResolver;
use crate::provider::IdentityProvider;
use crate::token::TokenIssuer;

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod provider;
pub mod roles;
pub mod store;
pub mod token;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub provider: Arc<dyn IdentityProvider>,
    pub identities: IdentityResolver,
}
