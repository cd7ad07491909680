use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::config::JwtConfig;
use crate::error::TokenError;
use crate::roles::Role;
use crate::store::CredentialStore;
use crate::token::{AccessClaims, HasuraClaims, TokenIssuer, TokenPair};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Store-backed token issuer.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    refresh_grace: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn CredentialStore>, config: &JwtConfig) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            refresh_grace: config.refresh_grace,
        }
    }

    /// Fully verify an access token: signature, algorithm and expiry.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::InvalidToken)
    }

    /// Recover the claims of a token this service signed, whether or not it
    /// has expired. Access tokens outlive their own `exp` inside the store,
    /// since the refresh window is longer than the access window.
    fn decode_stored_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::InvalidToken)
    }

    fn sign(&self, user_id: &str, role: Role) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let claims = AccessClaims {
            hasura: HasuraClaims {
                allowed_roles: role.allowed_role_names(),
                default_role: role.as_str().to_string(),
                user_id: user_id.to_string(),
            },
            exp: (now + self.access_ttl).as_secs(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(TokenError::Signing)
    }
}

#[async_trait]
impl TokenIssuer for TokenService {
    #[tracing::instrument(skip(self))]
    async fn create_token(&self, user_id: &str, role: &str) -> Result<TokenPair, TokenError> {
        let role: Role = role
            .parse()
            .map_err(|_| TokenError::InvalidRole(role.to_string()))?;

        let access_token = self.sign(user_id, role)?;
        let refresh_token = uuid::Uuid::new_v4().to_string();

        self.store
            .set(&refresh_token, &access_token, self.refresh_ttl)
            .await?;

        tracing::debug!(role = %role, "Issued credential pair");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let access_token = self
            .store
            .get(refresh_token)
            .await?
            .ok_or(TokenError::RefreshTokenNotFound)?;

        // Rotated tokens linger for the grace window instead of being deleted,
        // so a client racing two refreshes is not logged out. Replays inside
        // the window never push its end further out.
        self.store
            .shorten_expiry(refresh_token, self.refresh_grace)
            .await?;

        let claims = self.decode_stored_token(&access_token)?;
        let HasuraClaims {
            user_id,
            default_role,
            ..
        } = claims.hasura;

        self.create_token(&user_id, &default_role).await
    }

    #[tracing::instrument(skip_all)]
    async fn remove_token(&self, refresh_token: &str) -> Result<(), TokenError> {
        let deleted = self.store.delete(refresh_token).await?;
        tracing::debug!(deleted, "Removed refresh token");
        Ok(())
    }
}
