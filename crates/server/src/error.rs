use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store unavailable during {operation}: {source}")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: redis::RedisError,
    },
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to convert role: {0}")]
    InvalidRole(String),
    #[error("Invalid access token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to lookup refresh token")]
    RefreshTokenNotFound,
    #[error("Failed to sign access token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TokenError {
    /// Errors the client can only recover from by logging in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            TokenError::InvalidRole(_) | TokenError::InvalidToken(_) | TokenError::RefreshTokenNotFound
        )
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Resource {0} is not found")]
    NotFound(String),
    #[error("Directory returned errors: {}", .0.join("; "))]
    Graphql(Vec<String>),
    #[error("Unexpected directory response: {0}")]
    UnexpectedResponse(String),
    #[error("Directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to get authorization token: {0}")]
    Exchange(String),
    #[error("Failed to fetch user profile: {0}")]
    Profile(String),
}

/// Failure of the login callback, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("oauthstate cookie is missing")]
    MissingState,
    #[error("redirect_path cookie is missing")]
    MissingRedirectPath,
    #[error("oauthstate cookie and returned state are different")]
    StateMismatch,
    #[error("authorization code is missing")]
    MissingCode,
    #[error("callback query is malformed: {0}")]
    MalformedQuery(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl CallbackError {
    /// Stable label used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            CallbackError::MissingState
            | CallbackError::MissingRedirectPath
            | CallbackError::StateMismatch => "csrf",
            CallbackError::MissingCode | CallbackError::MalformedQuery(_) => "request",
            CallbackError::Provider(ProviderError::Exchange(_)) => "exchange",
            CallbackError::Provider(ProviderError::Profile(_)) => "profile",
            CallbackError::Directory(_) => "identity",
            CallbackError::Token(_) => "token",
        }
    }
}
