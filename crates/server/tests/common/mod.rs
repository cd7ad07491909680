//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use session_auth::AuthState;
use session_auth::api::router;
use session_auth::config::{AppConfig, load_config_from};
use session_auth::directory::{IdentityDirectory, NewUser, User};
use session_auth::error::{DirectoryError, ProviderError};
use session_auth::identity::IdentityResolver;
use session_auth::provider::{ExternalProfile, IdentityProvider, ProviderToken};
use session_auth::store::MemoryStore;
use session_auth::token::TokenService;

pub const JWT_SECRET: &str = "integration-test-secret";

/// Minimal environment that loads into a valid [`AppConfig`].
pub fn base_env() -> Vec<(&'static str, String)> {
    vec![
        ("REDIRECT_URL", "https://app.example.com:3000".into()),
        ("AUTH_GOOGLE_ID", "client-id".into()),
        ("AUTH_GOOGLE_SECRET", "client-secret".into()),
        (
            "AUTH_GOOGLE_REDIRECT_URL",
            "https://auth.example.com/google/callback".into(),
        ),
        ("JWT_SECRET", JWT_SECRET.into()),
        ("JWT_AUTH_TTL", "15".into()),
        ("JWT_REFRESH_TTL", "10080".into()),
        ("GRAPHQL_URL", "https://hasura.example.com/v1/graphql".into()),
        ("GRAPHQL_SECRET", "hasura-admin-secret".into()),
    ]
}

pub fn test_config() -> AppConfig {
    load_config_from(base_env()).expect("valid test configuration")
}

/// Provider that accepts one authorization code and counts its calls.
pub struct FakeProvider {
    pub valid_code: &'static str,
    pub profile: ExternalProfile,
    pub exchange_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub exchange_delay: Duration,
}

impl FakeProvider {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            valid_code: "good-code",
            profile: ExternalProfile {
                email: email.into(),
                name: name.into(),
            },
            exchange_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            exchange_delay: Duration::ZERO,
        }
    }

    /// Code exchange that takes `delay` on the Tokio clock before answering.
    pub fn slow(email: &str, name: &str, delay: Duration) -> Self {
        Self {
            exchange_delay: delay,
            ..Self::new(email, name)
        }
    }

    pub fn calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst) + self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://provider.example.com/auth?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if !self.exchange_delay.is_zero() {
            tokio::time::sleep(self.exchange_delay).await;
        }
        if code == self.valid_code {
            Ok(ProviderToken::new("provider-access-token"))
        } else {
            Err(ProviderError::Exchange("invalid_grant".into()))
        }
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ExternalProfile, ProviderError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(token.secret(), "provider-access-token");
        Ok(self.profile.clone())
    }
}

/// In-memory directory keyed by email.
#[derive(Default)]
pub struct FakeDirectory {
    pub users: Mutex<Vec<User>>,
    pub inserts: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_user(id: &str, email: &str, role: &str) -> Self {
        let directory = Self::default();
        directory.users.lock().unwrap().push(User {
            id: id.into(),
            role: role.into(),
            name: None,
            email: Some(email.into()),
            created_at: None,
            updated_at: None,
        });
        directory
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(email.to_string()))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DirectoryError> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst);
        let record = User {
            id: format!("user-{}", n + 1),
            role: user.role.as_str().to_string(),
            name: Some(user.name),
            email: Some(user.email),
            created_at: None,
            updated_at: None,
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

/// A running app over fakes, with handles on every collaborator.
pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryStore,
    pub tokens: Arc<TokenService>,
    pub provider: Arc<FakeProvider>,
    pub directory: Arc<FakeDirectory>,
    pub config: Arc<AppConfig>,
}

pub fn test_app(provider: FakeProvider, directory: FakeDirectory) -> TestApp {
    test_app_with(test_config(), provider, directory)
}

pub fn test_app_with(
    config: AppConfig,
    provider: FakeProvider,
    directory: FakeDirectory,
) -> TestApp {
    let config = Arc::new(config);
    let store = MemoryStore::new();
    let tokens = Arc::new(TokenService::new(Arc::new(store.clone()), &config.jwt));
    let provider = Arc::new(provider);
    let directory = Arc::new(directory);

    let state = AuthState {
        config: config.clone(),
        tokens: tokens.clone(),
        provider: provider.clone(),
        identities: IdentityResolver::new(directory.clone()),
    };

    let server = TestServer::new(router(state)).expect("create test server");

    TestApp {
        server,
        store,
        tokens,
        provider,
        directory,
        config,
    }
}
