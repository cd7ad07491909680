use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use session_auth::AuthState;
use session_auth::api::start_webserver;
use session_auth::config::load_config;
use session_auth::directory::GraphqlDirectory;
use session_auth::identity::IdentityResolver;
use session_auth::provider::GoogleProvider;
use session_auth::store::{CredentialStore, RedisStore};
use session_auth::token::TokenService;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "session_auth=info,tower_http=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer().with_target(true).with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    let config = Arc::new(load_config()?);

    // Outbound client shared by the provider and the directory
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(config.request_timeout)
        .build()
        .wrap_err("Failed to build HTTP client")?;

    let store = RedisStore::connect(&config.redis)
        .await
        .wrap_err("Failed to connect to Redis")?;
    store.ping().await.wrap_err("Redis did not answer PING")?;

    let tokens = TokenService::new(Arc::new(store), &config.jwt);
    let provider = GoogleProvider::new(http.clone(), &config.google);
    let directory = GraphqlDirectory::new(http, &config.graphql);

    let state = AuthState {
        config,
        tokens: Arc::new(tokens),
        provider: Arc::new(provider),
        identities: IdentityResolver::new(Arc::new(directory)),
    };

    start_webserver(state).await
}
