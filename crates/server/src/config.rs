use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Missing environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("Invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Url,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// How long a refresh token stays usable after it has been rotated.
    pub refresh_grace: Duration,
}

#[derive(Clone, Debug)]
pub struct GraphqlConfig {
    pub url: Url,
    pub admin_secret: String,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: i64,
}

impl RedisConfig {
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Application origin users land on after login; its host scopes the session cookie.
    pub redirect_url: Url,
    pub google: ProviderConfig,
    pub jwt: JwtConfig,
    pub graphql: GraphqlConfig,
    pub redis: RedisConfig,
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Domain for the refresh token cookie: the redirect host without its port.
    pub fn cookie_domain(&self) -> String {
        self.redirect_url.host_str().unwrap_or_default().to_string()
    }
}

enum Requirement {
    Required,
    Optional(Option<&'static str>),
}

struct Setting {
    name: &'static str,
    requirement: Requirement,
}

const fn required(name: &'static str) -> Setting {
    Setting {
        name,
        requirement: Requirement::Required,
    }
}

const fn optional(name: &'static str, default: Option<&'static str>) -> Setting {
    Setting {
        name,
        requirement: Requirement::Optional(default),
    }
}

const SETTINGS: &[Setting] = &[
    optional("PORT", Some("8080")),
    required("REDIRECT_URL"),
    required("AUTH_GOOGLE_ID"),
    required("AUTH_GOOGLE_SECRET"),
    required("AUTH_GOOGLE_REDIRECT_URL"),
    optional("AUTH_GOOGLE_AUTH_URL", Some(GOOGLE_AUTH_URL)),
    optional("AUTH_GOOGLE_TOKEN_URL", Some(GOOGLE_TOKEN_URL)),
    optional("AUTH_GOOGLE_USERINFO_URL", Some(GOOGLE_USERINFO_URL)),
    required("JWT_SECRET"),
    required("JWT_AUTH_TTL"),
    required("JWT_REFRESH_TTL"),
    optional("JWT_REFRESH_GRACE", Some("60")),
    required("GRAPHQL_URL"),
    required("GRAPHQL_SECRET"),
    optional("REDIS_HOST", Some("redis")),
    optional("REDIS_PORT", Some("6379")),
    optional("REDIS_PASSWORD", None),
    optional("REDIS_DB", Some("0")),
    optional("REQUEST_TIMEOUT", Some("30")),
];

/// Settings resolved against the table, with every problem collected.
struct Resolved {
    values: HashMap<&'static str, String>,
    errors: Vec<String>,
}

impl Resolved {
    fn string(&self, name: &'static str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    fn optional_string(&self, name: &'static str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn parse<T>(&mut self, name: &'static str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.values.get(name)?;
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(format!("{name}: {e}"));
                None
            }
        }
    }

    fn minutes(&mut self, name: &'static str) -> Option<Duration> {
        match self.parse::<u64>(name)? {
            0 => {
                self.errors.push(format!("{name}: must be greater than zero"));
                None
            }
            minutes => self.bounded(name, minutes.checked_mul(60)),
        }
    }

    fn seconds(&mut self, name: &'static str) -> Option<Duration> {
        let seconds = self.parse::<u64>(name)?;
        self.bounded(name, Some(seconds))
    }

    /// Durations must fit a signed 64-bit count of seconds, the range of Redis
    /// expiries and cookie max-age.
    fn bounded(&mut self, name: &'static str, seconds: Option<u64>) -> Option<Duration> {
        match seconds.filter(|s| i64::try_from(*s).is_ok()) {
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => {
                self.errors.push(format!("{name}: too large"));
                None
            }
        }
    }

    fn url(&mut self, name: &'static str) -> Option<Url> {
        let url = self.parse::<Url>(name)?;
        if url.host_str().is_none() {
            self.errors.push(format!("{name}: URL must have a host"));
            return None;
        }
        Some(url)
    }
}

/// Load configuration from the process environment, after seeding it from a
/// `.env` file when one is present.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_config(config::Environment::default())
}

/// Load configuration from an explicit set of variables instead of the process
/// environment.
pub fn load_config_from<I, K, V>(vars: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let source: config::Map<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    build_config(config::Environment::default().source(Some(source)))
}

fn build_config(environment: config::Environment) -> Result<AppConfig, ConfigError> {
    let cfg = config::Config::builder().add_source(environment).build()?;

    let mut values = HashMap::new();
    let mut missing = Vec::new();
    for setting in SETTINGS {
        // the Environment source lowercases keys
        match cfg.get_string(&setting.name.to_ascii_lowercase()) {
            Ok(value) => {
                values.insert(setting.name, value);
            }
            Err(config::ConfigError::NotFound(_)) => match setting.requirement {
                Requirement::Required => missing.push(setting.name),
                Requirement::Optional(Some(default)) => {
                    values.insert(setting.name, default.to_string());
                }
                Requirement::Optional(None) => {}
            },
            Err(e) => return Err(e.into()),
        }
    }
    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    let mut resolved = Resolved {
        values,
        errors: Vec::new(),
    };

    let port = resolved.parse::<u16>("PORT");
    let redirect_url = resolved.url("REDIRECT_URL");
    let google_redirect_url = resolved.url("AUTH_GOOGLE_REDIRECT_URL");
    let auth_url = resolved.url("AUTH_GOOGLE_AUTH_URL");
    let token_url = resolved.url("AUTH_GOOGLE_TOKEN_URL");
    let userinfo_url = resolved.url("AUTH_GOOGLE_USERINFO_URL");
    let access_ttl = resolved.minutes("JWT_AUTH_TTL");
    let refresh_ttl = resolved.minutes("JWT_REFRESH_TTL");
    let refresh_grace = resolved.seconds("JWT_REFRESH_GRACE");
    let graphql_url = resolved.url("GRAPHQL_URL");
    let redis_port = resolved.parse::<u16>("REDIS_PORT");
    let redis_db = resolved.parse::<i64>("REDIS_DB");
    let request_timeout = resolved.seconds("REQUEST_TIMEOUT");

    let secret = resolved.string("JWT_SECRET");
    if secret.is_empty() {
        resolved.errors.push("JWT_SECRET: must not be empty".into());
    }
    if matches!(redis_db, Some(db) if db < 0) {
        resolved.errors.push("REDIS_DB: must not be negative".into());
    }

    match (
        port,
        redirect_url,
        google_redirect_url,
        auth_url,
        token_url,
        userinfo_url,
        access_ttl,
        refresh_ttl,
        refresh_grace,
        graphql_url,
        redis_port,
        redis_db,
        request_timeout,
    ) {
        (
            Some(port),
            Some(redirect_url),
            Some(google_redirect_url),
            Some(auth_url),
            Some(token_url),
            Some(userinfo_url),
            Some(access_ttl),
            Some(refresh_ttl),
            Some(refresh_grace),
            Some(graphql_url),
            Some(redis_port),
            Some(redis_db),
            Some(request_timeout),
        ) if resolved.errors.is_empty() => Ok(AppConfig {
            port,
            redirect_url,
            google: ProviderConfig {
                client_id: resolved.string("AUTH_GOOGLE_ID"),
                client_secret: resolved.string("AUTH_GOOGLE_SECRET"),
                redirect_url: google_redirect_url,
                auth_url,
                token_url,
                userinfo_url,
            },
            jwt: JwtConfig {
                secret,
                access_ttl,
                refresh_ttl,
                refresh_grace,
            },
            graphql: GraphqlConfig {
                url: graphql_url,
                admin_secret: resolved.string("GRAPHQL_SECRET"),
            },
            redis: RedisConfig {
                host: resolved.string("REDIS_HOST"),
                port: redis_port,
                password: resolved.optional_string("REDIS_PASSWORD"),
                database: redis_db,
            },
            request_timeout,
        }),
        _ => Err(ConfigError::Validation(resolved.errors)),
    }
}
