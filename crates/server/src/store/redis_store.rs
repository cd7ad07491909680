use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, ExpireOption, aio::ConnectionManager};

use crate::config::RedisConfig;
use crate::error::StoreError;
use crate::store::CredentialStore;

/// Redis-backed store over an auto-reconnecting multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

fn unavailable(operation: &'static str) -> impl FnOnce(redis::RedisError) -> StoreError {
    move |source| StoreError::Unavailable { operation, source }
}

/// Redis rejects an expiry of zero, so sub-second TTLs round up to one second.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// `EXPIRE key seconds LT`, which needs Redis 7.0 or newer.
fn shorten_expiry_cmd(key: &str, ttl: Duration) -> redis::Cmd {
    let seconds = i64::try_from(ttl_seconds(ttl)).unwrap_or(i64::MAX);
    let mut cmd = redis::cmd("EXPIRE");
    cmd.arg(key).arg(seconds).arg(ExpireOption::LT);
    cmd
}

impl RedisStore {
    #[tracing::instrument(skip(config), fields(host = %config.host, port = config.port, db = config.database))]
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.connection_url()).map_err(unavailable("open"))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(unavailable("connect"))?;
        tracing::info!("Connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl))
            .await
            .map_err(unavailable("set"))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(unavailable("get"))
    }

    async fn shorten_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let changed = shorten_expiry_cmd(key, ttl)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(unavailable("expire"))?;
        Ok(changed == 1)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await.map_err(unavailable("delete"))?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(unavailable("ping"))
    }
}
