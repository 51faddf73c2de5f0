//! Redis backend for the `grantstore` token adapter.
//!
//! ## Wire layout
//!
//! | Logical key        | Redis type | Contents                                  |
//! |--------------------|------------|-------------------------------------------|
//! | `Kind:id`          | string     | serialized payload (non-consumable kinds) |
//! | `Kind:id`          | hash       | `payload`, `consumed` (consumable kinds)  |
//! | `grant:<grantId>`  | list       | logical primary keys issued under a grant |
//! | `userCode:<code>`  | string     | logical primary key                       |
//! | `uid:<uid>`        | string     | logical primary key                       |
//!
//! Every key is written under the configured prefix (default `oidc:`).

mod store;

use std::sync::Arc;

use grantstore::{AdapterError, AdapterResult, StoreConfig, StoreError, TokenAdapter};

pub use store::RedisStore;

/// Create a Redis connection pool from configuration.
pub fn create_pool(url: &str, config: &StoreConfig) -> AdapterResult<deadpool_redis::Pool> {
    let mut redis_config = deadpool_redis::Config::from_url(url);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(config.timeout());
    pool_config.timeouts.create = Some(config.timeout());
    pool_config.timeouts.recycle = Some(config.timeout());

    redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| AdapterError::configuration(format!("failed to create Redis pool: {e}")))
}

/// Create a token adapter based on configuration.
///
/// - **No URL**: returns a disabled adapter; every call fails with
///   `StoreUnavailable`.
/// - **URL set**: connects to Redis and checks the connection once. Unlike a
///   cache, the adapter does not fall back to anything when Redis is down.
pub async fn create_adapter(config: &StoreConfig) -> AdapterResult<TokenAdapter> {
    let Some(url) = config.url.as_deref() else {
        tracing::info!("No store URL configured, token adapter disabled");
        return Ok(TokenAdapter::disabled());
    };

    let pool = create_pool(url, config)?;
    if let Err(e) = pool.get().await {
        tracing::error!(error = %e, "Failed to connect to Redis");
        return Err(StoreError::connection(e.to_string()).into());
    }
    tracing::info!(prefix = %config.key_prefix, "Connected to Redis");

    let store = RedisStore::new(pool, config.key_prefix.clone());
    Ok(TokenAdapter::new(Arc::new(store)).with_max_grant_entries(config.max_grant_entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_adapter_without_url_is_disabled() {
        let adapter = create_adapter(&StoreConfig::default()).await.unwrap();
        assert!(!adapter.is_enabled());
    }

    #[tokio::test]
    async fn test_create_pool_applies_size() {
        let config = StoreConfig {
            pool_size: 3,
            ..StoreConfig::default()
        };
        let pool = create_pool("redis://127.0.0.1:6379", &config).unwrap();
        assert_eq!(pool.status().max_size, 3);
    }
}
