//! Redis implementation of [`KeyValueStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_redis::Pool;
use grantstore::{Batch, Command, KeyTtl, KeyValueStore, StoreError, StoreResult};
use redis::{AsyncCommands, RedisError, Script};

/// Appends `ARGV[1]` to the list at `KEYS[1]` and extends the list's expiry
/// to `ARGV[2]` seconds. `ARGV[2] == 0` stands for a member that never
/// expires and makes the list persistent. A persistent list is never given
/// an expiry.
const RPUSH_EXTEND_LUA: &str = r#"
local ttl = redis.call('TTL', KEYS[1])
redis.call('RPUSH', KEYS[1], ARGV[1])
local seconds = tonumber(ARGV[2])
if seconds == 0 then
    if ttl >= 0 then
        redis.call('PERSIST', KEYS[1])
    end
    return 0
end
if ttl == -2 or (ttl >= 0 and seconds > ttl) then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Sets one hash field only if the hash already exists.
const HSET_IF_EXISTS_LUA: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
"#;

fn command_error(e: RedisError) -> StoreError {
    StoreError::command(e.to_string())
}

/// `EXPIRE` takes a signed count; larger values are left for Redis to reject.
fn expire_arg(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

/// Redis-backed key-value store.
///
/// Batches are sent as one `MULTI`/`EXEC` pipeline. Every key is namespaced
/// with `key_prefix` on the wire; values stored inside lists are logical keys
/// and stay unprefixed.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    key_prefix: String,
    hset_if_exists: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl RedisStore {
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
            hset_if_exists: Script::new(HSET_IF_EXISTS_LUA),
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    async fn connection(&self) -> StoreResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            StoreError::connection(e.to_string())
        })
    }

    fn pipeline(&self, batch: Batch) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in batch.into_commands() {
            match command {
                Command::Set { key, value } => {
                    pipe.set(self.key(&key), value).ignore();
                }
                Command::HSet { key, fields } => {
                    let key = self.key(&key);
                    pipe.hset_multiple(key, fields.as_slice()).ignore();
                }
                Command::Expire { key, seconds } => {
                    pipe.expire(self.key(&key), expire_arg(seconds)).ignore();
                }
                Command::RPush { key, value } => {
                    pipe.rpush(self.key(&key), value).ignore();
                }
                Command::RPushExtend {
                    key,
                    value,
                    seconds,
                } => {
                    pipe.cmd("EVAL")
                        .arg(RPUSH_EXTEND_LUA)
                        .arg(1)
                        .arg(self.key(&key))
                        .arg(value)
                        .arg(seconds.map_or(0, expire_arg))
                        .ignore();
                }
                Command::LTrim { key, start, stop } => {
                    pipe.ltrim(self.key(&key), start as isize, stop as isize)
                        .ignore();
                }
                Command::Del { key } => {
                    pipe.del(self.key(&key)).ignore();
                }
            }
        }
        pipe
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(command_error)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        conn.hgetall::<_, HashMap<String, String>>(self.key(key))
            .await
            .map_err(command_error)
    }

    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let written: i64 = self
            .hset_if_exists
            .key(self.key(key))
            .arg(field)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(written == 1)
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut conn = self.connection().await?;
        let ttl = conn
            .ttl::<_, i64>(self.key(key))
            .await
            .map_err(command_error)?;
        Ok(KeyTtl::from_redis(ttl))
    }

    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.lrange::<_, Vec<String>>(self.key(key), 0, -1)
            .await
            .map_err(command_error)
    }

    async fn execute(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let commands = batch.len();
        let pipe = self.pipeline(batch);
        let mut conn = self.connection().await?;
        let _: () = pipe.query_async(&mut conn).await.map_err(|e| {
            tracing::warn!(error = %e, commands, "Redis pipeline failed");
            command_error(e)
        })?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire_arg_clamps_to_signed_range() {
        assert_eq!(expire_arg(60), 60);
        assert_eq!(expire_arg(i64::MAX as u64), i64::MAX);
        assert_eq!(expire_arg(u64::MAX), i64::MAX);
    }
}
