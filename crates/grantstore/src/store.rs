//! Backing key-value store abstraction.
//!
//! The adapter needs a small command surface: scalar get/set with expiry,
//! field maps, lists, key deletion, TTL queries and ordered batch submission.
//! Backends implement [`KeyValueStore`]; the adapter never talks to a client
//! library directly.
//!
//! # Batches
//!
//! A [`Batch`] is applied in the order its commands were pushed and is
//! submitted in one round trip. Backends should apply it atomically when the
//! store supports it (Redis `MULTI`/`EXEC`), but callers must not rely on
//! isolation between a batch and reads issued before it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shared store trait object.
pub type DynStore = Arc<dyn KeyValueStore>;

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key expires in the given number of seconds.
    Expires(u64),
}

impl KeyTtl {
    /// Maps the integer convention used by Redis `TTL`
    /// (`-2` missing, `-1` persistent).
    pub fn from_redis(ttl: i64) -> Self {
        match ttl {
            -2 => Self::Missing,
            ttl if ttl < 0 => Self::Persistent,
            ttl => Self::Expires(ttl as u64),
        }
    }

    /// Returns `true` if an expiry of `seconds` outlives this TTL.
    ///
    /// A missing key compares below any positive expiry. A persistent key
    /// already outlives every finite expiry.
    pub fn is_shorter_than(&self, seconds: u64) -> bool {
        match self {
            Self::Missing => seconds > 0,
            Self::Persistent => false,
            Self::Expires(remaining) => seconds > *remaining,
        }
    }
}

/// One write command inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set a scalar value, replacing whatever the key held.
    Set { key: String, value: String },
    /// Set fields of a field map, leaving other fields untouched.
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Set the key's expiry unconditionally.
    Expire { key: String, seconds: u64 },
    /// Append a value to the end of a list.
    RPush { key: String, value: String },
    /// Append a value to the end of a list and extend the list's expiry so
    /// it covers a member living `seconds` (`None` never expires).
    ///
    /// The list's TTL is read before the push and decides the update:
    ///
    /// - missing: the new list expires in `seconds`, or never
    /// - persistent: left as is
    /// - expiring: extended to `seconds` if that is longer, made persistent
    ///   for `None`, otherwise left as is
    ///
    /// The read, push and update happen as one atomic step on the store side.
    RPushExtend {
        key: String,
        value: String,
        seconds: Option<u64>,
    },
    /// Keep only the list elements in `start..=stop` (negative indices count
    /// from the end).
    LTrim { key: String, start: i64, stop: i64 },
    /// Delete a key of any type.
    Del { key: String },
}

impl Command {
    /// The key this command writes to.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. }
            | Self::HSet { key, .. }
            | Self::Expire { key, .. }
            | Self::RPush { key, .. }
            | Self::RPushExtend { key, .. }
            | Self::LTrim { key, .. }
            | Self::Del { key } => key,
        }
    }
}

/// Ordered list of commands submitted together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn hset(
        &mut self,
        key: impl Into<String>,
        field: &str,
        value: impl Into<String>,
    ) -> &mut Self {
        self.push(Command::HSet {
            key: key.into(),
            fields: vec![(field.to_string(), value.into())],
        })
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: u64) -> &mut Self {
        self.push(Command::Expire {
            key: key.into(),
            seconds,
        })
    }

    pub fn rpush(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Command::RPush {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn rpush_extend(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        seconds: Option<u64>,
    ) -> &mut Self {
        self.push(Command::RPushExtend {
            key: key.into(),
            value: value.into(),
            seconds,
        })
    }

    pub fn ltrim(&mut self, key: impl Into<String>, start: i64, stop: i64) -> &mut Self {
        self.push(Command::LTrim {
            key: key.into(),
            start,
            stop,
        })
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Command::Del { key: key.into() })
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

/// Command surface the token adapter requires from its backing store.
///
/// All keys passed here are logical keys; a backend may apply its own
/// namespace prefix on the wire.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a scalar value. Missing or expired keys yield `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Reads every field of a field map. Missing keys yield an empty map.
    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Sets one field of an existing field map.
    ///
    /// Returns `false` without writing when the key does not exist.
    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;

    /// Reads the remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Reads a whole list. Missing keys yield an empty list.
    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Applies a batch of commands in order, in one round trip.
    async fn execute(&self, batch: Batch) -> StoreResult<()>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_from_redis() {
        assert_eq!(KeyTtl::from_redis(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_redis(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_redis(0), KeyTtl::Expires(0));
        assert_eq!(KeyTtl::from_redis(3600), KeyTtl::Expires(3600));
    }

    #[test]
    fn test_key_ttl_is_shorter_than() {
        assert!(KeyTtl::Missing.is_shorter_than(1));
        assert!(!KeyTtl::Missing.is_shorter_than(0));
        assert!(!KeyTtl::Persistent.is_shorter_than(1));
        assert!(!KeyTtl::Persistent.is_shorter_than(u64::MAX));
        assert!(KeyTtl::Expires(3600).is_shorter_than(7200));
        assert!(!KeyTtl::Expires(7200).is_shorter_than(3600));
        assert!(!KeyTtl::Expires(3600).is_shorter_than(3600));
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = Batch::new();
        batch
            .set("a", "1")
            .expire("a", 10)
            .rpush_extend("grant:g", "a", Some(10))
            .ltrim("grant:g", -5, -1)
            .del("b");

        assert_eq!(batch.len(), 5);
        let keys: Vec<&str> = batch.commands().iter().map(Command::key).collect();
        assert_eq!(keys, ["a", "a", "grant:g", "grant:g", "b"]);
    }
}
