use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grantstore::{Batch, Command, KeyTtl, KeyValueStore, StoreError, StoreResult};
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Scalar(String),
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "string",
            Self::Hash(_) => "hash",
            Self::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    /// Clock time in milliseconds at which the key disappears.
    expires_at: Option<u64>,
}

fn wrong_type(key: &str, found: &Value) -> StoreError {
    StoreError::command(format!(
        "WRONGTYPE operation against key {key} holding a {}",
        found.type_name()
    ))
}

/// In-process key-value store with Redis-like expiry semantics.
///
/// A single mutex guards the keyspace, so every [`Batch`] is applied
/// atomically. Expired keys are dropped lazily when touched.
///
/// Deviations from Redis: a failing command aborts the rest of its batch
/// (commands before it stay applied), and TTLs are tracked in milliseconds
/// of the injected [`Clock`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Slot>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Creates an empty store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Creates an empty store driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        self.data
            .lock()
            .values()
            .filter(|slot| !is_expired(slot, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the key exists and has not expired.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        live(&mut data, key, now).is_some()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_expired(slot: &Slot, now: u64) -> bool {
    slot.expires_at.is_some_and(|at| at <= now)
}

/// Looks up a key, evicting it first if it has expired.
fn live<'a>(data: &'a mut HashMap<String, Slot>, key: &str, now: u64) -> Option<&'a mut Slot> {
    if data.get(key).is_some_and(|slot| is_expired(slot, now)) {
        data.remove(key);
    }
    data.get_mut(key)
}

fn remaining_secs(expires_at: Option<u64>, now: u64) -> KeyTtl {
    match expires_at {
        None => KeyTtl::Persistent,
        // Rounded to the nearest second, as Redis does.
        Some(at) => KeyTtl::Expires(at.saturating_sub(now).saturating_add(500) / 1000),
    }
}

/// Deadline `seconds` from `now`, saturating at the end of the clock.
fn deadline(now: u64, seconds: u64) -> u64 {
    now.saturating_add(seconds.saturating_mul(1000))
}

fn apply(data: &mut HashMap<String, Slot>, command: Command, now: u64) -> StoreResult<()> {
    match command {
        Command::Set { key, value } => {
            data.insert(
                key,
                Slot {
                    value: Value::Scalar(value),
                    expires_at: None,
                },
            );
        }
        Command::HSet { key, fields } => match live(data, &key, now) {
            Some(Slot {
                value: Value::Hash(map),
                ..
            }) => map.extend(fields),
            Some(slot) => return Err(wrong_type(&key, &slot.value)),
            None => {
                data.insert(
                    key,
                    Slot {
                        value: Value::Hash(fields.into_iter().collect()),
                        expires_at: None,
                    },
                );
            }
        },
        Command::Expire { key, seconds } => {
            if seconds == 0 {
                data.remove(&key);
            } else if let Some(slot) = live(data, &key, now) {
                slot.expires_at = Some(deadline(now, seconds));
            }
        }
        Command::RPush { key, value } => match live(data, &key, now) {
            Some(Slot {
                value: Value::List(list),
                ..
            }) => list.push(value),
            Some(slot) => return Err(wrong_type(&key, &slot.value)),
            None => {
                data.insert(
                    key,
                    Slot {
                        value: Value::List(vec![value]),
                        expires_at: None,
                    },
                );
            }
        },
        Command::RPushExtend {
            key,
            value,
            seconds,
        } => match live(data, &key, now) {
            Some(Slot {
                value: Value::List(list),
                expires_at,
            }) => {
                list.push(value);
                let current = remaining_secs(*expires_at, now);
                match seconds {
                    None => *expires_at = None,
                    Some(seconds) if current.is_shorter_than(seconds) => {
                        *expires_at = Some(deadline(now, seconds));
                    }
                    Some(_) => {}
                }
            }
            Some(slot) => return Err(wrong_type(&key, &slot.value)),
            None => {
                data.insert(
                    key,
                    Slot {
                        value: Value::List(vec![value]),
                        expires_at: seconds.map(|seconds| deadline(now, seconds)),
                    },
                );
            }
        },
        Command::LTrim { key, start, stop } => {
            let emptied = match live(data, &key, now) {
                Some(Slot {
                    value: Value::List(list),
                    ..
                }) => {
                    trim(list, start, stop);
                    list.is_empty()
                }
                Some(slot) => return Err(wrong_type(&key, &slot.value)),
                None => false,
            };
            if emptied {
                data.remove(&key);
            }
        }
        Command::Del { key } => {
            data.remove(&key);
        }
    }
    Ok(())
}

/// Redis `LTRIM` index normalization.
fn trim(list: &mut Vec<String>, start: i64, stop: i64) {
    let len = list.len() as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        list.clear();
        return;
    }
    list.truncate(stop as usize + 1);
    list.drain(..start as usize);
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        match live(&mut data, key, now) {
            Some(Slot {
                value: Value::Scalar(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(slot) => Err(wrong_type(key, &slot.value)),
            None => Ok(None),
        }
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        match live(&mut data, key, now) {
            Some(Slot {
                value: Value::Hash(map),
                ..
            }) => Ok(map.clone()),
            Some(slot) => Err(wrong_type(key, &slot.value)),
            None => Ok(HashMap::new()),
        }
    }

    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        match live(&mut data, key, now) {
            Some(Slot {
                value: Value::Hash(map),
                ..
            }) => {
                map.insert(field.to_string(), value.to_string());
                Ok(true)
            }
            Some(slot) => Err(wrong_type(key, &slot.value)),
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        Ok(live(&mut data, key, now)
            .map(|slot| remaining_secs(slot.expires_at, now))
            .unwrap_or(KeyTtl::Missing))
    }

    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        match live(&mut data, key, now) {
            Some(Slot {
                value: Value::List(list),
                ..
            }) => Ok(list.clone()),
            Some(slot) => Err(wrong_type(key, &slot.value)),
            None => Ok(Vec::new()),
        }
    }

    async fn execute(&self, batch: Batch) -> StoreResult<()> {
        let now = self.clock.now_millis();
        let mut data = self.data.lock();
        for command in batch.into_commands() {
            apply(&mut data, command, now)?;
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn store() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new();
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_set_get_and_expire() {
        let (store, clock) = store();
        let mut batch = Batch::new();
        batch.set("k", "v").expire("k", 1);
        store.execute(batch).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Expires(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_set_clears_previous_ttl() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch.set("k", "v1").expire("k", 10).set("k", "v2");
        store.execute(batch).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_hset_merges_fields() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch.hset("h", "payload", "{}");
        store.execute(batch).await.unwrap();

        assert!(store.hset_if_exists("h", "consumed", "1").await.unwrap());
        let mut batch = Batch::new();
        batch.hset("h", "payload", "{\"a\":1}");
        store.execute(batch).await.unwrap();

        let fields = store.hgetall("h").await.unwrap();
        assert_eq!(fields.get("payload").map(String::as_str), Some("{\"a\":1}"));
        assert_eq!(fields.get("consumed").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_hset_if_exists_skips_missing_key() {
        let (store, _clock) = store();
        assert!(!store.hset_if_exists("h", "consumed", "1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rpush_extend_only_grows() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch
            .rpush_extend("l", "a", Some(3600))
            .rpush_extend("l", "b", Some(60));
        store.execute(batch).await.unwrap();
        assert_eq!(store.ttl("l").await.unwrap(), KeyTtl::Expires(3600));

        let mut batch = Batch::new();
        batch.rpush_extend("l", "c", Some(7200));
        store.execute(batch).await.unwrap();
        assert_eq!(store.ttl("l").await.unwrap(), KeyTtl::Expires(7200));
        assert_eq!(store.lrange_all("l").await.unwrap(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_rpush_extend_never_shortens_persistent_list() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch
            .rpush_extend("l", "forever", None)
            .rpush_extend("l", "short", Some(60));
        store.execute(batch).await.unwrap();
        assert_eq!(store.ttl("l").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_rpush_extend_without_expiry_persists_list() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch
            .rpush_extend("l", "short", Some(60))
            .rpush_extend("l", "forever", None);
        store.execute(batch).await.unwrap();
        assert_eq!(store.ttl("l").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_rpush_extend_rejects_wrong_type() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch.set("k", "v").rpush_extend("k", "a", Some(60));
        assert!(store.execute(batch).await.is_err());
    }

    #[tokio::test]
    async fn test_huge_expiry_saturates() {
        let (store, clock) = store();
        clock.advance(Duration::from_secs(10));
        let mut batch = Batch::new();
        batch
            .set("k", "v")
            .expire("k", u64::MAX)
            .rpush_extend("l", "a", Some(u64::MAX));
        store.execute(batch).await.unwrap();

        let expected = KeyTtl::Expires((u64::MAX - 10_000 + 500) / 1000);
        assert_eq!(store.ttl("k").await.unwrap(), expected);
        assert_eq!(store.ttl("l").await.unwrap(), expected);
        assert!(store.contains_key("k"));
    }

    #[tokio::test]
    async fn test_wrong_type_is_an_error() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        batch.set("k", "v");
        store.execute(batch).await.unwrap();
        assert!(store.hgetall("k").await.is_err());
        assert!(store.lrange_all("k").await.is_err());
    }

    #[test]
    fn test_trim_keeps_tail() {
        let mut list: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
        trim(&mut list, -2, -1);
        assert_eq!(list, ["4", "5"]);

        let mut list: Vec<String> = (1..=2).map(|i| i.to_string()).collect();
        trim(&mut list, -10, -1);
        assert_eq!(list, ["1", "2"]);

        let mut list: Vec<String> = (1..=3).map(|i| i.to_string()).collect();
        trim(&mut list, 5, 10);
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_ltrim_caps_list() {
        let (store, _clock) = store();
        let mut batch = Batch::new();
        for i in 0..5 {
            batch.rpush("l", i.to_string()).ltrim("l", -3, -1);
        }
        store.execute(batch).await.unwrap();
        assert_eq!(store.lrange_all("l").await.unwrap(), ["2", "3", "4"]);
    }
}
