//! Token storage adapter.
//!
//! [`TokenAdapter`] persists short-lived authorization artifacts for an
//! external OAuth/OIDC protocol engine. It never interprets payloads: they
//! are serialized on the way in, deserialized on the way out, and scanned
//! only for the `grantId`, `userCode` and `uid` cross-references that feed
//! the secondary indices.
//!
//! # Representation
//!
//! - Consumable kinds are stored as a field map with a `payload` field, so a
//!   `consumed` field can be attached later without rewriting the payload.
//! - Every other kind is stored as one serialized value.
//!
//! # Failure model
//!
//! Store failures surface to the caller unchanged; nothing is retried.
//! An adapter built with [`TokenAdapter::disabled`] fails every operation
//! with [`AdapterError::StoreUnavailable`].

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::AdapterResult;
use crate::entity::{CONSUMED_FIELD, CrossReferences, Entity, PAYLOAD_FIELD};
use crate::error::AdapterError;
use crate::index::IndexWriter;
use crate::keyspace;
use crate::kind::KindRegistry;
use crate::store::{Batch, DynStore, KeyTtl};

/// Longest expiry the adapter hands to the store, in seconds (about 142
/// million years). Longer `expires_in` values are clamped to it so the
/// millisecond deadline still fits a signed 64-bit integer.
pub const MAX_EXPIRES_IN: u64 = 1 << 52;

/// Storage adapter for authorization artifacts.
///
/// Cheap to clone; clones share the store handle and registry.
#[derive(Clone)]
pub struct TokenAdapter {
    store: Option<DynStore>,
    registry: Arc<KindRegistry>,
    indexes: IndexWriter,
}

impl std::fmt::Debug for TokenAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAdapter")
            .field("enabled", &self.is_enabled())
            .field("indexes", &self.indexes)
            .finish_non_exhaustive()
    }
}

impl TokenAdapter {
    /// Creates an adapter over an injected store handle.
    pub fn new(store: DynStore) -> Self {
        Self {
            store: Some(store),
            registry: Arc::new(KindRegistry::default()),
            indexes: IndexWriter::default(),
        }
    }

    /// Creates an adapter without a backing store.
    pub fn disabled() -> Self {
        Self {
            store: None,
            registry: Arc::new(KindRegistry::default()),
            indexes: IndexWriter::default(),
        }
    }

    /// Replaces the kind registry.
    #[must_use]
    pub fn with_registry(mut self, registry: KindRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Caps every grant index to its most recent `max` members.
    #[must_use]
    pub fn with_max_grant_entries(mut self, max: Option<usize>) -> Self {
        self.indexes = IndexWriter::new(max);
        self
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Returns a view of this adapter bound to one entity kind.
    pub fn for_kind(&self, kind: impl Into<String>) -> KindAdapter {
        KindAdapter {
            adapter: self.clone(),
            kind: kind.into(),
        }
    }

    pub(crate) fn store(&self) -> AdapterResult<&DynStore> {
        self.store.as_ref().ok_or(AdapterError::StoreUnavailable)
    }

    /// Creates or replaces a record and its index entries.
    ///
    /// The primary write and every index write go out as one batch. For
    /// consumable kinds only the `payload` field is written, so an existing
    /// `consumed` marker on the same id is preserved. `expires_in` above
    /// [`MAX_EXPIRES_IN`] is clamped.
    #[instrument(skip(self, payload))]
    pub async fn upsert(
        &self,
        kind: &str,
        id: &str,
        payload: &Value,
        expires_in: Option<u64>,
    ) -> AdapterResult<()> {
        let store = self.store()?;
        let key = keyspace::entity_key(kind, id);
        let traits = self.registry.traits(kind);
        let serialized = payload.to_string();
        let ttl = expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| secs.min(MAX_EXPIRES_IN));

        let mut batch = Batch::new();
        if traits.consumable {
            batch.hset(key.clone(), PAYLOAD_FIELD, serialized);
        } else {
            batch.set(key.clone(), serialized);
        }

        if let Some(secs) = ttl {
            batch.expire(key.clone(), secs);
        }

        let refs = CrossReferences::extract(payload);
        self.indexes.stage(&mut batch, &key, traits, &refs, ttl);

        store.execute(batch).await?;
        debug!(key = %key, "Upserted entity");
        Ok(())
    }

    /// Reads a record. Missing and expired records are both `None`.
    #[instrument(skip(self))]
    pub async fn find(&self, kind: &str, id: &str) -> AdapterResult<Option<Entity>> {
        let store = self.store()?;
        let key = keyspace::entity_key(kind, id);

        if !self.registry.is_consumable(kind) {
            return match store.get(&key).await? {
                Some(raw) => Ok(Some(Entity {
                    kind: kind.to_string(),
                    id: id.to_string(),
                    payload: decode_payload(&key, &raw)?,
                    consumed: None,
                })),
                None => Ok(None),
            };
        }

        let mut fields = store.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let raw = fields
            .remove(PAYLOAD_FIELD)
            .ok_or_else(|| AdapterError::decode(&key, "missing payload field"))?;
        let consumed = fields
            .get(CONSUMED_FIELD)
            .map(|value| {
                value.parse::<i64>().map_err(|e| {
                    AdapterError::decode(&key, format!("invalid consumed marker: {e}"))
                })
            })
            .transpose()?;

        Ok(Some(Entity {
            kind: kind.to_string(),
            id: id.to_string(),
            payload: decode_payload(&key, &raw)?,
            consumed,
        }))
    }

    /// Resolves the session index, then reads the record it points at.
    #[instrument(skip(self))]
    pub async fn find_by_uid(&self, uid: &str) -> AdapterResult<Option<Entity>> {
        self.find_by_pointer(&keyspace::uid_key(uid)).await
    }

    /// Resolves the user code index, then reads the record it points at.
    #[instrument(skip_all)]
    pub async fn find_by_user_code(&self, user_code: &str) -> AdapterResult<Option<Entity>> {
        let pointer = keyspace::user_code_key(user_code);
        self.find_by_pointer(&pointer).await
    }

    async fn find_by_pointer(&self, pointer_key: &str) -> AdapterResult<Option<Entity>> {
        let store = self.store()?;
        let Some(primary_key) = store.get(pointer_key).await? else {
            debug!(pointer = %pointer_key, "Index miss");
            return Ok(None);
        };

        let Some((kind, id)) = keyspace::split_entity_key(&primary_key) else {
            warn!(pointer = %pointer_key, target = %primary_key, "Malformed index pointer");
            return Err(AdapterError::decode(
                pointer_key,
                format!("malformed primary key: {primary_key}"),
            ));
        };

        self.find(kind, id).await
    }

    /// Deletes a record. Absent records are a no-op.
    ///
    /// Index entries pointing at the record are left to expire on their own.
    #[instrument(skip(self))]
    pub async fn destroy(&self, kind: &str, id: &str) -> AdapterResult<()> {
        let store = self.store()?;
        let mut batch = Batch::new();
        batch.del(keyspace::entity_key(kind, id));
        store.execute(batch).await?;
        Ok(())
    }

    /// Marks a consumable record as consumed, leaving its payload untouched.
    ///
    /// Consuming an absent record does nothing. Repeated calls overwrite the
    /// marker with the latest timestamp.
    #[instrument(skip(self))]
    pub async fn consume(&self, kind: &str, id: &str) -> AdapterResult<()> {
        let store = self.store()?;
        if !self.registry.is_consumable(kind) {
            return Err(AdapterError::invalid_operation(format!(
                "{kind} is not a consumable kind"
            )));
        }

        let key = keyspace::entity_key(kind, id);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let written = store
            .hset_if_exists(&key, CONSUMED_FIELD, &now.to_string())
            .await?;
        if !written {
            debug!(key = %key, "Consume on absent record ignored");
        }
        Ok(())
    }

    /// Remaining lifetime of a grant index.
    #[instrument(skip(self))]
    pub async fn grant_ttl(&self, grant_id: &str) -> AdapterResult<KeyTtl> {
        let store = self.store()?;
        Ok(store.ttl(&keyspace::grant_key(grant_id)).await?)
    }

    /// Checks that the backing store is reachable.
    pub async fn ping(&self) -> AdapterResult<()> {
        self.store()?.ping().await?;
        Ok(())
    }
}

fn decode_payload(key: &str, raw: &str) -> AdapterResult<Value> {
    serde_json::from_str(raw).map_err(|e| AdapterError::decode(key, e.to_string()))
}

/// A [`TokenAdapter`] bound to one entity kind.
///
/// Mirrors how the protocol engine addresses storage: one adapter instance
/// per model name.
#[derive(Debug, Clone)]
pub struct KindAdapter {
    adapter: TokenAdapter,
    kind: String,
}

impl KindAdapter {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub async fn upsert(
        &self,
        id: &str,
        payload: &Value,
        expires_in: Option<u64>,
    ) -> AdapterResult<()> {
        self.adapter.upsert(&self.kind, id, payload, expires_in).await
    }

    pub async fn find(&self, id: &str) -> AdapterResult<Option<Entity>> {
        self.adapter.find(&self.kind, id).await
    }

    pub async fn find_by_uid(&self, uid: &str) -> AdapterResult<Option<Entity>> {
        self.adapter.find_by_uid(uid).await
    }

    pub async fn find_by_user_code(&self, user_code: &str) -> AdapterResult<Option<Entity>> {
        self.adapter.find_by_user_code(user_code).await
    }

    pub async fn destroy(&self, id: &str) -> AdapterResult<()> {
        self.adapter.destroy(&self.kind, id).await
    }

    pub async fn consume(&self, id: &str) -> AdapterResult<()> {
        self.adapter.consume(&self.kind, id).await
    }

    pub async fn revoke_by_grant_id(&self, grant_id: &str) -> AdapterResult<()> {
        self.adapter.revoke_by_grant_id(grant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_adapter_fails_every_operation() {
        let adapter = TokenAdapter::disabled();
        assert!(!adapter.is_enabled());

        let payload = json!({ "grantId": "g1" });
        assert!(
            adapter
                .upsert("AccessToken", "a1", &payload, Some(60))
                .await
                .unwrap_err()
                .is_store_unavailable()
        );
        assert!(adapter.find("AccessToken", "a1").await.unwrap_err().is_store_unavailable());
        assert!(adapter.find_by_uid("u1").await.unwrap_err().is_store_unavailable());
        assert!(
            adapter
                .find_by_user_code("ABCD")
                .await
                .unwrap_err()
                .is_store_unavailable()
        );
        assert!(adapter.destroy("AccessToken", "a1").await.unwrap_err().is_store_unavailable());
        assert!(
            adapter
                .consume("AuthorizationCode", "c1")
                .await
                .unwrap_err()
                .is_store_unavailable()
        );
        assert!(adapter.revoke_by_grant_id("g1").await.unwrap_err().is_store_unavailable());
        assert!(adapter.ping().await.unwrap_err().is_store_unavailable());
    }

    #[test]
    fn test_decode_payload_rejects_garbage() {
        let err = decode_payload("Session:s1", "{not json").unwrap_err();
        assert!(err.is_decode());
        assert_eq!(decode_payload("Session:s1", "{\"a\":1}").unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn test_for_kind_binds_kind() {
        let adapter = TokenAdapter::disabled();
        assert_eq!(adapter.for_kind("RefreshToken").kind(), "RefreshToken");
    }
}
