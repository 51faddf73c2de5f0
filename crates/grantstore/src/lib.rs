//! # grantstore
//!
//! TTL-aware storage for short-lived OAuth/OIDC artifacts: access tokens,
//! authorization codes, refresh tokens, device codes, backchannel requests,
//! sessions and related records.
//!
//! This crate holds the adapter logic and the [`KeyValueStore`] abstraction.
//! Store implementations live in separate crates:
//!
//! - `grantstore-redis` - Redis backend over a `deadpool-redis` pool
//! - `grantstore-memory` - in-process backend with a controllable clock
//!
//! ## Overview
//!
//! - [`keyspace`] derives store keys from kinds, ids and index names.
//! - [`KindRegistry`] declares which kinds are consumable and grantable.
//! - [`TokenAdapter`] upserts, finds, destroys and consumes records.
//! - [`IndexWriter`] maintains the grant, user code and session indices.
//! - [`TokenAdapter::revoke_by_grant_id`] deletes a whole grant's records.
//!
//! ## Example
//!
//! ```ignore
//! use grantstore::TokenAdapter;
//! use serde_json::json;
//!
//! async fn issue(adapter: &TokenAdapter) -> grantstore::AdapterResult<()> {
//!     let payload = json!({ "grantId": "g1", "accountId": "alice" });
//!     adapter.upsert("AccessToken", "at-1", &payload, Some(3600)).await?;
//!
//!     let token = adapter.find("AccessToken", "at-1").await?;
//!     assert!(token.is_some());
//!
//!     adapter.revoke_by_grant_id("g1").await
//! }
//! ```

mod adapter;
pub mod config;
mod entity;
mod error;
mod index;
pub mod keyspace;
mod kind;
mod revocation;
mod store;

pub use adapter::{KindAdapter, MAX_EXPIRES_IN, TokenAdapter};
pub use config::{GrantstoreConfig, LoggingConfig, StoreConfig};
pub use entity::{
    CONSUMED_FIELD, CrossReferences, Entity, GRANT_ID_FIELD, PAYLOAD_FIELD, UID_FIELD,
    USER_CODE_FIELD,
};
pub use error::{AdapterError, ErrorCategory, StoreError};
pub use index::IndexWriter;
pub use kind::{KindRegistry, KindTraits};
pub use store::{Batch, Command, DynStore, KeyTtl, KeyValueStore, StoreResult};

/// Type alias for an adapter result.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use grantstore::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AdapterError, AdapterResult, Entity, KeyTtl, KeyValueStore, KindAdapter, KindRegistry,
        TokenAdapter,
    };
}
