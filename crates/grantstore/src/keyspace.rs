//! Store key derivation.
//!
//! Keys are built verbatim from caller-supplied identifiers. The kind is part
//! of every primary key, so identical ids of different kinds never collide.

/// Primary key of a stored entity: `kind:id`.
pub fn entity_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Key of the grant index listing every primary key issued under a grant.
pub fn grant_key(grant_id: &str) -> String {
    format!("grant:{grant_id}")
}

/// Key of the pointer from a device flow user code to its primary key.
pub fn user_code_key(user_code: &str) -> String {
    format!("userCode:{user_code}")
}

/// Key of the pointer from a session uid to its primary key.
pub fn uid_key(uid: &str) -> String {
    format!("uid:{uid}")
}

/// Splits a primary key back into `(kind, id)`.
///
/// Kind names must not contain `:` ([`KindRegistry::with_kind`] rejects
/// them), so the split happens at the first one and the id keeps any colons
/// of its own.
///
/// [`KindRegistry::with_kind`]: crate::KindRegistry::with_kind
pub fn split_entity_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(':')
        .filter(|(kind, id)| !kind.is_empty() && !id.is_empty())
}
