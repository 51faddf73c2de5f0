//! Entity kind registry.
//!
//! Every representation and index-participation decision consults one
//! lookup table instead of repeating set-membership checks at call sites.

use std::collections::HashMap;

use crate::AdapterResult;
use crate::error::AdapterError;

/// Storage traits of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KindTraits {
    /// Supports a one-time-use `consumed` marker; stored as a field map.
    pub consumable: bool,
    /// Participates in the grant index and is removed by grant revocation.
    pub grantable: bool,
}

impl KindTraits {
    /// Neither consumable nor grantable.
    pub const PLAIN: Self = Self {
        consumable: false,
        grantable: false,
    };

    /// Grantable but not consumable.
    pub const GRANTABLE: Self = Self {
        consumable: false,
        grantable: true,
    };

    /// Both consumable and grantable.
    pub const CONSUMABLE_GRANTABLE: Self = Self {
        consumable: true,
        grantable: true,
    };
}

/// Kinds known to the default registry and their traits.
const DEFAULT_KINDS: &[(&str, KindTraits)] = &[
    ("Session", KindTraits::PLAIN),
    ("AccessToken", KindTraits::GRANTABLE),
    ("AuthorizationCode", KindTraits::CONSUMABLE_GRANTABLE),
    ("RefreshToken", KindTraits::CONSUMABLE_GRANTABLE),
    ("DeviceCode", KindTraits::CONSUMABLE_GRANTABLE),
    ("BackchannelAuthenticationRequest", KindTraits::CONSUMABLE_GRANTABLE),
    ("ClientCredentials", KindTraits::PLAIN),
    ("Client", KindTraits::PLAIN),
    ("InitialAccessToken", KindTraits::PLAIN),
    ("RegistrationAccessToken", KindTraits::PLAIN),
    ("Interaction", KindTraits::PLAIN),
    ("ReplayDetection", KindTraits::PLAIN),
    ("PushedAuthorizationRequest", KindTraits::PLAIN),
    ("Grant", KindTraits::PLAIN),
];

/// Lookup table from kind name to [`KindTraits`].
///
/// Unknown kinds resolve to [`KindTraits::PLAIN`].
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, KindTraits>,
}

impl KindRegistry {
    /// Creates an empty registry where every kind is plain.
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registers or overrides the traits of a kind.
    ///
    /// Kind names must be non-empty and must not contain `:`, since index
    /// pointers split a primary key at its first `:`.
    pub fn with_kind(
        mut self,
        kind: impl Into<String>,
        traits: KindTraits,
    ) -> AdapterResult<Self> {
        let kind = kind.into();
        if kind.is_empty() || kind.contains(':') {
            return Err(AdapterError::configuration(format!(
                "invalid kind name {kind:?}: must be non-empty and contain no ':'"
            )));
        }
        self.kinds.insert(kind, traits);
        Ok(self)
    }

    /// Returns the traits of a kind.
    pub fn traits(&self, kind: &str) -> KindTraits {
        self.kinds.get(kind).copied().unwrap_or_default()
    }

    pub fn is_consumable(&self, kind: &str) -> bool {
        self.traits(kind).consumable
    }

    pub fn is_grantable(&self, kind: &str) -> bool {
        self.traits(kind).grantable
    }

    /// Iterates over explicitly registered kinds.
    pub fn kinds(&self) -> impl Iterator<Item = (&str, KindTraits)> {
        self.kinds.iter().map(|(k, t)| (k.as_str(), *t))
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_KINDS
                .iter()
                .map(|(kind, traits)| (kind.to_string(), *traits))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_consumable_kinds() {
        let registry = KindRegistry::default();
        for kind in [
            "AuthorizationCode",
            "RefreshToken",
            "DeviceCode",
            "BackchannelAuthenticationRequest",
        ] {
            assert!(registry.is_consumable(kind), "{kind} should be consumable");
            assert!(registry.is_grantable(kind), "{kind} should be grantable");
        }
    }

    #[test]
    fn test_access_token_is_grantable_only() {
        let registry = KindRegistry::default();
        assert_eq!(registry.traits("AccessToken"), KindTraits::GRANTABLE);
    }

    #[test]
    fn test_plain_kinds() {
        let registry = KindRegistry::default();
        for kind in ["Session", "Client", "Interaction", "Grant"] {
            assert_eq!(registry.traits(kind), KindTraits::PLAIN);
        }
    }

    #[test]
    fn test_unknown_kind_defaults_to_plain() {
        let registry = KindRegistry::default();
        assert_eq!(registry.traits("SomethingElse"), KindTraits::PLAIN);
        assert_eq!(KindRegistry::empty().traits("RefreshToken"), KindTraits::PLAIN);
    }

    #[test]
    fn test_with_kind_overrides() {
        let registry = KindRegistry::default()
            .with_kind("Session", KindTraits::GRANTABLE)
            .unwrap();
        assert!(registry.is_grantable("Session"));
        assert!(!registry.is_consumable("Session"));
    }

    #[test]
    fn test_with_kind_rejects_unsplittable_names() {
        for kind in ["", "Login:Ticket", ":"] {
            let err = KindRegistry::empty()
                .with_kind(kind, KindTraits::PLAIN)
                .unwrap_err();
            assert!(err.to_string().contains("invalid kind name"), "{kind:?}");
        }
    }

    #[test]
    fn test_default_kinds_split_cleanly() {
        let registry = KindRegistry::default();
        for (kind, _) in registry.kinds() {
            let key = crate::keyspace::entity_key(kind, "id:with:colons");
            assert_eq!(
                crate::keyspace::split_entity_key(&key),
                Some((kind, "id:with:colons"))
            );
        }
    }
}
