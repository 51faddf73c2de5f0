//! Stored entity model.

use serde_json::{Map, Value};

/// Field of a consumable record holding the serialized payload.
pub const PAYLOAD_FIELD: &str = "payload";

/// Field of a consumable record holding the consumption timestamp.
pub const CONSUMED_FIELD: &str = "consumed";

/// Payload field carrying the grant id cross-reference.
pub const GRANT_ID_FIELD: &str = "grantId";

/// Payload field carrying the device flow user code cross-reference.
pub const USER_CODE_FIELD: &str = "userCode";

/// Payload field carrying the session uid cross-reference.
pub const UID_FIELD: &str = "uid";

/// One stored artifact as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: String,
    pub id: String,
    /// Opaque payload exactly as it was upserted.
    pub payload: Value,
    /// Seconds since the epoch at which the record was consumed.
    pub consumed: Option<i64>,
}

impl Entity {
    pub fn is_consumed(&self) -> bool {
        self.consumed.is_some()
    }

    /// Flattens the entity into the shape the protocol engine expects:
    /// the payload object with `consumed` merged in at the top level.
    ///
    /// Non-object payloads are returned as-is.
    pub fn into_value(self) -> Value {
        match (self.payload, self.consumed) {
            (Value::Object(mut map), Some(consumed)) => {
                map.insert(CONSUMED_FIELD.to_string(), Value::from(consumed));
                Value::Object(map)
            }
            (payload, _) => payload,
        }
    }
}

/// Cross-reference fields read from a payload at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferences<'a> {
    pub grant_id: Option<&'a str>,
    pub user_code: Option<&'a str>,
    pub uid: Option<&'a str>,
}

impl<'a> CrossReferences<'a> {
    /// Extracts the string-valued `grantId`, `userCode` and `uid` fields.
    ///
    /// Empty strings and non-string values are ignored.
    pub fn extract(payload: &'a Value) -> Self {
        let Some(map) = payload.as_object() else {
            return Self::default();
        };
        Self {
            grant_id: string_field(map, GRANT_ID_FIELD),
            user_code: string_field(map, USER_CODE_FIELD),
            uid: string_field(map, UID_FIELD),
        }
    }
}

fn string_field<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    map.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
