//! Migration of input values serialized by older builders.
//!
//! Older payloads carry an already-resolved argument without the pure/object
//! tagging of the current input model:
//!
//! - `{"Pure": [1, 2, 3]}` or `{"Pure": {"bytes": "<base64>"}}`
//! - `{"Object": {"ImmOrOwned": {objectId, version, digest}}}`
//!   (also spelled `ImmOrOwnedObject`)
//! - `{"Object": {"Shared": {objectId, initialSharedVersion, mutable}}}`
//!   (also spelled `SharedObject`)
//! - `{"Object": {"Receiving": {objectId, version, digest}}}`
//!
//! Versions may be JSON numbers or decimal strings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};

use crate::data::{CallArg, ObjectArg};
use crate::error::BuilderError;
use crate::types::{ObjectDigest, ObjectId, ObjectRef};

/// Whether `raw` has one of the shapes handled by
/// [`normalize_legacy_argument`].
pub fn is_legacy_argument(raw: &Value) -> bool {
    match raw.as_object() {
        Some(map) if map.len() == 1 => map.contains_key("Pure") || map.contains_key("Object"),
        _ => false,
    }
}

/// Convert a legacy argument into a resolved [`CallArg`].
pub fn normalize_legacy_argument(raw: &Value) -> Result<CallArg, BuilderError> {
    let map = raw
        .as_object()
        .filter(|m| m.len() == 1)
        .ok_or_else(|| invalid(raw))?;

    if let Some(pure) = map.get("Pure") {
        return pure_bytes(pure).map(CallArg::Pure).ok_or_else(|| invalid(raw));
    }

    let object = map
        .get("Object")
        .and_then(Value::as_object)
        .filter(|m| m.len() == 1)
        .ok_or_else(|| invalid(raw))?;
    let (variant, body) = object.iter().next().ok_or_else(|| invalid(raw))?;
    let body = body.as_object().ok_or_else(|| invalid(raw))?;

    let arg = match variant.as_str() {
        "ImmOrOwned" | "ImmOrOwnedObject" => ObjectArg::ImmOrOwnedObject(object_ref(body, raw)?),
        "Receiving" => ObjectArg::Receiving(object_ref(body, raw)?),
        "Shared" | "SharedObject" => ObjectArg::SharedObject {
            object_id: object_id(body, raw)?,
            initial_shared_version: body
                .get("initialSharedVersion")
                .and_then(number)
                .ok_or_else(|| invalid(raw))?,
            mutable: body
                .get("mutable")
                .and_then(Value::as_bool)
                .ok_or_else(|| invalid(raw))?,
        },
        _ => return Err(invalid(raw)),
    };
    Ok(CallArg::Object(arg))
}

fn invalid(raw: &Value) -> BuilderError {
    BuilderError::LegacyArgument(raw.to_string())
}

fn pure_bytes(pure: &Value) -> Option<Vec<u8>> {
    match pure {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        Value::Object(map) => map
            .get("bytes")
            .and_then(Value::as_str)
            .and_then(|s| BASE64.decode(s).ok()),
        Value::String(s) => BASE64.decode(s).ok(),
        _ => None,
    }
}

fn number(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn object_id(body: &Map<String, Value>, raw: &Value) -> Result<ObjectId, BuilderError> {
    body.get("objectId")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(raw))?
        .parse()
}

fn object_ref(body: &Map<String, Value>, raw: &Value) -> Result<ObjectRef, BuilderError> {
    let version = body.get("version").and_then(number).ok_or_else(|| invalid(raw))?;
    let digest: ObjectDigest = body
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(raw))?
        .parse()?;
    Ok(ObjectRef::new(object_id(body, raw)?, version, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;
    use serde_json::json;

    fn digest() -> ObjectDigest {
        ObjectDigest::new([9; 32])
    }

    #[test]
    fn pure_byte_array() {
        let raw = json!({"Pure": [1, 2, 3]});
        assert!(is_legacy_argument(&raw));
        assert_eq!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Pure(vec![1, 2, 3])
        );
    }

    #[test]
    fn pure_base64_bytes() {
        let raw = json!({"Pure": {"bytes": "AQID"}});
        assert_eq!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Pure(vec![1, 2, 3])
        );
    }

    #[test]
    fn pure_rejects_out_of_range_byte() {
        assert!(normalize_legacy_argument(&json!({"Pure": [1, 256]})).is_err());
    }

    #[test]
    fn imm_or_owned_with_string_version() {
        let raw = json!({"Object": {"ImmOrOwned": {
            "objectId": "0x5",
            "version": "12",
            "digest": digest().to_string(),
        }}});
        assert_eq!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Object(ObjectArg::ImmOrOwnedObject(ObjectRef::new(
                Address::from_short(5),
                12,
                digest()
            )))
        );
    }

    #[test]
    fn imm_or_owned_object_spelling() {
        let raw = json!({"Object": {"ImmOrOwnedObject": {
            "objectId": "0x5",
            "version": 12,
            "digest": digest().to_string(),
        }}});
        assert!(matches!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Object(ObjectArg::ImmOrOwnedObject(_))
        ));
    }

    #[test]
    fn shared_object() {
        let raw = json!({"Object": {"Shared": {
            "objectId": "0x6",
            "initialSharedVersion": 1,
            "mutable": false,
        }}});
        assert_eq!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Object(ObjectArg::SharedObject {
                object_id: Address::from_short(6),
                initial_shared_version: 1,
                mutable: false,
            })
        );
    }

    #[test]
    fn shared_object_spelling() {
        let raw = json!({"Object": {"SharedObject": {
            "objectId": "0x6",
            "initialSharedVersion": "7",
            "mutable": true,
        }}});
        assert!(matches!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Object(ObjectArg::SharedObject {
                initial_shared_version: 7,
                mutable: true,
                ..
            })
        ));
    }

    #[test]
    fn receiving() {
        let raw = json!({"Object": {"Receiving": {
            "objectId": "0x7",
            "version": 3,
            "digest": digest().to_string(),
        }}});
        assert!(matches!(
            normalize_legacy_argument(&raw).unwrap(),
            CallArg::Object(ObjectArg::Receiving(r)) if r.version == 3
        ));
    }

    #[test]
    fn plain_values_are_not_legacy() {
        assert!(!is_legacy_argument(&json!("0x2")));
        assert!(!is_legacy_argument(&json!(42)));
        assert!(!is_legacy_argument(&json!({"Pure": [1], "extra": 1})));
    }

    #[test]
    fn unknown_object_variant() {
        let raw = json!({"Object": {"Borrowed": {"objectId": "0x1"}}});
        assert!(matches!(
            normalize_legacy_argument(&raw),
            Err(BuilderError::LegacyArgument(_))
        ));
    }
}
