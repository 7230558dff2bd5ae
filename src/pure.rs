//! Encoding of raw pure values whose type comes from a Move signature.

use serde_json::Value;

use crate::bcs::BcsWriter;
use crate::error::BcsError;
use crate::normalized::{NormalizedStructType, NormalizedType};
use crate::types::{Address, TypeTag, FRAMEWORK_ADDRESS, MOVE_STDLIB_ADDRESS};

/// Serialization type of a pure argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PureType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    /// UTF-8 or ASCII string, encoded as `vector<u8>`.
    String,
    Vector(Box<PureType>),
}

impl std::fmt::Display for PureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PureType::Bool => write!(f, "bool"),
            PureType::U8 => write!(f, "u8"),
            PureType::U16 => write!(f, "u16"),
            PureType::U32 => write!(f, "u32"),
            PureType::U64 => write!(f, "u64"),
            PureType::U128 => write!(f, "u128"),
            PureType::U256 => write!(f, "u256"),
            PureType::Address => write!(f, "address"),
            PureType::String => write!(f, "string"),
            PureType::Vector(inner) => write!(f, "vector<{inner}>"),
        }
    }
}

impl PureType {
    /// Pure type of a primitive type tag; structs and `signer` have none.
    pub fn from_type_tag(tag: &TypeTag) -> Option<Self> {
        Some(match tag {
            TypeTag::Bool => PureType::Bool,
            TypeTag::U8 => PureType::U8,
            TypeTag::U16 => PureType::U16,
            TypeTag::U32 => PureType::U32,
            TypeTag::U64 => PureType::U64,
            TypeTag::U128 => PureType::U128,
            TypeTag::U256 => PureType::U256,
            TypeTag::Address => PureType::Address,
            TypeTag::Vector(inner) => PureType::Vector(Box::new(Self::from_type_tag(inner)?)),
            TypeTag::Signer | TypeTag::Struct(_) => return None,
        })
    }
}

fn is_std(s: &NormalizedStructType, module: &str, name: &str) -> bool {
    s.is(&MOVE_STDLIB_ADDRESS, module, name)
}

/// Infer how `value` must be encoded to be passed as `param`.
///
/// `Ok(None)` means the parameter is not a pure type: structs other than the
/// recognized string/id/option types, type parameters and references take
/// the object path. `value` is `None` when it is not known, e.g. the element
/// of an empty vector.
pub fn pure_serialization_type(
    param: &NormalizedType,
    value: Option<&Value>,
) -> Result<Option<PureType>, BcsError> {
    let ty = match param {
        NormalizedType::Bool => PureType::Bool,
        NormalizedType::U8 => PureType::U8,
        NormalizedType::U16 => PureType::U16,
        NormalizedType::U32 => PureType::U32,
        NormalizedType::U64 => PureType::U64,
        NormalizedType::U128 => PureType::U128,
        NormalizedType::U256 => PureType::U256,
        NormalizedType::Address => {
            if let Some(v) = value {
                let s = v.as_str().ok_or_else(|| mismatch("address string", v))?;
                s.parse::<Address>()
                    .map_err(|_| mismatch("address string", v))?;
            }
            PureType::Address
        }
        NormalizedType::Signer => {
            return Err(BcsError::Mismatch {
                expected: "a pure type".into(),
                found: "signer".into(),
            })
        }
        NormalizedType::Vector(inner) => {
            if **inner == NormalizedType::U8 && value.map_or(true, Value::is_string) {
                return Ok(Some(PureType::String));
            }
            let first = match value {
                None | Some(Value::Null) => None,
                Some(Value::Array(items)) => items.first(),
                Some(other) => return Err(mismatch("array", other)),
            };
            return Ok(pure_serialization_type(inner, first)?
                .map(|t| PureType::Vector(Box::new(t))));
        }
        NormalizedType::Struct { inner } => {
            if is_std(inner, "ascii", "String") || is_std(inner, "string", "String") {
                PureType::String
            } else if inner.is(&FRAMEWORK_ADDRESS, "object", "ID") {
                PureType::Address
            } else if is_std(inner, "option", "Option") {
                let Some(t) = inner.type_arguments.first() else {
                    return Ok(None);
                };
                return pure_serialization_type(&NormalizedType::Vector(Box::new(t.clone())), value);
            } else {
                return Ok(None);
            }
        }
        NormalizedType::TypeParameter(_)
        | NormalizedType::Reference(_)
        | NormalizedType::MutableReference(_) => return Ok(None),
    };
    Ok(Some(ty))
}

fn mismatch(expected: &str, found: &Value) -> BcsError {
    BcsError::Mismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn unsigned(value: &Value, expected: &str) -> Result<u128, BcsError> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from).ok_or_else(|| mismatch(expected, value)),
        Value::String(s) => s.parse().map_err(|_| mismatch(expected, value)),
        _ => Err(mismatch(expected, value)),
    }
}

fn narrow<T: TryFrom<u128>>(value: &Value, expected: &str) -> Result<T, BcsError> {
    T::try_from(unsigned(value, expected)?).map_err(|_| mismatch(expected, value))
}

/// Parse a decimal `u256` into little-endian bytes.
fn parse_u256(value: &Value) -> Result<[u8; 32], BcsError> {
    let digits = match value {
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
    .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
    .ok_or_else(|| mismatch("u256", value))?;

    let mut out = [0u8; 32];
    for d in digits.bytes() {
        let mut carry = u32::from(d - b'0');
        for byte in out.iter_mut() {
            let v = u32::from(*byte) * 10 + carry;
            *byte = (v & 0xFF) as u8;
            carry = v >> 8;
        }
        if carry != 0 {
            return Err(mismatch("u256", value));
        }
    }
    Ok(out)
}

fn write_value(w: &mut BcsWriter, ty: &PureType, value: &Value) -> Result<(), BcsError> {
    match ty {
        PureType::Bool => w.write_bool(value.as_bool().ok_or_else(|| mismatch("bool", value))?),
        PureType::U8 => w.write_u8(narrow(value, "u8")?),
        PureType::U16 => w.write_u16(narrow(value, "u16")?),
        PureType::U32 => w.write_u32(narrow(value, "u32")?),
        PureType::U64 => w.write_u64(narrow(value, "u64")?),
        PureType::U128 => w.write_u128(unsigned(value, "u128")?),
        PureType::U256 => w.write_fixed(&parse_u256(value)?),
        PureType::Address => {
            let addr: Address = value
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| mismatch("address string", value))?;
            w.write_fixed(addr.as_bytes())
        }
        PureType::String => {
            w.write_str(value.as_str().ok_or_else(|| mismatch("string", value))?)
        }
        PureType::Vector(inner) => {
            let empty = Vec::new();
            let items = match value {
                Value::Null => &empty,
                Value::Array(items) => items,
                _ => return Err(mismatch("array", value)),
            };
            w.write_length(items.len())?;
            for item in items {
                write_value(w, inner, item)?;
            }
            Ok(())
        }
    }
}

/// Encode a raw JSON value as `ty`.
///
/// Integers are accepted as JSON numbers or decimal strings; `u128` and
/// `u256` beyond the JSON number range must be strings. `null` encodes an
/// empty vector, which is also how an absent `Option` is written.
pub fn encode_pure(ty: &PureType, value: &Value) -> Result<Vec<u8>, BcsError> {
    let mut w = BcsWriter::new();
    write_value(&mut w, ty, value)?;
    Ok(w.into_bytes())
}
