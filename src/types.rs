//! Core types: addresses and object ids, digests, object references,
//! ownership and Move type tags.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bcs::{BcsDecode, BcsEncode, BcsReader, BcsWriter};
use crate::error::{BcsError, BuilderError};

pub const ADDRESS_LENGTH: usize = 32;
pub const DIGEST_LENGTH: usize = 32;

/// 32-byte account address or object id.
///
/// Textual forms are lower-cased and left-padded with zeros, so `0x2` and
/// `0x0000...0002` parse to the same value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

/// Object ids share the address layout.
pub type ObjectId = Address;

impl Address {
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Address whose last byte is `b`, e.g. `0x2` for the framework.
    pub const fn from_short(b: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = b;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `0x` followed by 64 lower-case hex characters.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// `0x1`
pub const MOVE_STDLIB_ADDRESS: Address = Address::from_short(1);
/// `0x2`
pub const FRAMEWORK_ADDRESS: Address = Address::from_short(2);
/// `0x5`
pub const SYSTEM_STATE_OBJECT_ID: Address = Address::from_short(5);
/// `0x6`
pub const CLOCK_OBJECT_ID: Address = Address::from_short(6);

impl FromStr for Address {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex_str.is_empty() || hex_str.len() > ADDRESS_LENGTH * 2 {
            return Err(BuilderError::InvalidAddress(s.to_string()));
        }
        let padded = format!("{:0>64}", hex_str.to_ascii_lowercase());
        let bytes = hex::decode(&padded).map_err(|_| BuilderError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BcsEncode for Address {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_fixed(&self.0)
    }
}

impl BcsDecode for Address {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self(r.read_fixed()?))
    }
}

/// 32-byte object digest, displayed as base58.
///
/// On the wire it is a `vector<u8>`, so it carries a length prefix of 32.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectDigest(pub [u8; DIGEST_LENGTH]);

impl ObjectDigest {
    pub const fn new(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for ObjectDigest {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| BuilderError::InvalidDigest(format!("{s}: {e}")))?;
        let arr: [u8; DIGEST_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            BuilderError::InvalidDigest(format!("{s}: expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Display for ObjectDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base58())
    }
}

impl std::fmt::Debug for ObjectDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectDigest({self})")
    }
}

impl Serialize for ObjectDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.base58())
    }
}

impl<'de> Deserialize<'de> for ObjectDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BcsEncode for ObjectDigest {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_bytes(&self.0)
    }
}

impl BcsDecode for ObjectDigest {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        let bytes = r.read_bytes()?;
        let len = bytes.len();
        let arr: [u8; DIGEST_LENGTH] = bytes.try_into().map_err(|_| BcsError::InvalidLength {
            expected: DIGEST_LENGTH,
            actual: len,
        })?;
        Ok(Self(arr))
    }
}

/// `(id, version, digest)` of a specific object state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: ObjectId,
    #[serde(with = "crate::snapshot::u64_string")]
    pub version: u64,
    pub digest: ObjectDigest,
}

impl ObjectRef {
    pub fn new(object_id: ObjectId, version: u64, digest: ObjectDigest) -> Self {
        Self {
            object_id,
            version,
            digest,
        }
    }
}

impl BcsEncode for ObjectRef {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        self.object_id.encode(w)?;
        w.write_u64(self.version)?;
        self.digest.encode(w)
    }
}

impl BcsDecode for ObjectRef {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self {
            object_id: Address::decode(r)?,
            version: r.read_u64()?,
            digest: ObjectDigest::decode(r)?,
        })
    }
}

/// On-chain ownership of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    AddressOwner(Address),
    ObjectOwner(Address),
    #[serde(rename_all = "camelCase")]
    Shared {
        #[serde(with = "crate::snapshot::u64_string")]
        initial_shared_version: u64,
    },
    Immutable,
}

impl Owner {
    pub fn initial_shared_version(&self) -> Option<u64> {
        match self {
            Owner::Shared {
                initial_shared_version,
            } => Some(*initial_shared_version),
            _ => None,
        }
    }
}

impl BcsEncode for Owner {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            Owner::AddressOwner(addr) => {
                w.write_variant(0)?;
                addr.encode(w)
            }
            Owner::ObjectOwner(addr) => {
                w.write_variant(1)?;
                addr.encode(w)
            }
            Owner::Shared {
                initial_shared_version,
            } => {
                w.write_variant(2)?;
                w.write_u64(*initial_shared_version)
            }
            Owner::Immutable => w.write_variant(3),
        }
    }
}

/// Recursive description of a Move value's type.
///
/// Variant order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructTag {
    pub address: Address,
    pub module: String,
    pub name: String,
    pub type_params: Vec<TypeTag>,
}

impl StructTag {
    /// Compares address, module and name, ignoring type parameters.
    pub fn is(&self, address: &Address, module: &str, name: &str) -> bool {
        self.address == *address && self.module == module && self.name == name
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::U128 => write!(f, "u128"),
            TypeTag::U256 => write!(f, "u256"),
            TypeTag::Address => write!(f, "address"),
            TypeTag::Signer => write!(f, "signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{inner}>"),
            TypeTag::Struct(tag) => write!(f, "{tag}"),
        }
    }
}

impl std::fmt::Display for StructTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)?;
        if !self.type_params.is_empty() {
            write!(f, "<")?;
            for (i, param) in self.type_params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{param}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl BcsEncode for TypeTag {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            TypeTag::Bool => w.write_variant(0),
            TypeTag::U8 => w.write_variant(1),
            TypeTag::U64 => w.write_variant(2),
            TypeTag::U128 => w.write_variant(3),
            TypeTag::Address => w.write_variant(4),
            TypeTag::Signer => w.write_variant(5),
            TypeTag::Vector(inner) => {
                w.write_variant(6)?;
                inner.encode(w)
            }
            TypeTag::Struct(tag) => {
                w.write_variant(7)?;
                tag.encode(w)
            }
            TypeTag::U16 => w.write_variant(8),
            TypeTag::U32 => w.write_variant(9),
            TypeTag::U256 => w.write_variant(10),
        }
    }
}

impl BcsDecode for TypeTag {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        r.enter()?;
        let tag = match r.read_variant()? {
            0 => TypeTag::Bool,
            1 => TypeTag::U8,
            2 => TypeTag::U64,
            3 => TypeTag::U128,
            4 => TypeTag::Address,
            5 => TypeTag::Signer,
            6 => TypeTag::Vector(Box::new(TypeTag::decode(r)?)),
            7 => TypeTag::Struct(Box::new(StructTag::decode(r)?)),
            8 => TypeTag::U16,
            9 => TypeTag::U32,
            10 => TypeTag::U256,
            tag => {
                return Err(BcsError::InvalidVariant {
                    type_name: "TypeTag",
                    tag,
                })
            }
        };
        r.leave();
        Ok(tag)
    }
}

impl BcsEncode for StructTag {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        self.address.encode(w)?;
        w.write_str(&self.module)?;
        w.write_str(&self.name)?;
        w.write_seq(&self.type_params)
    }
}

impl BcsDecode for StructTag {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self {
            address: Address::decode(r)?,
            module: r.read_string()?,
            name: r.read_string()?,
            type_params: r.read_seq()?,
        })
    }
}

impl FromStr for TypeTag {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::type_tag::parse_type_tag(s)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
