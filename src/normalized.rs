//! On-chain Move function signatures, as returned by a node's normalized
//! module API, and the classifiers the resolver needs.

use serde::{Deserialize, Serialize};

use crate::types::{Address, FRAMEWORK_ADDRESS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizedType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    Signer,
    Struct {
        #[serde(flatten)]
        inner: Box<NormalizedStructType>,
    },
    Vector(Box<NormalizedType>),
    TypeParameter(u16),
    Reference(Box<NormalizedType>),
    MutableReference(Box<NormalizedType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStructType {
    pub address: Address,
    pub module: String,
    pub name: String,
    #[serde(default)]
    pub type_arguments: Vec<NormalizedType>,
}

impl NormalizedStructType {
    pub fn is(&self, address: &Address, module: &str, name: &str) -> bool {
        self.address == *address && self.module == module && self.name == name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFunction {
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub parameters: Vec<NormalizedType>,
    #[serde(default, rename = "return")]
    pub return_types: Vec<NormalizedType>,
}

impl NormalizedFunction {
    /// Parameters the caller must supply: everything except a trailing
    /// `TxContext`, which the runtime injects.
    pub fn input_parameters(&self) -> &[NormalizedType] {
        match self.parameters.split_last() {
            Some((last, rest)) if last.is_tx_context() => rest,
            _ => &self.parameters,
        }
    }
}

impl NormalizedType {
    pub fn struct_type(inner: NormalizedStructType) -> Self {
        NormalizedType::Struct {
            inner: Box::new(inner),
        }
    }

    /// The struct behind at most one reference, if any.
    pub fn struct_tag(&self) -> Option<&NormalizedStructType> {
        match self {
            NormalizedType::Struct { inner } => Some(inner),
            NormalizedType::Reference(t) | NormalizedType::MutableReference(t) => match t.as_ref() {
                NormalizedType::Struct { inner } => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }

    /// `0x2::tx_context::TxContext`, by value or by reference.
    pub fn is_tx_context(&self) -> bool {
        self.struct_tag()
            .is_some_and(|s| s.is(&FRAMEWORK_ADDRESS, "tx_context", "TxContext"))
    }

    /// `0x2::transfer::Receiving<T>`.
    pub fn is_receiving(&self) -> bool {
        self.struct_tag()
            .is_some_and(|s| s.is(&FRAMEWORK_ADDRESS, "transfer", "Receiving"))
    }

    /// Passing an object to this parameter needs write access: it is taken
    /// by value or behind `&mut`.
    pub fn is_mutable_use(&self) -> bool {
        !matches!(self, NormalizedType::Reference(_))
    }
}

impl std::fmt::Display for NormalizedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizedType::Bool => write!(f, "bool"),
            NormalizedType::U8 => write!(f, "u8"),
            NormalizedType::U16 => write!(f, "u16"),
            NormalizedType::U32 => write!(f, "u32"),
            NormalizedType::U64 => write!(f, "u64"),
            NormalizedType::U128 => write!(f, "u128"),
            NormalizedType::U256 => write!(f, "u256"),
            NormalizedType::Address => write!(f, "address"),
            NormalizedType::Signer => write!(f, "signer"),
            NormalizedType::Struct { inner } => {
                write!(f, "{}::{}::{}", inner.address, inner.module, inner.name)?;
                if !inner.type_arguments.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in inner.type_arguments.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            NormalizedType::Vector(t) => write!(f, "vector<{t}>"),
            NormalizedType::TypeParameter(i) => write!(f, "T{i}"),
            NormalizedType::Reference(t) => write!(f, "&{t}"),
            NormalizedType::MutableReference(t) => write!(f, "&mut {t}"),
        }
    }
}
