//! Wire types of a programmable transaction and the `TransactionData`
//! envelope, with their canonical encodings and the transaction digest.
//!
//! # Envelope layout
//!
//! ```text
//! TransactionData::V1 {
//!     kind: TransactionKind::ProgrammableTransaction { inputs, commands },
//!     sender,
//!     gas_data: { payment, owner, price, budget },
//!     expiration: None | Epoch(u64),
//! }
//! ```

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::bcs::{self, BcsDecode, BcsEncode, BcsReader, BcsWriter};
use crate::error::BcsError;
use crate::types::{Address, ObjectId, ObjectRef, TypeTag};

type Blake2b256 = Blake2b<U32>;

/// Domain separation tag hashed in front of the serialized envelope.
pub const TRANSACTION_DATA_DIGEST_TAG: &[u8] = b"TransactionData::";

/// Intent prefix for signing: scope `TransactionData`, version 0, app IOTA.
pub const TRANSACTION_INTENT: [u8; 3] = [0x00, 0x00, 0x00];

/// A reference usable inside a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

impl BcsEncode for Argument {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            Argument::GasCoin => w.write_variant(0),
            Argument::Input(i) => {
                w.write_variant(1)?;
                w.write_u16(*i)
            }
            Argument::Result(i) => {
                w.write_variant(2)?;
                w.write_u16(*i)
            }
            Argument::NestedResult(i, j) => {
                w.write_variant(3)?;
                w.write_u16(*i)?;
                w.write_u16(*j)
            }
        }
    }
}

impl BcsDecode for Argument {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(Argument::GasCoin),
            1 => Ok(Argument::Input(r.read_u16()?)),
            2 => Ok(Argument::Result(r.read_u16()?)),
            3 => Ok(Argument::NestedResult(r.read_u16()?, r.read_u16()?)),
            tag => Err(BcsError::InvalidVariant {
                type_name: "Argument",
                tag,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
    SharedObject {
        object_id: ObjectId,
        initial_shared_version: u64,
        mutable: bool,
    },
    Receiving(ObjectRef),
}

impl ObjectArg {
    pub fn object_id(&self) -> ObjectId {
        match self {
            ObjectArg::ImmOrOwnedObject(r) | ObjectArg::Receiving(r) => r.object_id,
            ObjectArg::SharedObject { object_id, .. } => *object_id,
        }
    }
}

impl BcsEncode for ObjectArg {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            ObjectArg::ImmOrOwnedObject(r) => {
                w.write_variant(0)?;
                r.encode(w)
            }
            ObjectArg::SharedObject {
                object_id,
                initial_shared_version,
                mutable,
            } => {
                w.write_variant(1)?;
                object_id.encode(w)?;
                w.write_u64(*initial_shared_version)?;
                w.write_bool(*mutable)
            }
            ObjectArg::Receiving(r) => {
                w.write_variant(2)?;
                r.encode(w)
            }
        }
    }
}

impl BcsDecode for ObjectArg {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(ObjectArg::ImmOrOwnedObject(ObjectRef::decode(r)?)),
            1 => Ok(ObjectArg::SharedObject {
                object_id: Address::decode(r)?,
                initial_shared_version: r.read_u64()?,
                mutable: r.read_bool()?,
            }),
            2 => Ok(ObjectArg::Receiving(ObjectRef::decode(r)?)),
            tag => Err(BcsError::InvalidVariant {
                type_name: "ObjectArg",
                tag,
            }),
        }
    }
}

/// A resolved transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallArg {
    /// Already-encoded scalar or vector value.
    Pure(Vec<u8>),
    Object(ObjectArg),
}

impl CallArg {
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            CallArg::Pure(_) => None,
            CallArg::Object(obj) => Some(obj.object_id()),
        }
    }
}

impl BcsEncode for CallArg {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            CallArg::Pure(bytes) => {
                w.write_variant(0)?;
                w.write_bytes(bytes)
            }
            CallArg::Object(obj) => {
                w.write_variant(1)?;
                obj.encode(w)
            }
        }
    }
}

impl BcsDecode for CallArg {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(CallArg::Pure(r.read_bytes()?)),
            1 => Ok(CallArg::Object(ObjectArg::decode(r)?)),
            tag => Err(BcsError::InvalidVariant {
                type_name: "CallArg",
                tag,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgrammableMoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

impl ProgrammableMoveCall {
    /// `package::module::function`
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

impl BcsEncode for ProgrammableMoveCall {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        self.package.encode(w)?;
        w.write_str(&self.module)?;
        w.write_str(&self.function)?;
        w.write_seq(&self.type_arguments)?;
        w.write_seq(&self.arguments)
    }
}

impl BcsDecode for ProgrammableMoveCall {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self {
            package: Address::decode(r)?,
            module: r.read_string()?,
            function: r.read_string()?,
            type_arguments: r.read_seq()?,
            arguments: r.read_seq()?,
        })
    }
}

/// The closed set of transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
    TransferObjects {
        objects: Vec<Argument>,
        address: Argument,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    Publish {
        modules: Vec<Vec<u8>>,
        dependencies: Vec<ObjectId>,
    },
    MakeMoveVec {
        type_: Option<TypeTag>,
        objects: Vec<Argument>,
    },
    Upgrade {
        modules: Vec<Vec<u8>>,
        dependencies: Vec<ObjectId>,
        package_id: ObjectId,
        ticket: Argument,
    },
}

impl Command {
    /// Every argument the command reads, in wire order.
    pub fn arguments(&self) -> Vec<Argument> {
        match self {
            Command::MoveCall(call) => call.arguments.clone(),
            Command::TransferObjects { objects, address } => {
                let mut args = objects.clone();
                args.push(*address);
                args
            }
            Command::SplitCoins { coin, amounts } => {
                let mut args = vec![*coin];
                args.extend_from_slice(amounts);
                args
            }
            Command::MergeCoins {
                destination,
                sources,
            } => {
                let mut args = vec![*destination];
                args.extend_from_slice(sources);
                args
            }
            Command::Publish { .. } => Vec::new(),
            Command::MakeMoveVec { objects, .. } => objects.clone(),
            Command::Upgrade { ticket, .. } => vec![*ticket],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveCall(_) => "MoveCall",
            Command::TransferObjects { .. } => "TransferObjects",
            Command::SplitCoins { .. } => "SplitCoins",
            Command::MergeCoins { .. } => "MergeCoins",
            Command::Publish { .. } => "Publish",
            Command::MakeMoveVec { .. } => "MakeMoveVec",
            Command::Upgrade { .. } => "Upgrade",
        }
    }
}

impl BcsEncode for Command {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            Command::MoveCall(call) => {
                w.write_variant(0)?;
                call.encode(w)
            }
            Command::TransferObjects { objects, address } => {
                w.write_variant(1)?;
                w.write_seq(objects)?;
                address.encode(w)
            }
            Command::SplitCoins { coin, amounts } => {
                w.write_variant(2)?;
                coin.encode(w)?;
                w.write_seq(amounts)
            }
            Command::MergeCoins {
                destination,
                sources,
            } => {
                w.write_variant(3)?;
                destination.encode(w)?;
                w.write_seq(sources)
            }
            Command::Publish {
                modules,
                dependencies,
            } => {
                w.write_variant(4)?;
                w.write_seq(modules)?;
                w.write_seq(dependencies)
            }
            Command::MakeMoveVec { type_, objects } => {
                w.write_variant(5)?;
                type_.encode(w)?;
                w.write_seq(objects)
            }
            Command::Upgrade {
                modules,
                dependencies,
                package_id,
                ticket,
            } => {
                w.write_variant(6)?;
                w.write_seq(modules)?;
                w.write_seq(dependencies)?;
                package_id.encode(w)?;
                ticket.encode(w)
            }
        }
    }
}

impl BcsDecode for Command {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(Command::MoveCall(Box::new(ProgrammableMoveCall::decode(r)?))),
            1 => Ok(Command::TransferObjects {
                objects: r.read_seq()?,
                address: Argument::decode(r)?,
            }),
            2 => Ok(Command::SplitCoins {
                coin: Argument::decode(r)?,
                amounts: r.read_seq()?,
            }),
            3 => Ok(Command::MergeCoins {
                destination: Argument::decode(r)?,
                sources: r.read_seq()?,
            }),
            4 => Ok(Command::Publish {
                modules: r.read_seq()?,
                dependencies: r.read_seq()?,
            }),
            5 => Ok(Command::MakeMoveVec {
                type_: Option::<TypeTag>::decode(r)?,
                objects: r.read_seq()?,
            }),
            6 => Ok(Command::Upgrade {
                modules: r.read_seq()?,
                dependencies: r.read_seq()?,
                package_id: Address::decode(r)?,
                ticket: Argument::decode(r)?,
            }),
            tag => Err(BcsError::InvalidVariant {
                type_name: "Command",
                tag,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl BcsEncode for ProgrammableTransaction {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_seq(&self.inputs)?;
        w.write_seq(&self.commands)
    }
}

impl BcsDecode for ProgrammableTransaction {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self {
            inputs: r.read_seq()?,
            commands: r.read_seq()?,
        })
    }
}

/// Only programmable transactions can be built by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

impl TransactionKind {
    pub fn to_bytes(&self) -> Result<Vec<u8>, BcsError> {
        bcs::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BcsError> {
        bcs::from_bytes(bytes)
    }
}

impl BcsEncode for TransactionKind {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            TransactionKind::ProgrammableTransaction(pt) => {
                w.write_variant(0)?;
                pt.encode(w)
            }
        }
    }
}

impl BcsDecode for TransactionKind {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(TransactionKind::ProgrammableTransaction(
                ProgrammableTransaction::decode(r)?,
            )),
            tag => Err(BcsError::InvalidVariant {
                type_name: "TransactionKind",
                tag,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GasData {
    pub payment: Vec<ObjectRef>,
    pub owner: Address,
    pub price: u64,
    pub budget: u64,
}

impl BcsEncode for GasData {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_seq(&self.payment)?;
        self.owner.encode(w)?;
        w.write_u64(self.price)?;
        w.write_u64(self.budget)
    }
}

impl BcsDecode for GasData {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Self {
            payment: r.read_seq()?,
            owner: Address::decode(r)?,
            price: r.read_u64()?,
            budget: r.read_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionExpiration {
    #[default]
    None,
    Epoch(u64),
}

impl BcsEncode for TransactionExpiration {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            TransactionExpiration::None => w.write_variant(0),
            TransactionExpiration::Epoch(epoch) => {
                w.write_variant(1)?;
                w.write_u64(*epoch)
            }
        }
    }
}

impl BcsDecode for TransactionExpiration {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(TransactionExpiration::None),
            1 => Ok(TransactionExpiration::Epoch(r.read_u64()?)),
            tag => Err(BcsError::InvalidVariant {
                type_name: "TransactionExpiration",
                tag,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionDataV1 {
    pub kind: TransactionKind,
    pub sender: Address,
    pub gas_data: GasData,
    pub expiration: TransactionExpiration,
}

/// Versioned transaction envelope. Only `V1` exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionData {
    V1(TransactionDataV1),
}

impl TransactionData {
    pub fn v1(&self) -> &TransactionDataV1 {
        match self {
            TransactionData::V1(v1) => v1,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BcsError> {
        bcs::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BcsError> {
        bcs::from_bytes(bytes)
    }

    pub fn digest(&self) -> Result<TransactionDigest, BcsError> {
        Ok(TransactionDigest::of(&self.to_bytes()?))
    }
}

impl BcsEncode for TransactionData {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            TransactionData::V1(v1) => {
                w.write_variant(0)?;
                v1.kind.encode(w)?;
                v1.sender.encode(w)?;
                v1.gas_data.encode(w)?;
                v1.expiration.encode(w)
            }
        }
    }
}

impl BcsDecode for TransactionData {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(TransactionData::V1(TransactionDataV1 {
                kind: TransactionKind::decode(r)?,
                sender: Address::decode(r)?,
                gas_data: GasData::decode(r)?,
                expiration: TransactionExpiration::decode(r)?,
            })),
            tag => Err(BcsError::InvalidVariant {
                type_name: "TransactionData",
                tag,
            }),
        }
    }
}

/// Blake2b-256 of `"TransactionData::" ++ bytes`, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionDigest(pub [u8; 32]);

impl TransactionDigest {
    /// Digest of already-serialized `TransactionData` bytes.
    pub fn of(tx_bytes: &[u8]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(TRANSACTION_DATA_DIGEST_TAG);
        hasher.update(tx_bytes);
        Self(hasher.finalize().into())
    }

    pub fn base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl std::fmt::Display for TransactionDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base58())
    }
}

impl std::fmt::Debug for TransactionDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionDigest({self})")
    }
}

/// Prefix serialized `TransactionData` with the signing intent, ready to be
/// handed to a signer.
#[must_use]
pub fn intent_message(tx_bytes: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(TRANSACTION_INTENT.len() + tx_bytes.len());
    msg.extend_from_slice(&TRANSACTION_INTENT);
    msg.extend_from_slice(tx_bytes);
    msg
}
