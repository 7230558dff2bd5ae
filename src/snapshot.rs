//! Portable JSON form of a transaction in any stage of building.
//!
//! The document mirrors [`TransactionState`] field for field. Numbers that
//! may exceed 2^53 are decimal strings, byte blobs are base64. Restoring a
//! snapshot needs no network access, and a fully resolved snapshot builds
//! to the same bytes as the state it was taken from.
//!
//! ```json
//! {
//!   "version": 1,
//!   "sender": "0x…",
//!   "expiration": null,
//!   "gasConfig": { "budget": "1000000", "price": "1000", "payment": [], "owner": null },
//!   "inputs": [
//!     { "kind": "Input", "index": 0, "type": "pure", "value": { "Pure": { "bytes": "AQ==" } } },
//!     { "kind": "Input", "index": 1, "type": "object", "value": { "UnresolvedObject": { "objectId": "0x…" } } }
//!   ],
//!   "commands": [
//!     { "kind": "SplitCoins", "coin": { "kind": "GasCoin" }, "amounts": [{ "kind": "Input", "index": 0 }] }
//!   ]
//! }
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{Argument, CallArg, Command, ObjectArg, ProgrammableMoveCall, TransactionExpiration};
use crate::error::BuilderError;
use crate::inputs::{Input, InputKind, InputValue, UnresolvedObject, UnresolvedValue};
use crate::state::{GasConfig, TransactionState};
use crate::type_tag::parse_move_call_target;
use crate::types::{Address, ObjectDigest, ObjectId, ObjectRef, TypeTag};

pub const SNAPSHOT_VERSION: u8 = 1;

/// `u64` as a decimal string; numbers are accepted when reading.
pub(crate) mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum StringOrNumber {
        String(String),
        Number(u64),
    }

    impl StringOrNumber {
        pub(super) fn into_u64<E: de::Error>(self) -> Result<u64, E> {
            match self {
                StringOrNumber::String(s) => s.parse().map_err(E::custom),
                StringOrNumber::Number(n) => Ok(n),
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        StringOrNumber::deserialize(deserializer)?.into_u64()
    }
}

pub(crate) mod option_u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::u64_string::StringOrNumber;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<StringOrNumber>::deserialize(deserializer)?
            .map(StringOrNumber::into_u64)
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub version: u8,
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default)]
    pub expiration: Option<SnapshotExpiration>,
    #[serde(default)]
    pub gas_config: SnapshotGasConfig,
    #[serde(default)]
    pub inputs: Vec<SnapshotInput>,
    #[serde(default)]
    pub commands: Vec<SnapshotCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotExpiration {
    None,
    Epoch(#[serde(with = "u64_string")] u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotGasConfig {
    #[serde(with = "option_u64_string")]
    pub budget: Option<u64>,
    #[serde(with = "option_u64_string")]
    pub price: Option<u64>,
    pub payment: Option<Vec<ObjectRef>>,
    pub owner: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotInputTag {
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotInputType {
    Pure,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInput {
    pub kind: SnapshotInputTag,
    pub index: u16,
    #[serde(rename = "type")]
    pub type_: SnapshotInputType,
    pub value: SnapshotInputValue,
}

/// Known value shapes, or anything else kept verbatim. Unknown shapes are
/// treated as raw pure values and migrated during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotInputValue {
    Known(SnapshotValue),
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotValue {
    Pure { bytes: String },
    Object(SnapshotObjectArg),
    UnresolvedObject(SnapshotUnresolvedObject),
    UnresolvedPure { value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotObjectArg {
    ImmOrOwnedObject(ObjectRef),
    #[serde(rename_all = "camelCase")]
    SharedObject {
        object_id: ObjectId,
        #[serde(with = "u64_string")]
        initial_shared_version: u64,
        mutable: bool,
    },
    Receiving(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUnresolvedObject {
    pub object_id: ObjectId,
    #[serde(default, with = "option_u64_string", skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<ObjectDigest>,
    #[serde(default, with = "option_u64_string", skip_serializing_if = "Option::is_none")]
    pub initial_shared_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SnapshotArgument {
    GasCoin,
    Input {
        index: u16,
    },
    Result {
        index: u16,
    },
    #[serde(rename_all = "camelCase")]
    NestedResult {
        index: u16,
        result_index: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SnapshotCommand {
    #[serde(rename_all = "camelCase")]
    MoveCall {
        target: String,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<SnapshotArgument>,
    },
    TransferObjects {
        objects: Vec<SnapshotArgument>,
        address: SnapshotArgument,
    },
    SplitCoins {
        coin: SnapshotArgument,
        amounts: Vec<SnapshotArgument>,
    },
    MergeCoins {
        destination: SnapshotArgument,
        sources: Vec<SnapshotArgument>,
    },
    Publish {
        modules: Vec<String>,
        dependencies: Vec<Address>,
    },
    MakeMoveVec {
        #[serde(rename = "type")]
        type_: Option<TypeTag>,
        objects: Vec<SnapshotArgument>,
    },
    #[serde(rename_all = "camelCase")]
    Upgrade {
        modules: Vec<String>,
        dependencies: Vec<Address>,
        package_id: Address,
        ticket: SnapshotArgument,
    },
}

impl From<Argument> for SnapshotArgument {
    fn from(arg: Argument) -> Self {
        match arg {
            Argument::GasCoin => SnapshotArgument::GasCoin,
            Argument::Input(index) => SnapshotArgument::Input { index },
            Argument::Result(index) => SnapshotArgument::Result { index },
            Argument::NestedResult(index, result_index) => SnapshotArgument::NestedResult {
                index,
                result_index,
            },
        }
    }
}

impl From<SnapshotArgument> for Argument {
    fn from(arg: SnapshotArgument) -> Self {
        match arg {
            SnapshotArgument::GasCoin => Argument::GasCoin,
            SnapshotArgument::Input { index } => Argument::Input(index),
            SnapshotArgument::Result { index } => Argument::Result(index),
            SnapshotArgument::NestedResult {
                index,
                result_index,
            } => Argument::NestedResult(index, result_index),
        }
    }
}

fn args_out(args: &[Argument]) -> Vec<SnapshotArgument> {
    args.iter().copied().map(Into::into).collect()
}

fn args_in(args: Vec<SnapshotArgument>) -> Vec<Argument> {
    args.into_iter().map(Into::into).collect()
}

fn modules_out(modules: &[Vec<u8>]) -> Vec<String> {
    modules.iter().map(|m| BASE64.encode(m)).collect()
}

fn modules_in(modules: Vec<String>) -> Result<Vec<Vec<u8>>, BuilderError> {
    modules
        .iter()
        .map(|m| {
            BASE64
                .decode(m)
                .map_err(|e| BuilderError::InvalidSnapshot(format!("module bytes: {e}")))
        })
        .collect()
}

impl From<&Command> for SnapshotCommand {
    fn from(cmd: &Command) -> Self {
        match cmd {
            Command::MoveCall(call) => SnapshotCommand::MoveCall {
                target: call.target(),
                type_arguments: call.type_arguments.clone(),
                arguments: args_out(&call.arguments),
            },
            Command::TransferObjects { objects, address } => SnapshotCommand::TransferObjects {
                objects: args_out(objects),
                address: (*address).into(),
            },
            Command::SplitCoins { coin, amounts } => SnapshotCommand::SplitCoins {
                coin: (*coin).into(),
                amounts: args_out(amounts),
            },
            Command::MergeCoins {
                destination,
                sources,
            } => SnapshotCommand::MergeCoins {
                destination: (*destination).into(),
                sources: args_out(sources),
            },
            Command::Publish {
                modules,
                dependencies,
            } => SnapshotCommand::Publish {
                modules: modules_out(modules),
                dependencies: dependencies.clone(),
            },
            Command::MakeMoveVec { type_, objects } => SnapshotCommand::MakeMoveVec {
                type_: type_.clone(),
                objects: args_out(objects),
            },
            Command::Upgrade {
                modules,
                dependencies,
                package_id,
                ticket,
            } => SnapshotCommand::Upgrade {
                modules: modules_out(modules),
                dependencies: dependencies.clone(),
                package_id: *package_id,
                ticket: (*ticket).into(),
            },
        }
    }
}

impl SnapshotCommand {
    fn into_command(self) -> Result<Command, BuilderError> {
        Ok(match self {
            SnapshotCommand::MoveCall {
                target,
                type_arguments,
                arguments,
            } => {
                let (package, module, function) = parse_move_call_target(&target)?;
                Command::MoveCall(Box::new(ProgrammableMoveCall {
                    package,
                    module,
                    function,
                    type_arguments,
                    arguments: args_in(arguments),
                }))
            }
            SnapshotCommand::TransferObjects { objects, address } => Command::TransferObjects {
                objects: args_in(objects),
                address: address.into(),
            },
            SnapshotCommand::SplitCoins { coin, amounts } => Command::SplitCoins {
                coin: coin.into(),
                amounts: args_in(amounts),
            },
            SnapshotCommand::MergeCoins {
                destination,
                sources,
            } => Command::MergeCoins {
                destination: destination.into(),
                sources: args_in(sources),
            },
            SnapshotCommand::Publish {
                modules,
                dependencies,
            } => Command::Publish {
                modules: modules_in(modules)?,
                dependencies,
            },
            SnapshotCommand::MakeMoveVec { type_, objects } => Command::MakeMoveVec {
                type_,
                objects: args_in(objects),
            },
            SnapshotCommand::Upgrade {
                modules,
                dependencies,
                package_id,
                ticket,
            } => Command::Upgrade {
                modules: modules_in(modules)?,
                dependencies,
                package_id,
                ticket: ticket.into(),
            },
        })
    }
}

fn value_out(value: &InputValue) -> SnapshotInputValue {
    let known = match value {
        InputValue::Resolved(CallArg::Pure(bytes)) => SnapshotValue::Pure {
            bytes: BASE64.encode(bytes),
        },
        InputValue::Resolved(CallArg::Object(obj)) => SnapshotValue::Object(match *obj {
            ObjectArg::ImmOrOwnedObject(r) => SnapshotObjectArg::ImmOrOwnedObject(r),
            ObjectArg::SharedObject {
                object_id,
                initial_shared_version,
                mutable,
            } => SnapshotObjectArg::SharedObject {
                object_id,
                initial_shared_version,
                mutable,
            },
            ObjectArg::Receiving(r) => SnapshotObjectArg::Receiving(r),
        }),
        InputValue::Unresolved(UnresolvedValue::Object(obj)) => {
            SnapshotValue::UnresolvedObject(SnapshotUnresolvedObject {
                object_id: obj.object_id,
                version: obj.version,
                digest: obj.digest,
                initial_shared_version: obj.initial_shared_version,
                mutable: obj.mutable,
                receiving: obj.receiving,
            })
        }
        InputValue::Unresolved(UnresolvedValue::Pure(raw)) => SnapshotValue::UnresolvedPure {
            value: raw.clone(),
        },
    };
    SnapshotInputValue::Known(known)
}

fn value_in(value: SnapshotInputValue) -> Result<InputValue, BuilderError> {
    let known = match value {
        SnapshotInputValue::Known(known) => known,
        SnapshotInputValue::Raw(raw) => return Ok(InputValue::Unresolved(UnresolvedValue::Pure(raw))),
    };
    Ok(match known {
        SnapshotValue::Pure { bytes } => InputValue::Resolved(CallArg::Pure(
            BASE64
                .decode(&bytes)
                .map_err(|e| BuilderError::InvalidSnapshot(format!("pure bytes: {e}")))?,
        )),
        SnapshotValue::Object(obj) => InputValue::Resolved(CallArg::Object(match obj {
            SnapshotObjectArg::ImmOrOwnedObject(r) => ObjectArg::ImmOrOwnedObject(r),
            SnapshotObjectArg::SharedObject {
                object_id,
                initial_shared_version,
                mutable,
            } => ObjectArg::SharedObject {
                object_id,
                initial_shared_version,
                mutable,
            },
            SnapshotObjectArg::Receiving(r) => ObjectArg::Receiving(r),
        })),
        SnapshotValue::UnresolvedObject(obj) => {
            InputValue::Unresolved(UnresolvedValue::Object(UnresolvedObject {
                object_id: obj.object_id,
                version: obj.version,
                digest: obj.digest,
                initial_shared_version: obj.initial_shared_version,
                mutable: obj.mutable,
                receiving: obj.receiving,
            }))
        }
        SnapshotValue::UnresolvedPure { value } => {
            InputValue::Unresolved(UnresolvedValue::Pure(value))
        }
    })
}

impl TransactionSnapshot {
    pub fn from_state(state: &TransactionState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            sender: state.sender,
            expiration: match state.expiration {
                TransactionExpiration::None => None,
                TransactionExpiration::Epoch(epoch) => Some(SnapshotExpiration::Epoch(epoch)),
            },
            gas_config: SnapshotGasConfig {
                budget: state.gas_config.budget,
                price: state.gas_config.price,
                payment: state.gas_config.payment.clone(),
                owner: state.gas_config.owner,
            },
            inputs: state
                .inputs
                .iter()
                .map(|input| SnapshotInput {
                    kind: SnapshotInputTag::Input,
                    index: input.index,
                    type_: match input.kind {
                        InputKind::Pure => SnapshotInputType::Pure,
                        InputKind::Object => SnapshotInputType::Object,
                    },
                    value: value_out(&input.value),
                })
                .collect(),
            commands: state.commands.iter().map(SnapshotCommand::from).collect(),
        }
    }

    pub fn into_state(self) -> Result<TransactionState, BuilderError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(BuilderError::InvalidSnapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for (position, input) in self.inputs.into_iter().enumerate() {
            if usize::from(input.index) != position {
                return Err(BuilderError::InvalidSnapshot(format!(
                    "input at position {position} has index {}",
                    input.index
                )));
            }
            let kind = match input.type_ {
                SnapshotInputType::Pure => InputKind::Pure,
                SnapshotInputType::Object => InputKind::Object,
            };
            inputs.push(Input::new(input.index, kind, value_in(input.value)?));
        }

        Ok(TransactionState {
            sender: self.sender,
            expiration: match self.expiration {
                None | Some(SnapshotExpiration::None) => TransactionExpiration::None,
                Some(SnapshotExpiration::Epoch(epoch)) => TransactionExpiration::Epoch(epoch),
            },
            gas_config: GasConfig {
                budget: self.gas_config.budget,
                price: self.gas_config.price,
                payment: self.gas_config.payment,
                owner: self.gas_config.owner,
            },
            inputs,
            commands: self
                .commands
                .into_iter()
                .map(SnapshotCommand::into_command)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn to_json(&self) -> Result<String, BuilderError> {
        serde_json::to_string(self).map_err(|e| BuilderError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, BuilderError> {
        serde_json::from_str(json).map_err(|e| BuilderError::InvalidSnapshot(e.to_string()))
    }
}
