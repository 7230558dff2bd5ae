//! Error types for encoding, resolution and building.

use thiserror::Error;

use crate::data::Argument;
use crate::types::Address;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("encoding error: {0}")]
    Encoding(#[from] BcsError),

    #[error("data reader error: {0}")]
    Client(#[from] ClientError),

    #[error("a data reader is required to resolve {0}")]
    ClientRequired(&'static str),

    #[error("missing transaction sender")]
    MissingSender,

    #[error("missing gas budget")]
    MissingGasBudget,

    #[error("missing gas price")]
    MissingGasPrice,

    #[error("missing gas payment")]
    MissingGasPayment,

    #[error("input {0} is still unresolved")]
    UnresolvedInput(u16),

    #[error("command {command} references {argument:?} which is not available at that position")]
    InvalidArgumentReference { command: usize, argument: Argument },

    #[error("too many inputs: {0} (max 65536)")]
    TooManyInputs(usize),

    #[error("too many commands: {0} (max 65536)")]
    TooManyCommands(usize),

    #[error("command {command} calls {target} with {actual} arguments, expected {expected}")]
    ArgumentCountMismatch {
        command: usize,
        target: String,
        expected: usize,
        actual: usize,
    },

    #[error("command {command} argument {argument}: unsupported parameter type {parameter}")]
    UnsupportedParameterType {
        command: usize,
        argument: usize,
        parameter: String,
    },

    #[error("input {input}: {reason}")]
    InvalidPureArgument { input: u16, reason: String },

    #[error("input {input}: expected an object id string, got {value}")]
    ExpectedObjectId { input: u16, value: String },

    #[error("input {input}: pure argument is {size} bytes (max {max})")]
    PureArgumentTooLarge { input: u16, size: usize, max: u64 },

    #[error("duplicate object ids in one request: {}", join_ids(.0))]
    DuplicateObjectIds(Vec<Address>),

    #[error("the following input objects are invalid: {}", join_invalid(.0))]
    InvalidObjects(Vec<InvalidObject>),

    #[error("failed to fetch signature of {target}: {source}")]
    FunctionLookup {
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("no gas coins found for {0}")]
    NoGasCoins(Address),

    #[error("dry run failed, could not determine a gas budget: {0}")]
    DryRunFailed(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid type tag: {0}")]
    InvalidTypeTag(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid move call target {0:?} (expected package::module::function)")]
    InvalidTarget(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("object {object_id} is already an input: {reason}")]
    ConflictingObjectInput { object_id: Address, reason: String },

    #[error("unrecognized legacy argument: {0}")]
    LegacyArgument(String),
}

/// An object id that could not be resolved, with the reason reported by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidObject {
    pub object_id: Address,
    pub reason: String,
}

impl std::fmt::Display for InvalidObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.object_id, self.reason)
    }
}

fn join_ids(ids: &[Address]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_invalid(objects: &[InvalidObject]) -> String {
    objects
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical encoding and decoding errors.
#[derive(Debug, Error)]
pub enum BcsError {
    #[error("encoding size exceeded: {size} bytes (max {max})")]
    SizeExceeded { size: usize, max: usize },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid variant {tag} for {type_name}")]
    InvalidVariant { type_name: &'static str, tag: u32 },

    #[error("invalid bool byte 0x{0:02X}")]
    InvalidBool(u8),

    #[error("invalid utf-8 string")]
    InvalidUtf8,

    #[error("invalid or non-canonical ULEB128")]
    InvalidUleb128,

    #[error("sequence of {0} elements is too long")]
    SequenceTooLong(usize),

    #[error("container depth limit exceeded")]
    DepthExceeded,

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("value does not match schema: expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`DataReader`](crate::client::DataReader) implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("communication error: {0}")]
    Comm(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out after {0}ms")]
    Timeout(u32),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("operation not supported by this reader: {0}")]
    Unsupported(&'static str),
}
