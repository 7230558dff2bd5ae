//! Transaction builder.
//!
//! Inputs and commands are added synchronously without network access.
//! [`Transaction::build`] resolves whatever is left open through a
//! [`DataReader`] and returns canonical `TransactionData` bytes.

use crate::bcs::{self, BcsEncode};
use crate::client::DataReader;
use crate::config::{BuildOptions, ProtocolLimits};
use crate::data::{
    Argument, CallArg, Command, ObjectArg, ProgrammableMoveCall, TransactionData,
    TransactionDigest, TransactionExpiration, TransactionKind,
};
use crate::error::BuilderError;
use crate::inputs::{InputKind, InputValue, UnresolvedObject, UnresolvedValue};
use crate::resolve;
use crate::result::TransactionResult;
use crate::snapshot::TransactionSnapshot;
use crate::state::TransactionState;
use crate::type_tag::{parse_move_call_target, parse_type_tag};
use crate::types::{
    Address, ObjectId, ObjectRef, TypeTag, CLOCK_OBJECT_ID, SYSTEM_STATE_OBJECT_ID,
};

/// Initial shared version of the clock and system state objects.
const SYSTEM_OBJECT_SHARED_VERSION: u64 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    state: TransactionState,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn set_sender(&mut self, sender: Address) {
        self.state.sender = Some(sender);
    }

    pub fn set_sender_if_not_set(&mut self, sender: Address) {
        self.state.sender.get_or_insert(sender);
    }

    pub fn set_expiration(&mut self, expiration: TransactionExpiration) {
        self.state.expiration = expiration;
    }

    pub fn set_gas_price(&mut self, price: u64) {
        self.state.gas_config.price = Some(price);
    }

    pub fn set_gas_budget(&mut self, budget: u64) {
        self.state.gas_config.budget = Some(budget);
    }

    pub fn set_gas_owner(&mut self, owner: Address) {
        self.state.gas_config.owner = Some(owner);
    }

    pub fn set_gas_payment(&mut self, payment: Vec<ObjectRef>) {
        self.state.gas_config.payment = Some(payment);
    }

    /// The coin paying for gas.
    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    // --- inputs ---

    /// Encode `value` now and add it as a pure input.
    pub fn pure<T: BcsEncode + ?Sized>(&mut self, value: &T) -> Result<Argument, BuilderError> {
        Ok(self.pure_bytes(bcs::to_bytes(value)?))
    }

    /// Add already-encoded bytes as a pure input.
    pub fn pure_bytes(&mut self, bytes: Vec<u8>) -> Argument {
        self.state
            .add_input(InputKind::Pure, InputValue::Resolved(CallArg::Pure(bytes)))
    }

    /// Add a raw value whose encoding is inferred from the Move call that
    /// uses it. A string passed to an object parameter becomes an object
    /// input.
    pub fn pure_raw(&mut self, value: serde_json::Value) -> Argument {
        self.state.add_input(
            InputKind::Pure,
            InputValue::Unresolved(UnresolvedValue::Pure(value)),
        )
    }

    /// Reference an object by id. Version, digest and ownership are fetched
    /// at build time. An id that is already an input returns that input.
    pub fn object(&mut self, id: ObjectId) -> Argument {
        match self.state.find_object_input(&id) {
            Some(pos) => Argument::Input(self.state.inputs[pos].index),
            None => self.state.add_input(
                InputKind::Object,
                InputValue::Unresolved(UnresolvedValue::Object(UnresolvedObject::new(id))),
            ),
        }
    }

    /// Add an object input, merging it with an existing input for the same
    /// id. A mutable or receiving hint from either side wins and missing
    /// metadata is filled in. Metadata that disagrees with the existing
    /// input is rejected.
    pub fn object_input(&mut self, obj: UnresolvedObject) -> Result<Argument, BuilderError> {
        let Some(pos) = self.state.find_object_input(&obj.object_id) else {
            return Ok(self.state.add_input(
                InputKind::Object,
                InputValue::Unresolved(UnresolvedValue::Object(obj)),
            ));
        };
        let input = &mut self.state.inputs[pos];
        match &mut input.value {
            InputValue::Unresolved(UnresolvedValue::Object(existing)) => {
                merge_unresolved(existing, &obj)?
            }
            InputValue::Resolved(CallArg::Object(existing)) => apply_hints(existing, &obj)?,
            _ => {}
        }
        Ok(Argument::Input(input.index))
    }

    fn resolved_object(&mut self, arg: ObjectArg) -> Result<Argument, BuilderError> {
        let Some(pos) = self.state.find_object_input(&arg.object_id()) else {
            return Ok(self
                .state
                .add_input(InputKind::Object, InputValue::Resolved(CallArg::Object(arg))));
        };
        let input = &mut self.state.inputs[pos];
        let merged = match &mut input.value {
            InputValue::Unresolved(UnresolvedValue::Object(hints)) => {
                let mut arg = arg;
                apply_hints(&mut arg, hints)?;
                Some(arg)
            }
            InputValue::Resolved(CallArg::Object(existing)) => {
                merge_resolved(existing, &arg)?;
                None
            }
            _ => None,
        };
        if let Some(arg) = merged {
            input.resolve(CallArg::Object(arg));
        }
        Ok(Argument::Input(input.index))
    }

    /// An owned or immutable object at a known version.
    pub fn object_ref(&mut self, obj_ref: ObjectRef) -> Result<Argument, BuilderError> {
        self.resolved_object(ObjectArg::ImmOrOwnedObject(obj_ref))
    }

    /// A shared object. Adding the same object again with `mutable` set
    /// makes the single input mutable.
    pub fn shared_object_ref(
        &mut self,
        object_id: ObjectId,
        initial_shared_version: u64,
        mutable: bool,
    ) -> Result<Argument, BuilderError> {
        self.resolved_object(ObjectArg::SharedObject {
            object_id,
            initial_shared_version,
            mutable,
        })
    }

    /// An object sent to another object, to be received by a Move call.
    pub fn receiving_ref(&mut self, obj_ref: ObjectRef) -> Result<Argument, BuilderError> {
        self.resolved_object(ObjectArg::Receiving(obj_ref))
    }

    /// The clock object `0x6`, read-only.
    pub fn clock(&mut self) -> Result<Argument, BuilderError> {
        self.shared_object_ref(CLOCK_OBJECT_ID, SYSTEM_OBJECT_SHARED_VERSION, false)
    }

    /// The system state object `0x5`, mutable.
    pub fn system_state(&mut self) -> Result<Argument, BuilderError> {
        self.shared_object_ref(SYSTEM_STATE_OBJECT_ID, SYSTEM_OBJECT_SHARED_VERSION, true)
    }

    // --- commands ---

    pub fn add_command(&mut self, command: Command) -> TransactionResult {
        TransactionResult::new(self.state.add_command(command))
    }

    /// Call `package::module::function` with textual type arguments.
    pub fn move_call(
        &mut self,
        target: &str,
        type_arguments: &[&str],
        arguments: Vec<Argument>,
    ) -> Result<TransactionResult, BuilderError> {
        let (package, module, function) = parse_move_call_target(target)?;
        let type_arguments = type_arguments
            .iter()
            .map(|t| parse_type_tag(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.add_move_call(ProgrammableMoveCall {
            package,
            module,
            function,
            type_arguments,
            arguments,
        }))
    }

    pub fn add_move_call(&mut self, call: ProgrammableMoveCall) -> TransactionResult {
        self.add_command(Command::MoveCall(Box::new(call)))
    }

    pub fn split_coins(
        &mut self,
        coin: impl Into<Argument>,
        amounts: Vec<Argument>,
    ) -> TransactionResult {
        self.add_command(Command::SplitCoins {
            coin: coin.into(),
            amounts,
        })
    }

    pub fn merge_coins(
        &mut self,
        destination: impl Into<Argument>,
        sources: Vec<Argument>,
    ) -> TransactionResult {
        self.add_command(Command::MergeCoins {
            destination: destination.into(),
            sources,
        })
    }

    pub fn transfer_objects(
        &mut self,
        objects: Vec<Argument>,
        address: impl Into<Argument>,
    ) -> TransactionResult {
        self.add_command(Command::TransferObjects {
            objects,
            address: address.into(),
        })
    }

    pub fn publish(&mut self, modules: Vec<Vec<u8>>, dependencies: Vec<ObjectId>) -> TransactionResult {
        self.add_command(Command::Publish {
            modules,
            dependencies,
        })
    }

    pub fn upgrade(
        &mut self,
        modules: Vec<Vec<u8>>,
        dependencies: Vec<ObjectId>,
        package_id: ObjectId,
        ticket: impl Into<Argument>,
    ) -> TransactionResult {
        self.add_command(Command::Upgrade {
            modules,
            dependencies,
            package_id,
            ticket: ticket.into(),
        })
    }

    pub fn make_move_vec(&mut self, type_: Option<TypeTag>, objects: Vec<Argument>) -> TransactionResult {
        self.add_command(Command::MakeMoveVec { type_, objects })
    }

    /// Split `amount` nanos off the gas coin and send them to `recipient`.
    ///
    /// # Layout
    ///
    /// - inputs:   `[Pure(amount), Pure(recipient)]`
    /// - commands: `[SplitCoins(GasCoin, [Input(0)]), TransferObjects([Result(0)], Input(1))]`
    pub fn transfer_gas(&mut self, recipient: Address, amount: u64) -> Result<TransactionResult, BuilderError> {
        let amount = self.pure(&amount)?;
        let recipient = self.pure(&recipient)?;
        let coin = self.split_coins(Argument::GasCoin, vec![amount]);
        Ok(self.transfer_objects(vec![coin.arg()], recipient))
    }

    // --- build ---

    /// Resolve with default options and serialize `TransactionData`.
    pub async fn build(&mut self, reader: &dyn DataReader) -> Result<Vec<u8>, BuilderError> {
        self.build_with(Some(reader), &BuildOptions::default()).await
    }

    /// Resolve and serialize. Without a reader only locally resolvable
    /// inputs are allowed and gas must be fully set (or
    /// `only_transaction_kind` requested).
    ///
    /// On error the state is left exactly as it was.
    pub async fn build_with(
        &mut self,
        reader: Option<&dyn DataReader>,
        options: &BuildOptions,
    ) -> Result<Vec<u8>, BuilderError> {
        let limits = resolve::resolve(&mut self.state, reader, options).await?;
        serialize(&self.state, options, &limits)
    }

    /// Serialize a fully resolved state without any network access.
    pub fn build_resolved(&self, options: &BuildOptions) -> Result<Vec<u8>, BuilderError> {
        let limits = options.limits.unwrap_or_default();
        self.state.validate_pure_sizes(limits.max_pure_argument_size)?;
        serialize(&self.state, options, &limits)
    }

    /// Build and hash.
    pub async fn digest(&mut self, reader: &dyn DataReader) -> Result<TransactionDigest, BuilderError> {
        Ok(TransactionDigest::of(&self.build(reader).await?))
    }

    /// Digest of a fully resolved state.
    pub fn digest_resolved(&self) -> Result<TransactionDigest, BuilderError> {
        Ok(TransactionDigest::of(&self.build_resolved(&BuildOptions::default())?))
    }

    /// Restore a transaction from serialized `TransactionData`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BuilderError> {
        Ok(Self {
            state: TransactionState::from_transaction_data(TransactionData::from_bytes(bytes)?),
        })
    }

    /// Restore a transaction from a serialized `TransactionKind`. Sender and
    /// gas are left unset.
    pub fn from_kind_bytes(bytes: &[u8]) -> Result<Self, BuilderError> {
        Ok(Self {
            state: TransactionState::from_kind(TransactionKind::from_bytes(bytes)?),
        })
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        TransactionSnapshot::from_state(&self.state)
    }

    pub fn from_snapshot(snapshot: TransactionSnapshot) -> Result<Self, BuilderError> {
        Ok(Self {
            state: snapshot.into_state()?,
        })
    }

    pub fn to_json(&self) -> Result<String, BuilderError> {
        self.snapshot().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self, BuilderError> {
        Self::from_snapshot(TransactionSnapshot::from_json(json)?)
    }
}

fn merge_flag(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (None, None) => None,
        _ => Some(false),
    }
}

fn conflict(object_id: ObjectId, reason: String) -> BuilderError {
    BuilderError::ConflictingObjectInput { object_id, reason }
}

fn same_or_missing<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn merge_unresolved(
    existing: &mut UnresolvedObject,
    obj: &UnresolvedObject,
) -> Result<(), BuilderError> {
    if !same_or_missing(existing.version, obj.version)
        || !same_or_missing(existing.digest, obj.digest)
        || !same_or_missing(existing.initial_shared_version, obj.initial_shared_version)
    {
        return Err(conflict(
            obj.object_id,
            format!("{existing:?} disagrees with {obj:?}"),
        ));
    }
    existing.mutable = merge_flag(existing.mutable, obj.mutable);
    existing.receiving = merge_flag(existing.receiving, obj.receiving);
    existing.version = existing.version.or(obj.version);
    existing.digest = existing.digest.or(obj.digest);
    existing.initial_shared_version = existing.initial_shared_version.or(obj.initial_shared_version);
    Ok(())
}

/// Fold the hints of an unresolved reference into a resolved argument.
fn apply_hints(arg: &mut ObjectArg, hints: &UnresolvedObject) -> Result<(), BuilderError> {
    let object_id = arg.object_id();
    match *arg {
        ObjectArg::SharedObject {
            initial_shared_version,
            ref mut mutable,
            ..
        } => {
            if !same_or_missing(Some(initial_shared_version), hints.initial_shared_version) {
                return Err(conflict(
                    object_id,
                    format!("shared since version {initial_shared_version}, not {hints:?}"),
                ));
            }
            if hints.receiving == Some(true) {
                return Err(conflict(object_id, "a shared object cannot be received".into()));
            }
            *mutable |= hints.mutable == Some(true);
        }
        ObjectArg::ImmOrOwnedObject(obj_ref) | ObjectArg::Receiving(obj_ref) => {
            if hints.initial_shared_version.is_some()
                || !same_or_missing(Some(obj_ref.version), hints.version)
                || !same_or_missing(Some(obj_ref.digest), hints.digest)
            {
                return Err(conflict(object_id, format!("{obj_ref:?} disagrees with {hints:?}")));
            }
            if hints.receiving == Some(true) {
                *arg = ObjectArg::Receiving(obj_ref);
            }
        }
    }
    Ok(())
}

/// Merge a second resolved reference to the same object. Shared references
/// at the same version combine their mutability; anything else must match.
fn merge_resolved(existing: &mut ObjectArg, incoming: &ObjectArg) -> Result<(), BuilderError> {
    let merged = match (&mut *existing, incoming) {
        (
            ObjectArg::SharedObject {
                initial_shared_version: a,
                mutable,
                ..
            },
            ObjectArg::SharedObject {
                initial_shared_version: b,
                mutable: m,
                ..
            },
        ) if *a == *b => {
            *mutable |= *m;
            true
        }
        _ => false,
    };
    if merged || *existing == *incoming {
        Ok(())
    } else {
        Err(conflict(
            incoming.object_id(),
            format!("{existing:?}, cannot also add {incoming:?}"),
        ))
    }
}

fn serialize(
    state: &TransactionState,
    options: &BuildOptions,
    limits: &ProtocolLimits,
) -> Result<Vec<u8>, BuilderError> {
    let max = usize::try_from(limits.max_tx_size_bytes).unwrap_or(usize::MAX);
    let bytes = if options.only_transaction_kind {
        bcs::to_bytes_with_limit(&state.to_kind()?, max)?
    } else {
        bcs::to_bytes_with_limit(&state.to_transaction_data()?, max)?
    };
    log::debug!("serialized transaction: {} bytes", bytes.len());
    Ok(bytes)
}
