//! Move call signatures and signature-driven encoding of raw pure inputs.

use std::collections::{BTreeMap, HashMap};

use futures::future::try_join_all;
use serde_json::Value;

use crate::client::DataReader;
use crate::data::{Argument, CallArg, Command};
use crate::error::BuilderError;
use crate::inputs::{Input, UnresolvedObject};
use crate::normalized::NormalizedType;
use crate::pure::{encode_pure, pure_serialization_type, PureType};
use crate::state::TransactionState;
use crate::types::ObjectId;

/// Caller-supplied parameters (trailing `TxContext` removed) per Move call
/// command index.
pub type Signatures = HashMap<usize, Vec<NormalizedType>>;

fn uses_unresolved_input(state: &TransactionState, arguments: &[Argument]) -> bool {
    arguments.iter().any(|arg| match arg {
        Argument::Input(i) => state
            .inputs
            .get(usize::from(*i))
            .is_some_and(|input| !input.is_resolved()),
        _ => false,
    })
}

/// Fetch, once per distinct target, the signature of every Move call that
/// has an unresolved input, and check its argument count.
pub async fn fetch_signatures(
    state: &TransactionState,
    reader: Option<&dyn DataReader>,
) -> Result<Signatures, BuilderError> {
    let mut targets = BTreeMap::new();
    let mut needed = Vec::new();
    for (index, cmd) in state.commands.iter().enumerate() {
        let Command::MoveCall(call) = cmd else {
            continue;
        };
        if !uses_unresolved_input(state, &call.arguments) {
            continue;
        }
        let target = call.target();
        targets
            .entry(target.clone())
            .or_insert_with(|| (call.package, call.module.clone(), call.function.clone()));
        needed.push((index, target));
    }
    if needed.is_empty() {
        return Ok(Signatures::new());
    }

    let reader = super::require(reader, "Move function signatures")?;
    log::debug!("fetching {} Move function signatures", targets.len());

    let fetched = try_join_all(targets.into_iter().map(
        |(target, (package, module, function))| async move {
            match reader
                .get_normalized_move_function(&package, &module, &function)
                .await
            {
                Ok(func) => Ok((target, func)),
                Err(source) => Err(BuilderError::FunctionLookup { target, source }),
            }
        },
    ))
    .await?;
    let functions: HashMap<_, _> = fetched.into_iter().collect();

    let mut signatures = Signatures::new();
    for (index, target) in needed {
        let (Some(func), Command::MoveCall(call)) = (functions.get(&target), &state.commands[index])
        else {
            continue;
        };
        let params = func.input_parameters();
        if params.len() != call.arguments.len() {
            return Err(BuilderError::ArgumentCountMismatch {
                command: index,
                target,
                expected: params.len(),
                actual: call.arguments.len(),
            });
        }
        signatures.insert(index, params.to_vec());
    }
    Ok(signatures)
}

fn is_object_parameter(param: &NormalizedType) -> bool {
    if param.struct_tag().is_some() {
        return true;
    }
    match param {
        NormalizedType::TypeParameter(_) => true,
        NormalizedType::Reference(t) | NormalizedType::MutableReference(t) => {
            matches!(t.as_ref(), NormalizedType::TypeParameter(_))
        }
        _ => false,
    }
}

fn encode_raw(input: &mut Input, ty: &PureType, raw: &Value) -> Result<(), BuilderError> {
    let bytes = encode_pure(ty, raw).map_err(|e| BuilderError::InvalidPureArgument {
        input: input.index,
        reason: format!("cannot encode {raw} as {ty}: {e}"),
    })?;
    log::trace!("input {}: encoded as {ty}", input.index);
    input.resolve(CallArg::Pure(bytes));
    Ok(())
}

/// Encode raw pure inputs passed to Move calls, or turn them into object
/// inputs when the parameter is an object.
pub fn resolve_pure_arguments(
    state: &mut TransactionState,
    signatures: &Signatures,
) -> Result<(), BuilderError> {
    let TransactionState {
        inputs, commands, ..
    } = state;

    for (command, cmd) in commands.iter().enumerate() {
        let Command::MoveCall(call) = cmd else {
            continue;
        };
        let Some(params) = signatures.get(&command) else {
            continue;
        };
        for (argument, (arg, param)) in call.arguments.iter().zip(params).enumerate() {
            let Argument::Input(i) = *arg else {
                continue;
            };
            let Some(input) = inputs.get_mut(usize::from(i)) else {
                continue;
            };
            let Some(raw) = input.raw_pure().cloned() else {
                continue;
            };

            let ty = pure_serialization_type(param, Some(&raw)).map_err(|e| {
                BuilderError::InvalidPureArgument {
                    input: i,
                    reason: format!("parameter {param}: {e}"),
                }
            })?;
            if let Some(ty) = ty {
                encode_raw(input, &ty, &raw)?;
            } else if is_object_parameter(param) {
                let expected = || BuilderError::ExpectedObjectId {
                    input: i,
                    value: raw.to_string(),
                };
                let id: ObjectId = raw
                    .as_str()
                    .ok_or_else(expected)?
                    .parse()
                    .map_err(|_| expected())?;
                log::trace!("input {i}: object {id} for parameter {param}");
                input.set_unresolved_object(UnresolvedObject::new(id));
            } else {
                return Err(BuilderError::UnsupportedParameterType {
                    command,
                    argument,
                    parameter: param.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Raw pure inputs used by built-in commands have a fixed type: split
/// amounts are `u64`, transfer recipients are addresses, elements of a
/// `MakeMoveVec` with a primitive type take that type.
pub fn resolve_builtin_arguments(state: &mut TransactionState) -> Result<(), BuilderError> {
    let TransactionState {
        inputs, commands, ..
    } = state;

    for cmd in commands.iter() {
        let typed: Vec<(Argument, PureType)> = match cmd {
            Command::SplitCoins { amounts, .. } => {
                amounts.iter().map(|a| (*a, PureType::U64)).collect()
            }
            Command::TransferObjects { address, .. } => vec![(*address, PureType::Address)],
            Command::MakeMoveVec {
                type_: Some(tag),
                objects,
            } => match PureType::from_type_tag(tag) {
                Some(ty) => objects.iter().map(|a| (*a, ty.clone())).collect(),
                None => continue,
            },
            _ => continue,
        };
        for (arg, ty) in typed {
            let Argument::Input(i) = arg else {
                continue;
            };
            let Some(input) = inputs.get_mut(usize::from(i)) else {
                continue;
            };
            let Some(raw) = input.raw_pure().cloned() else {
                continue;
            };
            encode_raw(input, &ty, &raw)?;
        }
    }
    Ok(())
}
