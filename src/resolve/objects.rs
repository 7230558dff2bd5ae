//! Object lookup and classification of object inputs.

use std::collections::{BTreeSet, HashMap};

use futures::future::try_join_all;

use super::calls::Signatures;
use crate::client::{DataReader, ObjectRecord, ObjectResponse};
use crate::config::BuildOptions;
use crate::data::{Argument, CallArg, Command, ObjectArg};
use crate::error::{BuilderError, InvalidObject};
use crate::inputs::{InputValue, UnresolvedValue};
use crate::state::TransactionState;
use crate::types::{ObjectId, Owner};

/// Fetch `ids` in chunks of `per_request`, concurrently.
///
/// Fails with [`BuilderError::DuplicateObjectIds`] if an id repeats, and with
/// [`BuilderError::InvalidObjects`] listing every id that errored or was not
/// returned. Records come back in the order of `ids`.
pub async fn fetch_objects(
    reader: &dyn DataReader,
    ids: &[ObjectId],
    per_request: usize,
) -> Result<Vec<ObjectRecord>, BuilderError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for id in ids {
        if !seen.insert(*id) {
            duplicates.insert(*id);
        }
    }
    if !duplicates.is_empty() {
        return Err(BuilderError::DuplicateObjectIds(duplicates.into_iter().collect()));
    }

    let per_request = per_request.max(1);
    let requests = ids.chunks(per_request).len();
    log::debug!("fetching {} objects in {} requests", ids.len(), requests);
    let responses =
        try_join_all(ids.chunks(per_request).map(|chunk| reader.multi_get_objects(chunk))).await?;

    let mut found = HashMap::new();
    let mut errors = HashMap::new();
    for response in responses.into_iter().flatten() {
        match response {
            ObjectResponse::Data(record) => {
                found.insert(record.object_id, record);
            }
            ObjectResponse::Error { object_id, reason } => {
                errors.insert(object_id, reason);
            }
        }
    }

    let mut records = Vec::with_capacity(ids.len());
    let mut invalid = Vec::new();
    for id in ids {
        match (found.remove(id), errors.remove(id)) {
            (Some(record), None) => records.push(record),
            (_, Some(reason)) => invalid.push(InvalidObject {
                object_id: *id,
                reason,
            }),
            (None, None) => invalid.push(InvalidObject {
                object_id: *id,
                reason: "not found".into(),
            }),
        }
    }
    if !invalid.is_empty() {
        return Err(BuilderError::InvalidObjects(invalid));
    }
    Ok(records)
}

/// How the commands use one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ObjectUsage {
    pub mutable: bool,
    pub receiving: bool,
}

/// Merge every signal about each object id. Any mutable signal wins.
pub(crate) fn object_usage(
    state: &TransactionState,
    signatures: &Signatures,
) -> HashMap<ObjectId, ObjectUsage> {
    let mut usage: HashMap<ObjectId, ObjectUsage> = HashMap::new();
    let object_of = |arg: &Argument| match arg {
        Argument::Input(i) => state.inputs.get(usize::from(*i)).and_then(|input| input.object_id()),
        _ => None,
    };

    for input in &state.inputs {
        match &input.value {
            InputValue::Unresolved(UnresolvedValue::Object(obj)) => {
                let entry = usage.entry(obj.object_id).or_default();
                entry.mutable |= obj.mutable == Some(true);
                entry.receiving |= obj.receiving == Some(true);
            }
            InputValue::Resolved(CallArg::Object(ObjectArg::SharedObject {
                object_id,
                mutable: true,
                ..
            })) => usage.entry(*object_id).or_default().mutable = true,
            _ => {}
        }
    }

    for (index, cmd) in state.commands.iter().enumerate() {
        let by_value: Vec<Argument> = match cmd {
            Command::MoveCall(call) => {
                let Some(params) = signatures.get(&index) else {
                    continue;
                };
                for (arg, param) in call.arguments.iter().zip(params) {
                    let Some(id) = object_of(arg) else {
                        continue;
                    };
                    let entry = usage.entry(id).or_default();
                    if param.is_receiving() {
                        entry.receiving = true;
                    } else if param.is_mutable_use() {
                        entry.mutable = true;
                    }
                }
                continue;
            }
            Command::TransferObjects { objects, .. } => objects.clone(),
            Command::SplitCoins { coin, .. } => vec![*coin],
            Command::MergeCoins {
                destination,
                sources,
            } => {
                let mut args = vec![*destination];
                args.extend_from_slice(sources);
                args
            }
            Command::MakeMoveVec { objects, .. } => objects.clone(),
            Command::Upgrade { ticket, .. } => vec![*ticket],
            Command::Publish { .. } => continue,
        };
        for id in by_value.iter().filter_map(object_of) {
            usage.entry(id).or_default().mutable = true;
        }
    }
    usage
}

fn classify(record: &ObjectRecord, usage: ObjectUsage) -> ObjectArg {
    match record.owner {
        Owner::Shared {
            initial_shared_version,
        } => ObjectArg::SharedObject {
            object_id: record.object_id,
            initial_shared_version,
            mutable: usage.mutable,
        },
        _ if usage.receiving => ObjectArg::Receiving(record.object_ref()),
        _ => ObjectArg::ImmOrOwnedObject(record.object_ref()),
    }
}

/// Resolve every unresolved object input, locally when the caller supplied
/// enough metadata and otherwise with one batched fetch per distinct id.
pub async fn resolve_objects(
    state: &mut TransactionState,
    reader: Option<&dyn DataReader>,
    signatures: &Signatures,
    options: &BuildOptions,
) -> Result<(), BuilderError> {
    let usage = object_usage(state, signatures);
    let usage_of = |id: &ObjectId| usage.get(id).copied().unwrap_or_default();

    for input in &mut state.inputs {
        if let InputValue::Resolved(CallArg::Object(ObjectArg::SharedObject {
            object_id,
            mutable: mutable @ false,
            ..
        })) = &mut input.value
        {
            if usage_of(object_id).mutable {
                log::trace!("input {}: shared {} used mutably", input.index, object_id);
                *mutable = true;
            }
        }
    }

    let mut to_fetch = Vec::new();
    let mut queued = BTreeSet::new();
    for input in &mut state.inputs {
        let InputValue::Unresolved(UnresolvedValue::Object(obj)) = &input.value else {
            continue;
        };
        let u = usage_of(&obj.object_id);
        if let Some(arg) = obj.local_object_arg(u.mutable, u.receiving) {
            log::trace!("input {}: resolved {} locally", input.index, obj.object_id);
            input.resolve(CallArg::Object(arg));
        } else if queued.insert(obj.object_id) {
            to_fetch.push(obj.object_id);
        }
    }
    if to_fetch.is_empty() {
        return Ok(());
    }

    let reader = super::require(reader, "object references")?;
    let records = fetch_objects(reader, &to_fetch, options.max_objects_per_fetch).await?;
    let records: HashMap<ObjectId, ObjectRecord> =
        records.into_iter().map(|r| (r.object_id, r)).collect();

    for input in &mut state.inputs {
        let InputValue::Unresolved(UnresolvedValue::Object(obj)) = &input.value else {
            continue;
        };
        let Some(record) = records.get(&obj.object_id) else {
            continue;
        };
        let arg = classify(record, usage_of(&obj.object_id));
        log::trace!("input {}: {:?}", input.index, arg);
        input.resolve(CallArg::Object(arg));
    }
    Ok(())
}
