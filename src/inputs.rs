//! Transaction inputs before and after resolution.

use crate::data::{CallArg, ObjectArg};
use crate::types::{ObjectDigest, ObjectId, ObjectRef};

/// How an input is used on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Pure,
    Object,
}

/// An object input the caller referenced by id, possibly with partial
/// metadata.
///
/// `version` + `digest` or `initial_shared_version` let the input resolve
/// without a fetch. `mutable` and `receiving` are hints that are merged with
/// whatever the commands using the object imply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnresolvedObject {
    pub object_id: ObjectId,
    pub version: Option<u64>,
    pub digest: Option<ObjectDigest>,
    pub initial_shared_version: Option<u64>,
    pub mutable: Option<bool>,
    pub receiving: Option<bool>,
}

impl UnresolvedObject {
    pub fn new(object_id: ObjectId) -> Self {
        Self {
            object_id,
            ..Self::default()
        }
    }

    /// Metadata the caller already supplied, if enough to build an
    /// [`ObjectArg`] without asking the network.
    pub fn local_object_arg(&self, mutable: bool, receiving: bool) -> Option<ObjectArg> {
        if let Some(initial_shared_version) = self.initial_shared_version {
            return Some(ObjectArg::SharedObject {
                object_id: self.object_id,
                initial_shared_version,
                mutable,
            });
        }
        let (version, digest) = (self.version?, self.digest?);
        let obj_ref = ObjectRef::new(self.object_id, version, digest);
        Some(if receiving {
            ObjectArg::Receiving(obj_ref)
        } else {
            ObjectArg::ImmOrOwnedObject(obj_ref)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedValue {
    /// A raw JSON value whose encoding is inferred from the callee's
    /// signature. Older serialized shapes (`{"Pure": ..}`, `{"Object": ..}`)
    /// are also carried here until resolution migrates them.
    Pure(serde_json::Value),
    Object(UnresolvedObject),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Unresolved(UnresolvedValue),
    Resolved(CallArg),
}

/// One entry of the input list. `index` always equals the position.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub(crate) index: u16,
    pub(crate) kind: InputKind,
    pub(crate) value: InputValue,
}

impl Input {
    pub(crate) fn new(index: u16, kind: InputKind, value: InputValue) -> Self {
        Self { index, kind, value }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn value(&self) -> &InputValue {
        &self.value
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.value, InputValue::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&CallArg> {
        match &self.value {
            InputValue::Resolved(arg) => Some(arg),
            InputValue::Unresolved(_) => None,
        }
    }

    /// Object id of an object input, resolved or not.
    pub fn object_id(&self) -> Option<ObjectId> {
        match &self.value {
            InputValue::Resolved(arg) => arg.object_id(),
            InputValue::Unresolved(UnresolvedValue::Object(obj)) => Some(obj.object_id),
            InputValue::Unresolved(UnresolvedValue::Pure(_)) => None,
        }
    }

    /// Raw value still waiting for a signature-derived encoding.
    pub(crate) fn raw_pure(&self) -> Option<&serde_json::Value> {
        match &self.value {
            InputValue::Unresolved(UnresolvedValue::Pure(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn resolve(&mut self, arg: CallArg) {
        self.kind = match arg {
            CallArg::Pure(_) => InputKind::Pure,
            CallArg::Object(_) => InputKind::Object,
        };
        self.value = InputValue::Resolved(arg);
    }

    pub(crate) fn set_unresolved_object(&mut self, obj: UnresolvedObject) {
        self.kind = InputKind::Object;
        self.value = InputValue::Unresolved(UnresolvedValue::Object(obj));
    }
}
