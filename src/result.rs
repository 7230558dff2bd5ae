//! Handle to the output of a command whose arity is not known up front.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::data::Argument;

/// Result of the command at [`index`](Self::index).
///
/// Used directly it is `Result(index)`. [`get`](Self::get) selects one value
/// of a tuple-returning call as `NestedResult(index, i)`; references are
/// created on first use and cached. Nothing is executed or encoded until a
/// later command consumes one of the references.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    index: u16,
    nested: RefCell<BTreeMap<u16, Argument>>,
}

impl TransactionResult {
    pub(crate) fn new(index: u16) -> Self {
        Self {
            index,
            nested: RefCell::new(BTreeMap::new()),
        }
    }

    /// Position of the producing command.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// The whole result as a single argument.
    pub fn arg(&self) -> Argument {
        Argument::Result(self.index)
    }

    /// The `i`-th value of the result.
    pub fn get(&self, i: u16) -> Argument {
        *self
            .nested
            .borrow_mut()
            .entry(i)
            .or_insert(Argument::NestedResult(self.index, i))
    }

    /// Nested references `0, 1, 2, ..`. The sequence does not know the
    /// call's arity, so take only as many as the callee returns.
    pub fn iter(&self) -> impl Iterator<Item = Argument> + '_ {
        (0..=u16::MAX).map(move |i| self.get(i))
    }

    /// Number of nested references handed out so far.
    pub fn materialized(&self) -> usize {
        self.nested.borrow().len()
    }
}

impl From<TransactionResult> for Argument {
    fn from(result: TransactionResult) -> Self {
        result.arg()
    }
}

impl From<&TransactionResult> for Argument {
    fn from(result: &TransactionResult) -> Self {
        result.arg()
    }
}
