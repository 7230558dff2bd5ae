//! The builder's accumulated state and its conversion into wire types.

use std::collections::BTreeSet;

use crate::data::{
    Argument, CallArg, Command, GasData, ProgrammableTransaction, TransactionData,
    TransactionDataV1, TransactionExpiration, TransactionKind,
};
use crate::error::BuilderError;
use crate::inputs::{Input, InputKind, InputValue};
use crate::types::{Address, ObjectId, ObjectRef};

/// Inputs and commands are addressed with `u16`.
pub const MAX_ARGUMENTS: usize = u16::MAX as usize + 1;

/// Gas parameters. Unset fields are filled in by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasConfig {
    pub budget: Option<u64>,
    pub price: Option<u64>,
    pub payment: Option<Vec<ObjectRef>>,
    /// Defaults to the sender.
    pub owner: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionState {
    pub(crate) sender: Option<Address>,
    pub(crate) expiration: TransactionExpiration,
    pub(crate) gas_config: GasConfig,
    pub(crate) inputs: Vec<Input>,
    pub(crate) commands: Vec<Command>,
}

impl TransactionState {
    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    pub fn expiration(&self) -> TransactionExpiration {
        self.expiration
    }

    pub fn gas_config(&self) -> &GasConfig {
        &self.gas_config
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Append an input. Indices past `u16::MAX` saturate and are rejected
    /// at build time.
    pub(crate) fn add_input(&mut self, kind: InputKind, value: InputValue) -> Argument {
        let index = u16::try_from(self.inputs.len()).unwrap_or(u16::MAX);
        self.inputs.push(Input::new(index, kind, value));
        Argument::Input(index)
    }

    pub(crate) fn add_command(&mut self, command: Command) -> u16 {
        let index = u16::try_from(self.commands.len()).unwrap_or(u16::MAX);
        self.commands.push(command);
        index
    }

    /// Position of the first object input referring to `id`.
    pub(crate) fn find_object_input(&self, id: &ObjectId) -> Option<usize> {
        self.inputs
            .iter()
            .position(|input| input.kind == InputKind::Object && input.object_id() == Some(*id))
    }

    /// Ids of all object inputs, resolved or not.
    pub(crate) fn object_ids(&self) -> BTreeSet<ObjectId> {
        self.inputs.iter().filter_map(Input::object_id).collect()
    }

    /// Every command only references existing inputs and earlier commands.
    pub fn validate_references(&self) -> Result<(), BuilderError> {
        if self.inputs.len() > MAX_ARGUMENTS {
            return Err(BuilderError::TooManyInputs(self.inputs.len()));
        }
        if self.commands.len() > MAX_ARGUMENTS {
            return Err(BuilderError::TooManyCommands(self.commands.len()));
        }
        for (command, cmd) in self.commands.iter().enumerate() {
            for argument in cmd.arguments() {
                let ok = match argument {
                    Argument::GasCoin => true,
                    Argument::Input(i) => usize::from(i) < self.inputs.len(),
                    Argument::Result(j) | Argument::NestedResult(j, _) => usize::from(j) < command,
                };
                if !ok {
                    return Err(BuilderError::InvalidArgumentReference { command, argument });
                }
            }
        }
        Ok(())
    }

    /// Reject pure inputs larger than `max` bytes.
    pub fn validate_pure_sizes(&self, max: u64) -> Result<(), BuilderError> {
        for input in &self.inputs {
            if let Some(CallArg::Pure(bytes)) = input.resolved() {
                if bytes.len() as u64 > max {
                    return Err(BuilderError::PureArgumentTooLarge {
                        input: input.index,
                        size: bytes.len(),
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    fn resolved_inputs(&self) -> Result<Vec<CallArg>, BuilderError> {
        self.inputs
            .iter()
            .map(|input| {
                input
                    .resolved()
                    .cloned()
                    .ok_or(BuilderError::UnresolvedInput(input.index))
            })
            .collect()
    }

    /// The programmable transaction. Every input must be resolved.
    pub fn to_kind(&self) -> Result<TransactionKind, BuilderError> {
        self.validate_references()?;
        Ok(TransactionKind::ProgrammableTransaction(
            ProgrammableTransaction {
                inputs: self.resolved_inputs()?,
                commands: self.commands.clone(),
            },
        ))
    }

    /// The full envelope. Sender, gas budget, price and payment must be set.
    pub fn to_transaction_data(&self) -> Result<TransactionData, BuilderError> {
        let sender = self.sender.ok_or(BuilderError::MissingSender)?;
        let budget = self.gas_config.budget.ok_or(BuilderError::MissingGasBudget)?;
        let price = self.gas_config.price.ok_or(BuilderError::MissingGasPrice)?;
        let payment = self
            .gas_config
            .payment
            .clone()
            .ok_or(BuilderError::MissingGasPayment)?;
        Ok(TransactionData::V1(TransactionDataV1 {
            kind: self.to_kind()?,
            sender,
            gas_data: GasData {
                payment,
                owner: self.gas_config.owner.unwrap_or(sender),
                price,
                budget,
            },
            expiration: self.expiration,
        }))
    }

    pub fn from_kind(kind: TransactionKind) -> Self {
        let TransactionKind::ProgrammableTransaction(pt) = kind;
        let mut state = Self::default();
        for arg in pt.inputs {
            let kind = match arg {
                CallArg::Pure(_) => InputKind::Pure,
                CallArg::Object(_) => InputKind::Object,
            };
            state.add_input(kind, InputValue::Resolved(arg));
        }
        state.commands = pt.commands;
        state
    }

    pub fn from_transaction_data(data: TransactionData) -> Self {
        let TransactionData::V1(v1) = data;
        let mut state = Self::from_kind(v1.kind);
        state.sender = Some(v1.sender);
        state.expiration = v1.expiration;
        state.gas_config = GasConfig {
            budget: Some(v1.gas_data.budget),
            price: Some(v1.gas_data.price),
            payment: Some(v1.gas_data.payment),
            owner: Some(v1.gas_data.owner),
        };
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::UnresolvedValue;

    fn pure(state: &mut TransactionState, bytes: Vec<u8>) -> Argument {
        state.add_input(InputKind::Pure, InputValue::Resolved(CallArg::Pure(bytes)))
    }

    #[test]
    fn indices_follow_position() {
        let mut state = TransactionState::default();
        assert_eq!(pure(&mut state, vec![1]), Argument::Input(0));
        assert_eq!(pure(&mut state, vec![2]), Argument::Input(1));
        assert_eq!(state.inputs()[1].index(), 1);
    }

    #[test]
    fn forward_result_reference_rejected() {
        let mut state = TransactionState::default();
        let amount = pure(&mut state, 5u64.to_le_bytes().to_vec());
        state.add_command(Command::SplitCoins {
            coin: Argument::Result(0),
            amounts: vec![amount],
        });
        assert!(matches!(
            state.to_kind(),
            Err(BuilderError::InvalidArgumentReference {
                command: 0,
                argument: Argument::Result(0)
            })
        ));
    }

    #[test]
    fn missing_input_reference_rejected() {
        let mut state = TransactionState::default();
        state.add_command(Command::TransferObjects {
            objects: vec![Argument::GasCoin],
            address: Argument::Input(3),
        });
        assert!(matches!(
            state.validate_references(),
            Err(BuilderError::InvalidArgumentReference { .. })
        ));
    }

    #[test]
    fn unresolved_input_blocks_serialization() {
        let mut state = TransactionState::default();
        state.add_input(
            InputKind::Pure,
            InputValue::Unresolved(UnresolvedValue::Pure(serde_json::json!(1))),
        );
        assert!(matches!(
            state.to_kind(),
            Err(BuilderError::UnresolvedInput(0))
        ));
    }

    #[test]
    fn gas_fields_required() {
        let mut state = TransactionState::default();
        assert!(matches!(
            state.to_transaction_data(),
            Err(BuilderError::MissingSender)
        ));
        state.sender = Some(Address::from_short(1));
        assert!(matches!(
            state.to_transaction_data(),
            Err(BuilderError::MissingGasBudget)
        ));
        state.gas_config.budget = Some(10);
        state.gas_config.price = Some(1);
        assert!(matches!(
            state.to_transaction_data(),
            Err(BuilderError::MissingGasPayment)
        ));
        state.gas_config.payment = Some(vec![]);
        let data = state.to_transaction_data().unwrap();
        assert_eq!(data.v1().gas_data.owner, Address::from_short(1));
    }

    #[test]
    fn pure_size_limit() {
        let mut state = TransactionState::default();
        pure(&mut state, vec![0; 10]);
        assert!(state.validate_pure_sizes(10).is_ok());
        assert!(matches!(
            state.validate_pure_sizes(9),
            Err(BuilderError::PureArgumentTooLarge {
                input: 0,
                size: 10,
                max: 9
            })
        ));
    }
}
