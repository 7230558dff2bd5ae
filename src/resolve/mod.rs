//! Resolution of everything the caller left unspecified.
//!
//! One pass runs these steps in order:
//!
//! 1. migrate legacy argument shapes ([`crate::legacy`])
//! 2. fetch the signatures of Move calls that use unresolved inputs and
//!    encode raw pure values accordingly ([`calls`])
//! 3. fetch and classify object inputs ([`objects`])
//! 4. check pure argument sizes
//! 5. gas price, payment and budget, unless building only the kind ([`gas`])
//!
//! The pass works on a copy of the state. The caller's state is replaced
//! only when every step succeeded.

pub mod calls;
pub mod gas;
pub mod objects;

use crate::client::DataReader;
use crate::config::{BuildOptions, ProtocolLimits};
use crate::error::BuilderError;
use crate::legacy::{is_legacy_argument, normalize_legacy_argument};
use crate::state::TransactionState;

pub use gas::estimate_gas_budget;
pub use objects::fetch_objects;

/// The reader, or an error naming what needed it.
pub(crate) fn require<'a>(
    reader: Option<&'a dyn DataReader>,
    what: &'static str,
) -> Result<&'a dyn DataReader, BuilderError> {
    reader.ok_or(BuilderError::ClientRequired(what))
}

/// Limits from the options, else from the reader, else the defaults.
pub async fn protocol_limits(
    reader: Option<&dyn DataReader>,
    options: &BuildOptions,
) -> ProtocolLimits {
    if let Some(limits) = options.limits {
        return limits;
    }
    let Some(reader) = reader else {
        log::debug!("no data reader, using default protocol limits");
        return ProtocolLimits::default();
    };
    match reader.get_protocol_limits().await {
        Ok(limits) => limits,
        Err(e) => {
            log::warn!("failed to fetch protocol limits, using defaults: {e}");
            ProtocolLimits::default()
        }
    }
}

fn normalize_legacy_inputs(state: &mut TransactionState) -> Result<(), BuilderError> {
    for input in &mut state.inputs {
        let arg = match input.raw_pure() {
            Some(raw) if is_legacy_argument(raw) => normalize_legacy_argument(raw)?,
            _ => continue,
        };
        log::trace!("input {}: migrated legacy argument", input.index);
        input.resolve(arg);
    }
    Ok(())
}

/// Resolve `state` in place and return the limits the pass used.
pub async fn resolve(
    state: &mut TransactionState,
    reader: Option<&dyn DataReader>,
    options: &BuildOptions,
) -> Result<ProtocolLimits, BuilderError> {
    state.validate_references()?;
    let limits = protocol_limits(reader, options).await;

    let mut working = state.clone();
    normalize_legacy_inputs(&mut working)?;

    let signatures = calls::fetch_signatures(&working, reader).await?;
    calls::resolve_pure_arguments(&mut working, &signatures)?;
    calls::resolve_builtin_arguments(&mut working)?;

    objects::resolve_objects(&mut working, reader, &signatures, options).await?;

    working.validate_pure_sizes(limits.max_pure_argument_size)?;

    if !options.only_transaction_kind {
        gas::resolve_gas(&mut working, reader, options, &limits).await?;
    }

    *state = working;
    Ok(limits)
}
