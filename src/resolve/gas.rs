//! Gas price, payment and budget.

use crate::client::{CoinRecord, DataReader, ExecutionStatus, GasCostSummary};
use crate::config::{BuildOptions, ProtocolLimits};
use crate::error::BuilderError;
use crate::state::TransactionState;
use crate::types::ObjectRef;

/// Budget from a dry-run cost summary.
///
/// `base = computation + safe_overhead * gas_price`, and the budget is
/// `max(base, base + storage - rebate)`.
pub fn estimate_gas_budget(summary: &GasCostSummary, gas_price: u64, safe_overhead: u64) -> u64 {
    let overhead = i128::from(safe_overhead) * i128::from(gas_price);
    let base = i128::from(summary.computation_cost) + overhead;
    let with_storage =
        base + i128::from(summary.storage_cost) - i128::from(summary.storage_rebate);
    let budget = base.max(with_storage);
    u64::try_from(budget).unwrap_or(u64::MAX)
}

/// Fill in whatever gas fields are unset: price, then payment, then budget.
pub async fn resolve_gas(
    state: &mut TransactionState,
    reader: Option<&dyn DataReader>,
    options: &BuildOptions,
    limits: &ProtocolLimits,
) -> Result<(), BuilderError> {
    let price = match state.gas_config.price {
        Some(price) => price,
        None => {
            let price = super::require(reader, "the gas price")?
                .get_reference_gas_price()
                .await?;
            log::debug!("reference gas price: {price}");
            state.gas_config.price = Some(price);
            price
        }
    };

    if state.gas_config.payment.is_none() {
        let owner = state
            .gas_config
            .owner
            .or(state.sender)
            .ok_or(BuilderError::MissingSender)?;
        let coins = super::require(reader, "the gas payment")?
            .get_coins(&owner, &options.gas_coin_type)
            .await?;
        let used = state.object_ids();
        let max = usize::try_from(limits.max_gas_objects.saturating_sub(1)).unwrap_or(usize::MAX);
        let payment: Vec<ObjectRef> = coins
            .iter()
            .filter(|coin| !used.contains(&coin.coin_object_id))
            .take(max)
            .map(CoinRecord::object_ref)
            .collect();
        if payment.is_empty() {
            return Err(BuilderError::NoGasCoins(owner));
        }
        log::debug!("selected {} of {} gas coins for {owner}", payment.len(), coins.len());
        state.gas_config.payment = Some(payment);
    }

    if state.gas_config.budget.is_none() {
        let reader = super::require(reader, "the gas budget")?;
        let mut provisional = state.clone();
        provisional.gas_config.budget = Some(limits.max_tx_gas);
        provisional.gas_config.payment = Some(Vec::new());
        let tx_bytes = provisional.to_transaction_data()?.to_bytes()?;

        let result = reader.dry_run_transaction(&tx_bytes).await?;
        if let ExecutionStatus::Failure { error } = result.status {
            return Err(BuilderError::DryRunFailed(error));
        }
        let budget = estimate_gas_budget(&result.gas_used, price, options.gas_safe_overhead);
        log::debug!("gas budget {budget} from dry run {:?}", result.gas_used);
        state.gas_config.budget = Some(budget);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_includes_net_storage() {
        let summary = GasCostSummary {
            computation_cost: 100,
            storage_cost: 50,
            storage_rebate: 20,
            non_refundable_storage_fee: 0,
        };
        assert_eq!(estimate_gas_budget(&summary, 1, 1000), 1130);
    }

    #[test]
    fn rebate_larger_than_storage_keeps_base() {
        let summary = GasCostSummary {
            computation_cost: 100,
            storage_cost: 10,
            storage_rebate: 500,
            non_refundable_storage_fee: 0,
        };
        assert_eq!(estimate_gas_budget(&summary, 2, 1000), 2100);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let summary = GasCostSummary {
            computation_cost: u64::MAX,
            storage_cost: u64::MAX,
            storage_rebate: 0,
            non_refundable_storage_fee: 0,
        };
        assert_eq!(estimate_gas_budget(&summary, u64::MAX, 1000), u64::MAX);
    }
}
