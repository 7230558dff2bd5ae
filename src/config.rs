//! Limits and options for resolving and building a transaction.

use serde::{Deserialize, Serialize};

/// Coin type used to pay for gas.
pub const GAS_COIN_TYPE: &str = "0x2::iota::IOTA";

/// Objects requested per `multi_get_objects` call.
pub const MAX_OBJECTS_PER_FETCH: usize = 50;

/// Multiplied by the gas price and added to the dry-run computation cost.
pub const GAS_SAFE_OVERHEAD: u64 = 1000;

/// Protocol limits that bound a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolLimits {
    /// Serialized `TransactionData` size in bytes.
    pub max_tx_size_bytes: u64,
    /// Encoded size of a single pure input in bytes.
    pub max_pure_argument_size: u64,
    /// Coins in the gas payment.
    pub max_gas_objects: u64,
    /// Upper bound for the gas budget.
    pub max_tx_gas: u64,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_tx_size_bytes: 128 * 1024,
            max_pure_argument_size: 16 * 1024,
            max_gas_objects: 256,
            max_tx_gas: 50_000_000_000,
        }
    }
}

/// Options for [`Transaction::build_with`](crate::Transaction::build_with).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Serialize only the `TransactionKind`, skipping sender and gas.
    pub only_transaction_kind: bool,
    /// Limits to enforce. Fetched from the reader when unset.
    pub limits: Option<ProtocolLimits>,
    pub max_objects_per_fetch: usize,
    pub gas_safe_overhead: u64,
    pub gas_coin_type: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            only_transaction_kind: false,
            limits: None,
            max_objects_per_fetch: MAX_OBJECTS_PER_FETCH,
            gas_safe_overhead: GAS_SAFE_OVERHEAD,
            gas_coin_type: GAS_COIN_TYPE.to_string(),
        }
    }
}

impl BuildOptions {
    /// Options for a kind-only build.
    pub fn kind_only() -> Self {
        Self {
            only_transaction_kind: true,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, limits: ProtocolLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}
