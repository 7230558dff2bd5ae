//! Network operations the resolver depends on.
//!
//! The crate ships no transport. Callers implement [`DataReader`] on top of
//! their RPC client; every call made during one resolution pass goes through
//! it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolLimits;
use crate::error::ClientError;
use crate::normalized::NormalizedFunction;
use crate::types::{Address, ObjectDigest, ObjectId, ObjectRef, Owner};

#[async_trait]
pub trait DataReader: Send + Sync {
    async fn get_normalized_move_function(
        &self,
        package: &Address,
        module: &str,
        function: &str,
    ) -> Result<NormalizedFunction, ClientError>;

    /// Fetch several objects in one request. The response may be in any
    /// order; ids without an entry are treated as missing.
    async fn multi_get_objects(&self, ids: &[ObjectId]) -> Result<Vec<ObjectResponse>, ClientError>;

    async fn get_reference_gas_price(&self) -> Result<u64, ClientError>;

    /// All coins of `coin_type` owned by `owner`. Paging is up to the
    /// implementation.
    async fn get_coins(&self, owner: &Address, coin_type: &str) -> Result<Vec<CoinRecord>, ClientError>;

    /// Execute serialized `TransactionData` without committing it.
    async fn dry_run_transaction(&self, tx_bytes: &[u8]) -> Result<DryRunResult, ClientError>;

    /// Current protocol limits.
    ///
    /// The default reports the operation as unsupported and the resolver
    /// falls back to [`ProtocolLimits::default`].
    async fn get_protocol_limits(&self) -> Result<ProtocolLimits, ClientError> {
        Err(ClientError::Unsupported("get_protocol_limits"))
    }
}

/// An object's current state and ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    #[serde(with = "crate::snapshot::u64_string")]
    pub version: u64,
    pub digest: ObjectDigest,
    pub owner: Owner,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl ObjectRecord {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.object_id, self.version, self.digest)
    }
}

/// One entry of a `multi_get_objects` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectResponse {
    Data(ObjectRecord),
    #[serde(rename_all = "camelCase")]
    Error { object_id: ObjectId, reason: String },
}

impl ObjectResponse {
    pub fn object_id(&self) -> ObjectId {
        match self {
            ObjectResponse::Data(record) => record.object_id,
            ObjectResponse::Error { object_id, .. } => *object_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinRecord {
    pub coin_object_id: ObjectId,
    #[serde(with = "crate::snapshot::u64_string")]
    pub version: u64,
    pub digest: ObjectDigest,
    #[serde(with = "crate::snapshot::u64_string")]
    pub balance: u64,
}

impl CoinRecord {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.coin_object_id, self.version, self.digest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCostSummary {
    #[serde(with = "crate::snapshot::u64_string")]
    pub computation_cost: u64,
    #[serde(with = "crate::snapshot::u64_string")]
    pub storage_cost: u64,
    #[serde(with = "crate::snapshot::u64_string")]
    pub storage_rebate: u64,
    #[serde(default, with = "crate::snapshot::u64_string")]
    pub non_refundable_storage_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    pub status: ExecutionStatus,
    pub gas_used: GasCostSummary,
}
