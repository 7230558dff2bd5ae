//! In-memory `DataReader` that records every call.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use iota_tx_builder::client::{
    CoinRecord, DryRunResult, ExecutionStatus, GasCostSummary, ObjectRecord, ObjectResponse,
};
use iota_tx_builder::normalized::{NormalizedFunction, NormalizedStructType, NormalizedType};
use iota_tx_builder::type_tag::parse_move_call_target;
use iota_tx_builder::{Address, ClientError, DataReader, ObjectDigest, ObjectId, Owner, ProtocolLimits};

pub const PACKAGE: &str = "0xab";

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub functions: Vec<String>,
    pub object_batches: Vec<Vec<ObjectId>>,
    pub gas_price: usize,
    pub coins: usize,
    pub dry_runs: Vec<Vec<u8>>,
    pub limits: usize,
}

pub struct MockReader {
    functions: HashMap<String, NormalizedFunction>,
    objects: HashMap<ObjectId, ObjectRecord>,
    coins: Vec<CoinRecord>,
    gas_price: u64,
    dry_run: DryRunResult,
    limits: Option<ProtocolLimits>,
    calls: Mutex<Calls>,
}

impl Default for MockReader {
    fn default() -> Self {
        Self {
            functions: HashMap::new(),
            objects: HashMap::new(),
            coins: Vec::new(),
            gas_price: 1,
            dry_run: DryRunResult {
                status: ExecutionStatus::Success,
                gas_used: GasCostSummary {
                    computation_cost: 100,
                    storage_cost: 50,
                    storage_rebate: 20,
                    non_refundable_storage_fee: 0,
                },
            },
            limits: None,
            calls: Mutex::new(Calls::default()),
        }
    }
}

fn target_key(target: &str) -> String {
    let (package, module, function) = parse_move_call_target(target).unwrap();
    format!("{package}::{module}::{function}")
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, target: &str, parameters: Vec<NormalizedType>) -> Self {
        self.functions.insert(
            target_key(target),
            NormalizedFunction {
                is_entry: false,
                parameters,
                return_types: vec![],
            },
        );
        self
    }

    pub fn with_object(mut self, record: ObjectRecord) -> Self {
        self.objects.insert(record.object_id, record);
        self
    }

    pub fn with_coins(mut self, coins: Vec<CoinRecord>) -> Self {
        self.coins = coins;
        self
    }

    pub fn with_gas_price(mut self, price: u64) -> Self {
        self.gas_price = price;
        self
    }

    pub fn with_dry_run(mut self, dry_run: DryRunResult) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_limits(mut self, limits: ProtocolLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataReader for MockReader {
    async fn get_normalized_move_function(
        &self,
        package: &Address,
        module: &str,
        function: &str,
    ) -> Result<NormalizedFunction, ClientError> {
        let key = format!("{package}::{module}::{function}");
        self.calls.lock().unwrap().functions.push(key.clone());
        self.functions.get(&key).cloned().ok_or(ClientError::Rpc {
            code: -32602,
            message: format!("no function {key}"),
        })
    }

    async fn multi_get_objects(&self, ids: &[ObjectId]) -> Result<Vec<ObjectResponse>, ClientError> {
        self.calls.lock().unwrap().object_batches.push(ids.to_vec());
        Ok(ids
            .iter()
            .map(|id| match self.objects.get(id) {
                Some(record) => ObjectResponse::Data(record.clone()),
                None => ObjectResponse::Error {
                    object_id: *id,
                    reason: "notExists".into(),
                },
            })
            .collect())
    }

    async fn get_reference_gas_price(&self) -> Result<u64, ClientError> {
        self.calls.lock().unwrap().gas_price += 1;
        Ok(self.gas_price)
    }

    async fn get_coins(&self, _owner: &Address, _coin_type: &str) -> Result<Vec<CoinRecord>, ClientError> {
        self.calls.lock().unwrap().coins += 1;
        Ok(self.coins.clone())
    }

    async fn dry_run_transaction(&self, tx_bytes: &[u8]) -> Result<DryRunResult, ClientError> {
        self.calls.lock().unwrap().dry_runs.push(tx_bytes.to_vec());
        Ok(self.dry_run.clone())
    }

    async fn get_protocol_limits(&self) -> Result<ProtocolLimits, ClientError> {
        self.calls.lock().unwrap().limits += 1;
        self.limits
            .ok_or(ClientError::Unsupported("get_protocol_limits"))
    }
}

pub fn addr(b: u8) -> Address {
    Address::from_short(b)
}

pub fn struct_type(address: &str, module: &str, name: &str) -> NormalizedType {
    NormalizedType::struct_type(NormalizedStructType {
        address: address.parse().unwrap(),
        module: module.into(),
        name: name.into(),
        type_arguments: vec![],
    })
}

pub fn pool() -> NormalizedType {
    struct_type(PACKAGE, "pool", "Pool")
}

pub fn by_ref(t: NormalizedType) -> NormalizedType {
    NormalizedType::Reference(Box::new(t))
}

pub fn by_mut_ref(t: NormalizedType) -> NormalizedType {
    NormalizedType::MutableReference(Box::new(t))
}

pub fn tx_context() -> NormalizedType {
    by_mut_ref(struct_type("0x2", "tx_context", "TxContext"))
}

pub fn shared_object(id: u8, initial_shared_version: u64) -> ObjectRecord {
    ObjectRecord {
        object_id: addr(id),
        version: 100,
        digest: ObjectDigest::new([id; 32]),
        owner: Owner::Shared {
            initial_shared_version,
        },
        type_: None,
    }
}

pub fn owned_object(id: u8, owner: Address) -> ObjectRecord {
    ObjectRecord {
        object_id: addr(id),
        version: 7,
        digest: ObjectDigest::new([id; 32]),
        owner: Owner::AddressOwner(owner),
        type_: None,
    }
}

pub fn coin(id: u8, balance: u64) -> CoinRecord {
    CoinRecord {
        coin_object_id: addr(id),
        version: 3,
        digest: ObjectDigest::new([id; 32]),
        balance,
    }
}
