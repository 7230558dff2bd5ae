mod common;

use serde_json::json;

use common::*;
use iota_tx_builder::client::{DryRunResult, ExecutionStatus, GasCostSummary};
use iota_tx_builder::error::InvalidObject;
use iota_tx_builder::normalized::NormalizedType;
use iota_tx_builder::{
    fetch_objects, Argument, BuildOptions, BuilderError, CallArg, ObjectArg, ObjectDigest,
    ObjectRef, ProtocolLimits, Transaction, TransactionData, TransactionKind, UnresolvedObject,
};

const POOL_DEPOSIT: &str = "0xab::pool::deposit";
const POOL_PEEK: &str = "0xab::pool::peek";

fn kind_inputs(bytes: &[u8]) -> Vec<CallArg> {
    let TransactionKind::ProgrammableTransaction(pt) = TransactionKind::from_bytes(bytes).unwrap();
    pt.inputs
}

fn data(bytes: &[u8]) -> TransactionData {
    TransactionData::from_bytes(bytes).unwrap()
}

#[tokio::test]
async fn same_object_twice_is_fetched_once() {
    let reader = MockReader::new()
        .with_function(POOL_DEPOSIT, vec![by_mut_ref(pool()), NormalizedType::U64])
        .with_function(POOL_PEEK, vec![by_ref(pool())])
        .with_object(shared_object(0x55, 5));

    let mut tx = Transaction::new();
    let a = tx.pure_raw(json!("0x55"));
    let amount = tx.pure_raw(json!(10));
    let b = tx.pure_raw(json!("0x55"));
    tx.move_call(POOL_DEPOSIT, &[], vec![a, amount]).unwrap();
    tx.move_call(POOL_PEEK, &[], vec![b]).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();

    let calls = reader.calls();
    assert_eq!(calls.object_batches, vec![vec![addr(0x55)]]);
    assert_eq!(calls.functions.len(), 2);

    let shared = CallArg::Object(ObjectArg::SharedObject {
        object_id: addr(0x55),
        initial_shared_version: 5,
        mutable: true,
    });
    let inputs = kind_inputs(&bytes);
    assert_eq!(inputs[0], shared);
    assert_eq!(inputs[1], CallArg::Pure(10u64.to_le_bytes().to_vec()));
    assert_eq!(inputs[2], shared);
}

#[tokio::test]
async fn shared_object_mutability_follows_parameter() {
    let by_value = "0xab::pool::destroy";
    let reader = MockReader::new()
        .with_function(by_value, vec![pool()])
        .with_function(POOL_PEEK, vec![by_ref(pool()), tx_context()])
        .with_object(shared_object(0x10, 5))
        .with_object(shared_object(0x11, 5));

    let mut tx = Transaction::new();
    let consumed = tx.object(addr(0x10));
    let read = tx.object(addr(0x11));
    tx.move_call(by_value, &[], vec![consumed]).unwrap();
    tx.move_call(POOL_PEEK, &[], vec![read]).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    let inputs = kind_inputs(&bytes);
    assert!(matches!(
        inputs[0],
        CallArg::Object(ObjectArg::SharedObject {
            initial_shared_version: 5,
            mutable: true,
            ..
        })
    ));
    assert!(matches!(
        inputs[1],
        CallArg::Object(ObjectArg::SharedObject { mutable: false, .. })
    ));
}

#[tokio::test]
async fn explicit_mutable_hint_wins() {
    let reader = MockReader::new()
        .with_function(POOL_PEEK, vec![by_ref(pool())])
        .with_object(shared_object(0x11, 5));

    let mut tx = Transaction::new();
    let read = tx.object_input(UnresolvedObject {
        mutable: Some(true),
        ..UnresolvedObject::new(addr(0x11))
    }).unwrap();
    tx.move_call(POOL_PEEK, &[], vec![read]).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    assert!(matches!(
        kind_inputs(&bytes)[0],
        CallArg::Object(ObjectArg::SharedObject { mutable: true, .. })
    ));
}

#[tokio::test]
async fn owned_and_receiving_objects() {
    let receive = "0xab::inbox::receive";
    let receiving = NormalizedType::struct_type(iota_tx_builder::normalized::NormalizedStructType {
        address: addr(2),
        module: "transfer".into(),
        name: "Receiving".into(),
        type_arguments: vec![NormalizedType::TypeParameter(0)],
    });
    let reader = MockReader::new()
        .with_function(receive, vec![by_mut_ref(pool()), receiving])
        .with_object(owned_object(0x20, addr(1)))
        .with_object(owned_object(0x21, addr(0x20)));

    let mut tx = Transaction::new();
    let parent = tx.object(addr(0x20));
    let child = tx.object(addr(0x21));
    tx.move_call(receive, &[], vec![parent, child]).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    let inputs = kind_inputs(&bytes);
    assert_eq!(
        inputs[0],
        CallArg::Object(ObjectArg::ImmOrOwnedObject(ObjectRef::new(
            addr(0x20),
            7,
            ObjectDigest::new([0x20; 32])
        )))
    );
    assert!(matches!(inputs[1], CallArg::Object(ObjectArg::Receiving(r)) if r.object_id == addr(0x21)));
}

#[tokio::test]
async fn pure_values_follow_signature() {
    let target = "0xab::profile::create";
    let option_u64 = NormalizedType::struct_type(iota_tx_builder::normalized::NormalizedStructType {
        address: addr(1),
        module: "option".into(),
        name: "Option".into(),
        type_arguments: vec![NormalizedType::U64],
    });
    let reader = MockReader::new().with_function(
        target,
        vec![
            NormalizedType::Vector(Box::new(NormalizedType::U8)),
            option_u64.clone(),
            option_u64,
            NormalizedType::Bool,
            tx_context(),
        ],
    );

    let mut tx = Transaction::new();
    let args = vec![
        tx.pure_raw(json!("alice")),
        tx.pure_raw(json!(null)),
        tx.pure_raw(json!(["42"])),
        tx.pure_raw(json!(true)),
    ];
    tx.move_call(target, &[], args).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    let inputs = kind_inputs(&bytes);
    assert_eq!(inputs[0], CallArg::Pure(b"\x05alice".to_vec()));
    assert_eq!(inputs[1], CallArg::Pure(vec![0]));
    let mut some = vec![1];
    some.extend_from_slice(&42u64.to_le_bytes());
    assert_eq!(inputs[2], CallArg::Pure(some));
    assert_eq!(inputs[3], CallArg::Pure(vec![1]));
}

#[tokio::test]
async fn argument_count_mismatch() {
    let reader = MockReader::new().with_function(
        POOL_DEPOSIT,
        vec![by_mut_ref(pool()), NormalizedType::U64, tx_context()],
    );
    let mut tx = Transaction::new();
    let a = tx.object(addr(0x55));
    tx.move_call(POOL_DEPOSIT, &[], vec![a]).unwrap();

    let err = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BuilderError::ArgumentCountMismatch {
            command: 0,
            expected: 2,
            actual: 1,
            ..
        }
    ));
    assert!(reader.calls().object_batches.is_empty());
}

#[tokio::test]
async fn unknown_function_names_target() {
    let reader = MockReader::new();
    let mut tx = Transaction::new();
    let a = tx.pure_raw(json!(1));
    tx.move_call("0xab::missing::call", &[], vec![a]).unwrap();

    let err = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap_err();
    let BuilderError::FunctionLookup { target, .. } = err else {
        panic!("unexpected error: {err}");
    };
    assert!(target.ends_with("::missing::call"));
}

#[tokio::test]
async fn missing_object_aborts_without_partial_state() {
    let reader = MockReader::new()
        .with_function(POOL_DEPOSIT, vec![by_mut_ref(pool()), NormalizedType::U64])
        .with_object(shared_object(0x55, 5));

    let mut tx = Transaction::new();
    let a = tx.object(addr(0x56));
    let amount = tx.pure_raw(json!(10));
    tx.move_call(POOL_DEPOSIT, &[], vec![a, amount]).unwrap();
    let before = tx.clone();

    let err = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap_err();
    let BuilderError::InvalidObjects(invalid) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(
        invalid,
        vec![InvalidObject {
            object_id: addr(0x56),
            reason: "notExists".into()
        }]
    );
    assert_eq!(tx, before);
}

#[tokio::test]
async fn objects_are_fetched_in_chunks() {
    let mut reader = MockReader::new();
    let mut tx = Transaction::new();
    let mut objects = Vec::new();
    for id in 1..=5u8 {
        reader = reader.with_object(owned_object(0x80 + id, addr(1)));
        objects.push(tx.object(addr(0x80 + id)));
    }
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(objects, recipient);

    let options = BuildOptions {
        max_objects_per_fetch: 2,
        ..BuildOptions::kind_only()
    };
    tx.build_with(Some(&reader), &options).await.unwrap();

    let batches = reader.calls().object_batches;
    assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
}

#[tokio::test]
async fn unbounded_batch_size_uses_one_request() {
    let reader = MockReader::new()
        .with_object(owned_object(0x41, addr(1)))
        .with_object(owned_object(0x42, addr(1)));

    let records = fetch_objects(&reader, &[addr(0x41), addr(0x42)], usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        records.iter().map(|r| r.object_id).collect::<Vec<_>>(),
        vec![addr(0x41), addr(0x42)]
    );
    assert_eq!(
        reader.calls().object_batches,
        vec![vec![addr(0x41), addr(0x42)]]
    );
}

#[tokio::test]
async fn resolved_shared_input_takes_later_mutable_use() {
    let reader = MockReader::new()
        .with_function(POOL_DEPOSIT, vec![by_mut_ref(pool()), NormalizedType::U64]);

    let mut tx = Transaction::new();
    let pool = tx.shared_object_ref(addr(0x55), 5, false).unwrap();
    let amount = tx.pure_raw(json!(10));
    tx.move_call(POOL_DEPOSIT, &[], vec![pool, amount]).unwrap();

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    assert_eq!(
        kind_inputs(&bytes)[0],
        CallArg::Object(ObjectArg::SharedObject {
            object_id: addr(0x55),
            initial_shared_version: 5,
            mutable: true,
        })
    );
    assert!(reader.calls().object_batches.is_empty());

    // by-value use in a built-in command needs no signature
    let mut tx = Transaction::new();
    let obj = tx.shared_object_ref(addr(0x56), 3, false).unwrap();
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(vec![obj], recipient);
    let bytes = tx
        .build_with(None, &BuildOptions::kind_only())
        .await
        .unwrap();
    assert_eq!(
        kind_inputs(&bytes)[0],
        CallArg::Object(ObjectArg::SharedObject {
            object_id: addr(0x56),
            initial_shared_version: 3,
            mutable: true,
        })
    );
}

#[tokio::test]
async fn gas_is_resolved_from_the_network() {
    let reader = MockReader::new()
        .with_coins(vec![coin(0x31, 10), coin(0x32, 20), coin(0x33, 30)])
        .with_object(owned_object(0x31, addr(1)));

    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    let mine = tx.object(addr(0x31));
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(vec![mine], recipient);

    let bytes = tx.build(&reader).await.unwrap();
    let data = data(&bytes);
    let gas = &data.v1().gas_data;
    assert_eq!(gas.price, 1);
    // 0x31 is an input, so it cannot pay for gas
    assert_eq!(
        gas.payment.iter().map(|r| r.object_id).collect::<Vec<_>>(),
        vec![addr(0x32), addr(0x33)]
    );
    // computation 100 + 1000 * 1 + storage 50 - rebate 20
    assert_eq!(gas.budget, 1130);
    assert_eq!(gas.owner, addr(1));

    let calls = reader.calls();
    assert_eq!(calls.gas_price, 1);
    assert_eq!(calls.coins, 1);
    assert_eq!(calls.dry_runs.len(), 1);

    let provisional = TransactionData::from_bytes(&calls.dry_runs[0]).unwrap();
    assert_eq!(
        provisional.v1().gas_data.budget,
        ProtocolLimits::default().max_tx_gas
    );
    assert!(provisional.v1().gas_data.payment.is_empty());
    assert_eq!(provisional.v1().kind, data.v1().kind);
}

#[tokio::test]
async fn gas_payment_is_capped() {
    let reader = MockReader::new()
        .with_coins((1..=10).map(|i| coin(0x40 + i, 1)).collect())
        .with_limits(ProtocolLimits {
            max_gas_objects: 4,
            ..ProtocolLimits::default()
        });

    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    tx.set_gas_budget(1_000);
    tx.transfer_gas(addr(9), 5).unwrap();

    let bytes = tx.build(&reader).await.unwrap();
    assert_eq!(data(&bytes).v1().gas_data.payment.len(), 3);
    assert!(reader.calls().dry_runs.is_empty());
}

#[tokio::test]
async fn no_gas_coins() {
    let reader = MockReader::new();
    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    tx.transfer_gas(addr(9), 5).unwrap();

    let err = tx.build(&reader).await.unwrap_err();
    assert!(matches!(err, BuilderError::NoGasCoins(owner) if owner == addr(1)));
}

#[tokio::test]
async fn explicit_gas_owner_pays() {
    let reader = MockReader::new().with_coins(vec![coin(0x31, 10)]);
    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    tx.set_gas_owner(addr(2));
    tx.transfer_gas(addr(9), 5).unwrap();

    let bytes = tx.build(&reader).await.unwrap();
    assert_eq!(data(&bytes).v1().gas_data.owner, addr(2));
}

#[tokio::test]
async fn failed_dry_run_is_reported_verbatim() {
    let reader = MockReader::new()
        .with_coins(vec![coin(0x31, 10)])
        .with_dry_run(DryRunResult {
            status: ExecutionStatus::Failure {
                error: "MoveAbort(0x2::balance, 2)".into(),
            },
            gas_used: GasCostSummary::default(),
        });

    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    tx.transfer_gas(addr(9), 5).unwrap();

    let err = tx.build(&reader).await.unwrap_err();
    assert!(matches!(err, BuilderError::DryRunFailed(msg) if msg == "MoveAbort(0x2::balance, 2)"));
    // nothing was committed
    assert!(tx.state().gas_config().price.is_none());
}

#[tokio::test]
async fn oversized_pure_fails_before_gas_calls() {
    let reader = MockReader::new().with_coins(vec![coin(0x31, 10)]);
    let mut tx = Transaction::new();
    tx.set_sender(addr(1));
    let blob = tx.pure_bytes(vec![0; 16 * 1024 + 1]);
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(vec![blob], recipient);

    let err = tx.build(&reader).await.unwrap_err();
    assert!(matches!(
        err,
        BuilderError::PureArgumentTooLarge {
            input: 0,
            size: 16385,
            max: 16384
        }
    ));
    let calls = reader.calls();
    assert_eq!(calls.gas_price, 0);
    assert_eq!(calls.coins, 0);
    assert!(calls.dry_runs.is_empty());
}

#[tokio::test]
async fn limits_come_from_the_reader() {
    let reader = MockReader::new().with_limits(ProtocolLimits {
        max_pure_argument_size: 4,
        ..ProtocolLimits::default()
    });
    let mut tx = Transaction::new();
    let blob = tx.pure_bytes(vec![0; 5]);
    tx.make_move_vec(None, vec![blob]);

    let err = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap_err();
    assert!(matches!(err, BuilderError::PureArgumentTooLarge { max: 4, .. }));
    assert_eq!(reader.calls().limits, 1);
}

#[tokio::test]
async fn legacy_and_local_inputs_resolve_offline() {
    let mut tx = Transaction::new();
    let legacy = tx.pure_raw(json!({"Pure": [7, 0, 0, 0, 0, 0, 0, 0]}));
    let coin = tx.object_input(UnresolvedObject {
        version: Some(4),
        digest: Some(ObjectDigest::new([4; 32])),
        ..UnresolvedObject::new(addr(0x44))
    }).unwrap();
    let split = tx.split_coins(coin, vec![legacy]);
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(vec![split.get(0)], recipient);

    let bytes = tx
        .build_with(None, &BuildOptions::kind_only())
        .await
        .unwrap();
    let inputs = kind_inputs(&bytes);
    assert_eq!(inputs[0], CallArg::Pure(7u64.to_le_bytes().to_vec()));
    assert_eq!(
        inputs[1],
        CallArg::Object(ObjectArg::ImmOrOwnedObject(ObjectRef::new(
            addr(0x44),
            4,
            ObjectDigest::new([4; 32])
        )))
    );
}

#[tokio::test]
async fn raw_amounts_and_recipients_in_builtin_commands() {
    let mut tx = Transaction::new();
    let amount = tx.pure_raw(json!("250"));
    let recipient = tx.pure_raw(json!("0x9"));
    let coin = tx.split_coins(tx.gas(), vec![amount]);
    tx.transfer_objects(vec![coin.arg()], recipient);

    let bytes = tx
        .build_with(None, &BuildOptions::kind_only())
        .await
        .unwrap();
    let inputs = kind_inputs(&bytes);
    assert_eq!(inputs[0], CallArg::Pure(250u64.to_le_bytes().to_vec()));
    assert_eq!(inputs[1], CallArg::Pure(addr(9).as_bytes().to_vec()));
}

#[tokio::test]
async fn nested_results_reach_the_wire() {
    let target = "0xab::pool::split_pair";
    let reader = MockReader::new().with_function(target, vec![NormalizedType::U64]);

    let mut tx = Transaction::new();
    let amount = tx.pure_raw(json!(3));
    let pair = tx.move_call(target, &[], vec![amount]).unwrap();
    let recipient = tx.pure(&addr(9)).unwrap();
    tx.transfer_objects(vec![pair.get(0), pair.get(1)], recipient);

    let bytes = tx
        .build_with(Some(&reader), &BuildOptions::kind_only())
        .await
        .unwrap();
    let TransactionKind::ProgrammableTransaction(pt) = TransactionKind::from_bytes(&bytes).unwrap();
    assert_eq!(
        pt.commands[1].arguments(),
        vec![
            Argument::NestedResult(0, 0),
            Argument::NestedResult(0, 1),
            Argument::Input(1)
        ]
    );
}
