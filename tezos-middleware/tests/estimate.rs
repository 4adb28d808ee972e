use serde_json::{json, Value};
use tezos_core::types::{OperationFees, Tez, TezosProtocol};
use tezos_middleware::{
    fees::{FeeEstimator, OperationFeePolicy, RpcFeeEstimator},
    ClientError, PayloadAssembler, TezosClient,
};
use tezos_providers::{ErrorKind, MockRequest, MockTransport, Provider, RawResponse};
use tezos_signers::{Signer, Wallet};

const SECRET: &str = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh";
const BRANCH: &str = "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2";
const PROTOCOL: &str = "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb";
const CHAIN_ID: &str = "NetXdQprcVkpaWU";

fn push_metadata(mock: &MockTransport, wallet: &Wallet, counter: u64) {
    mock.push(json!({ "hash": BRANCH, "chain_id": CHAIN_ID, "protocol": PROTOCOL })).unwrap();
    mock.push(counter.to_string()).unwrap();
    mock.push(wallet.public_key()).unwrap();
}

fn dry_run() -> Value {
    json!({
        "contents": [{
            "kind": "transaction",
            "metadata": {
                "operation_result": { "status": "applied", "consumed_milligas": "1420000" }
            }
        }]
    })
}

/// Runs an estimate on its own mock, fed the same node answers
async fn standalone_estimate(wallet: &Wallet) -> OperationFees {
    let (provider, mock) = Provider::mocked();
    push_metadata(&mock, wallet, 3);
    mock.push(dry_run()).unwrap();

    let factory = tezos_middleware::OperationFactory::new(
        TezosProtocol::Carthage,
        RpcFeeEstimator::new(provider),
    );
    let operation = factory
        .transact(
            Tez::from_mutez(250),
            wallet.address(),
            wallet.address(),
            OperationFeePolicy::Custom(OperationFees::ZERO),
            wallet,
        )
        .await
        .unwrap();
    factory.estimator().estimate(&operation, &wallet.address(), wallet).await.unwrap()
}

#[tokio::test]
async fn client_submits_estimated_fees() {
    let wallet: Wallet = SECRET.parse().unwrap();
    let estimated = standalone_estimate(&wallet).await;
    assert_eq!(estimated.gas_limit, 1_420 + 100);
    assert_eq!(estimated.storage_limit, 0);

    let (provider, mock) = Provider::mocked();
    let client = TezosClient::new(provider, wallet.clone(), TezosProtocol::Carthage);

    // estimate, then the submission itself
    push_metadata(&mock, &wallet, 3);
    mock.push(dry_run()).unwrap();
    push_metadata(&mock, &wallet, 3);
    mock.push(json!([{ "contents": [] }])).unwrap();

    let operation = tezos_core::types::Operation::transaction(
        wallet.address(),
        wallet.address(),
        Tez::from_mutez(250),
    )
    .with_fees(estimated);
    let metadata = tezos_core::types::OperationMetadata {
        chain_id: CHAIN_ID.to_owned(),
        branch: BRANCH.to_owned(),
        protocol: PROTOCOL.to_owned(),
        counter: 3,
        key: Some(wallet.public_key()),
    };
    let assembler = PayloadAssembler::new();
    let payload = assembler.build_payload(vec![operation], &metadata);
    let expected = assembler.sign(payload, &wallet).await.unwrap().hash().unwrap();
    mock.push(expected.as_str()).unwrap();

    let hash = client
        .transfer(Tez::from_mutez(250), wallet.address(), OperationFeePolicy::Estimate)
        .await
        .unwrap();
    assert_eq!(hash, expected);

    let preapply = mock
        .requests()
        .into_iter()
        .find(|request| request.path().ends_with("preapply/operations"))
        .unwrap();
    let MockRequest::Post(_, body) = preapply else { panic!("expected a POST") };
    let content = &body[0]["contents"][0];
    assert_eq!(content["fee"], estimated.fee.rpc_representation());
    assert_eq!(content["gas_limit"], "1520");
    assert_eq!(content["storage_limit"], "0");
    assert_eq!(content["counter"], "4");
}

#[tokio::test]
async fn failed_estimates_abort_the_submission() {
    let wallet: Wallet = SECRET.parse().unwrap();
    let (provider, mock) = Provider::mocked();
    let client = TezosClient::new(provider, wallet.clone(), TezosProtocol::Carthage);

    push_metadata(&mock, &wallet, 3);
    mock.push_response(RawResponse::new(200, "not json"));

    let err = client
        .transfer(Tez::from_mutez(250), wallet.address(), OperationFeePolicy::Estimate)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Fee(_)));
    assert_eq!(err.kind(), ErrorKind::FeeEstimationFailure);
    // nothing was submitted
    assert!(!mock.requests().iter().any(|request| request.path().contains("preapply")));
}
