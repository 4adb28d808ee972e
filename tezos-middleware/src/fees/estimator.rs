use super::FeeError;
use crate::PayloadAssembler;

use async_trait::async_trait;
use tezos_core::types::{Address, Operation, OperationFees, OperationKind, Tez};
use tezos_providers::{types::ContentResult, Provider, Transport};
use tezos_signers::Signer;
use tracing::{debug, instrument};

/// Hard gas limit of a single operation
pub const MAX_GAS_LIMIT: u64 = 1_040_000;
/// Hard storage limit of a single operation
pub const MAX_STORAGE_LIMIT: u64 = 60_000;

const GAS_MARGIN: u64 = 100;
const FEE_MARGIN_MUTEZ: u64 = 100;
const MINIMAL_FEE_MUTEZ: u64 = 100;
const FEE_PER_BYTE_MUTEZ: u64 = 1;
// 0.1 mutez per unit of gas
const GAS_PER_FEE_MUTEZ: u64 = 10;
const ALLOCATION_STORAGE: u64 = 257;

/// `FeeEstimator` is a trait which produces fees for an operation out of a dry
/// run of it.
///
/// The signer is only used to sign the dry-run payload, the node does not
/// check that signature.
#[async_trait]
pub trait FeeEstimator: Send + Sync + std::fmt::Debug {
    /// Estimates the fees `operation` needs when submitted by `source`
    async fn estimate<S: Signer>(
        &self,
        operation: &Operation,
        source: &Address,
        signer: &S,
    ) -> Result<OperationFees, FeeError>;
}

/// Estimates fees through the node's `run_operation` RPC.
///
/// The operation is submitted with the protocol's hard limits and no fee,
/// then the consumed gas and paid storage are turned into limits with a small
/// margin. The fee is the minimal fee the default baker configuration accepts
/// for the payload's size and gas, plus a margin.
///
/// Accounts which have not revealed their key dry run a reveal ahead of the
/// operation, only the operation's own results are counted.
#[derive(Clone, Debug)]
pub struct RpcFeeEstimator<T> {
    provider: Provider<T>,
    assembler: PayloadAssembler,
}

impl<T: Transport> RpcFeeEstimator<T> {
    pub fn new(provider: Provider<T>) -> Self {
        Self { provider, assembler: PayloadAssembler::default() }
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }
}

#[async_trait]
impl<T: Transport> FeeEstimator for RpcFeeEstimator<T> {
    #[instrument(skip(self, operation, signer), fields(kind = %operation.kind()), err)]
    async fn estimate<S: Signer>(
        &self,
        operation: &Operation,
        source: &Address,
        signer: &S,
    ) -> Result<OperationFees, FeeError> {
        let metadata =
            self.provider.fetch_operation_metadata(source).await.map_err(FeeError::estimation)?;

        let limits = OperationFees::new(Tez::ZERO, MAX_GAS_LIMIT, MAX_STORAGE_LIMIT);
        let mut operations = Vec::with_capacity(2);
        // the node refuses operations of unrevealed managers
        if metadata.key.is_none() && operation.kind() != OperationKind::Reveal {
            debug!("manager key not revealed, dry running a reveal first");
            operations.push(Operation::reveal(*source, signer.public_key()).with_fees(limits));
        }
        operations.push(operation.clone().with_fees(limits));
        let count = operations.len();

        let payload = self.assembler.build_payload(operations, &metadata);
        let signed = self.assembler.sign(payload, signer).await.map_err(FeeError::estimation)?;

        // branch, signature and the estimated entry only
        let mut size = signed.forge_signed().map_err(FeeError::estimation)?.len();
        for entry in &signed.payload().contents()[..count - 1] {
            size -= entry.forge().map_err(FeeError::estimation)?.len();
        }
        let size = size as u64;

        let applied = self
            .provider
            .run_operation(&signed, &metadata.chain_id)
            .await
            .map_err(FeeError::estimation)?;

        if applied.contents.len() != count {
            return Err(FeeError::EstimationFailure(
                format!(
                    "dry run returned {} results for {count} operations",
                    applied.contents.len()
                )
                .into(),
            ))
        }
        if let Some(content) = applied.contents.iter().find(|content| !content.has_result()) {
            return Err(FeeError::EstimationFailure(
                format!("dry run returned no result for the {} operation", content.kind).into(),
            ))
        }

        let mut milligas = 0u64;
        let mut storage = 0u64;
        for result in applied.contents.last().into_iter().flat_map(ContentResult::results) {
            milligas = milligas.saturating_add(result.milligas());
            storage = storage.saturating_add(result.paid_storage_size_diff.unwrap_or_default());
            let allocations = result.originated_contracts.len() as u64 +
                u64::from(result.allocated_destination_contract);
            storage = storage.saturating_add(allocations * ALLOCATION_STORAGE);
        }

        let gas_limit = div_ceil(milligas, 1000) + GAS_MARGIN;
        let fee = MINIMAL_FEE_MUTEZ +
            size * FEE_PER_BYTE_MUTEZ +
            div_ceil(gas_limit, GAS_PER_FEE_MUTEZ) +
            FEE_MARGIN_MUTEZ;
        debug!(milligas, storage, size, fee, "estimated fees");

        Ok(OperationFees::new(Tez::from_mutez(fee), gas_limit, storage))
    }
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    value / divisor + u64::from(value % divisor != 0)
}

/// An estimator for factories which never estimate. Always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineEstimator;

#[async_trait]
impl FeeEstimator for OfflineEstimator {
    async fn estimate<S: Signer>(
        &self,
        _operation: &Operation,
        _source: &Address,
        _signer: &S,
    ) -> Result<OperationFees, FeeError> {
        Err(FeeError::EstimationFailure("no fee estimator configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tezos_core::types::{OperationMetadata, Tez};
    use tezos_providers::{MockRequest, MockTransport, RawResponse};
    use tezos_signers::Wallet;

    const BRANCH: &str = "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2";
    const SECRET: &str = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh";
    const KEY: &str = "edpkuBknW28nW72KG6RoHtYW7p12T6GKc7nAbwYX5m8Wd9sDVC9yav";

    fn push_metadata(mock: &MockTransport) {
        push_metadata_with_key(mock, Some(KEY));
    }

    fn push_metadata_with_key(mock: &MockTransport, key: Option<&str>) {
        mock.push(json!({ "hash": BRANCH, "chain_id": "NetXdQprcVkpaWU", "protocol": "PsCARTHA" }))
            .unwrap();
        mock.push("9").unwrap();
        mock.push(key).unwrap();
    }

    fn applied(kind: &str, milligas: &str) -> Value {
        json!({
            "kind": kind,
            "metadata": {
                "operation_result": { "status": "applied", "consumed_milligas": milligas }
            }
        })
    }

    async fn signed_size(wallet: &Wallet, operation: Operation) -> u64 {
        let metadata = OperationMetadata {
            chain_id: "NetXdQprcVkpaWU".to_owned(),
            branch: BRANCH.to_owned(),
            protocol: "PsCARTHA".to_owned(),
            counter: 9,
            key: None,
        };
        let assembler = PayloadAssembler::default();
        let operation =
            operation.with_fees(OperationFees::new(Tez::ZERO, MAX_GAS_LIMIT, MAX_STORAGE_LIMIT));
        let payload = assembler.build_payload(vec![operation], &metadata);
        assembler.sign(payload, wallet).await.unwrap().forge_signed().unwrap().len() as u64
    }

    #[tokio::test]
    async fn derives_fees_from_the_dry_run() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let (provider, mock) = Provider::mocked();
        push_metadata(&mock);
        mock.push(json!({
            "contents": [{
                "kind": "transaction",
                "metadata": { "operation_result": {
                    "status": "applied",
                    "consumed_milligas": "1427001",
                    "paid_storage_size_diff": "10",
                    "allocated_destination_contract": true
                }}
            }]
        }))
        .unwrap();

        let operation =
            Operation::transaction(wallet.address(), wallet.address(), Tez::from_mutez(1));
        let estimator = RpcFeeEstimator::new(provider);
        let fees = estimator.estimate(&operation, &wallet.address(), &wallet).await.unwrap();

        let size = signed_size(&wallet, operation).await;
        assert_eq!(fees.gas_limit, 1_428 + 100);
        assert_eq!(fees.storage_limit, 10 + 257);
        assert_eq!(fees.fee, Tez::from_mutez(100 + size + 153 + 100));

        let requests = mock.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3].path(), "chains/main/blocks/head/helpers/scripts/run_operation");
    }

    #[tokio::test]
    async fn failed_dry_runs_fail_the_estimate() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let (provider, mock) = Provider::mocked();
        push_metadata(&mock);
        mock.push_response(RawResponse::new(500, "internal error"));

        let operation = Operation::delegation(wallet.address(), None);
        let err = RpcFeeEstimator::new(provider)
            .estimate(&operation, &wallet.address(), &wallet)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::EstimationFailure(_)));
        assert!(err.to_string().contains("internal error"));
    }

    #[tokio::test]
    async fn dry_runs_without_results_fail_the_estimate() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let operation =
            Operation::transaction(wallet.address(), wallet.address(), Tez::from_mutez(1));
        let replies = [
            json!({ "contents": [] }),
            json!({ "contents": [{ "kind": "transaction", "metadata": null }] }),
            json!({ "contents": [{ "kind": "transaction", "metadata": {} }] }),
            json!({
                "contents": [
                    applied("transaction", "1000"),
                    applied("transaction", "1000"),
                ]
            }),
        ];
        for reply in replies {
            let (provider, mock) = Provider::mocked();
            push_metadata(&mock);
            mock.push(&reply).unwrap();

            let err = RpcFeeEstimator::new(provider)
                .estimate(&operation, &wallet.address(), &wallet)
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::EstimationFailure(_)), "{reply} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn unrevealed_accounts_dry_run_a_reveal_first() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let (provider, mock) = Provider::mocked();
        push_metadata_with_key(&mock, None);
        mock.push(json!({
            "contents": [applied("reveal", "1000000"), applied("transaction", "1427001")]
        }))
        .unwrap();

        let operation =
            Operation::transaction(wallet.address(), wallet.address(), Tez::from_mutez(1));
        let fees = RpcFeeEstimator::new(provider)
            .estimate(&operation, &wallet.address(), &wallet)
            .await
            .unwrap();

        // only the transaction is paid for
        let size = signed_size(&wallet, operation).await;
        assert_eq!(fees.gas_limit, 1_428 + 100);
        assert_eq!(fees.storage_limit, 0);
        assert_eq!(fees.fee, Tez::from_mutez(100 + size + 153 + 100));

        let requests = mock.requests();
        let MockRequest::Post(_, body) = &requests[3] else { panic!("expected a POST") };
        let contents = body["operation"]["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["kind"], "reveal");
        assert_eq!(contents[0]["public_key"], KEY);
        assert_eq!(contents[0]["counter"], "10");
        assert_eq!(contents[1]["kind"], "transaction");
        assert_eq!(contents[1]["counter"], "11");
    }

    #[tokio::test]
    async fn reveals_are_not_revealed_twice() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let (provider, mock) = Provider::mocked();
        push_metadata_with_key(&mock, None);
        mock.push(json!({ "contents": [applied("reveal", "1000000")] })).unwrap();

        let operation = Operation::reveal(wallet.address(), wallet.public_key());
        let fees = RpcFeeEstimator::new(provider)
            .estimate(&operation, &wallet.address(), &wallet)
            .await
            .unwrap();
        assert_eq!(fees.gas_limit, 1_000 + 100);

        let requests = mock.requests();
        let MockRequest::Post(_, body) = &requests[3] else { panic!("expected a POST") };
        assert_eq!(body["operation"]["contents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_estimator_fails() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let operation = Operation::delegation(wallet.address(), None);
        let err =
            OfflineEstimator.estimate(&operation, &wallet.address(), &wallet).await.unwrap_err();
        assert!(matches!(err, FeeError::EstimationFailure(_)));
    }
}
