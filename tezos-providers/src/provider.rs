use crate::{
    types::{AppliedOperation, BlockHeader},
    IntegerDecoder, JsonDecoder, ProviderError, ResponseDecoder, ResponseHandler, StringDecoder,
    Transport,
};

use serde_json::{json, Value};
use tezos_core::types::{
    Address, OperationHash, OperationMetadata, PublicKey, SignedOperationPayload,
    SignedProtocolOperationPayload, Tez,
};
use tracing::{debug, instrument, trace};

/// Typed access to the RPC of a Tezos node. Must be instantiated with a data
/// transport which implements the [`Transport`] trait (e.g. [HTTP](crate::Http)).
///
/// # Example
///
/// ```no_run
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// use tezos_providers::{Http, Provider};
///
/// let provider = Provider::<Http>::try_from("http://localhost:8732")?;
/// let address = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse()?;
/// let balance = provider.get_balance(&address).await?;
/// println!("balance: {balance} tez");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Provider<T> {
    transport: T,
    chain: String,
}

impl<T: Transport> Provider<T> {
    /// Instantiate a new provider with a transport, targeting the `main` chain
    pub fn new(transport: T) -> Self {
        Self { transport, chain: "main".to_owned() }
    }

    /// Targets another chain, e.g. `test` or a chain id
    #[must_use]
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    async fn get<R, D: ResponseDecoder<R>>(
        &self,
        path: &str,
        decoder: D,
    ) -> Result<R, ProviderError> {
        debug!(path, "GET");
        let raw = self.transport.get(path).await;
        trace!(?raw, "rx");
        ResponseHandler::handle(&raw, &decoder)
    }

    async fn post<R, D: ResponseDecoder<R>>(
        &self,
        path: &str,
        body: &Value,
        decoder: D,
    ) -> Result<R, ProviderError> {
        debug!(path, "POST");
        trace!(%body, "tx");
        let raw = self.transport.post(path, body).await;
        trace!(?raw, "rx");
        ResponseHandler::handle(&raw, &decoder)
    }

    fn contract_path(&self, address: &Address, field: &str) -> String {
        format!("chains/{}/blocks/head/context/contracts/{}/{}", self.chain, address, field)
    }

    /// Header of the current head block
    #[instrument(skip(self), err)]
    pub async fn get_block_header(&self) -> Result<BlockHeader, ProviderError> {
        let path = format!("chains/{}/blocks/head/header", self.chain);
        self.get(&path, JsonDecoder::new()).await
    }

    /// Last counter consumed by `address`
    #[instrument(skip(self), err)]
    pub async fn get_counter(&self, address: &Address) -> Result<u64, ProviderError> {
        self.get(&self.contract_path(address, "counter"), IntegerDecoder).await
    }

    /// Revealed public key of `address`, `None` while unrevealed
    #[instrument(skip(self), err)]
    pub async fn get_manager_key(
        &self,
        address: &Address,
    ) -> Result<Option<PublicKey>, ProviderError> {
        self.get(&self.contract_path(address, "manager_key"), JsonDecoder::new()).await
    }

    #[instrument(skip(self), err)]
    pub async fn get_balance(&self, address: &Address) -> Result<Tez, ProviderError> {
        let mutez = self.get(&self.contract_path(address, "balance"), IntegerDecoder).await?;
        Ok(Tez::from_mutez(mutez))
    }

    /// Everything needed to assemble a payload for `address`. The head block,
    /// counter and manager key are fetched concurrently.
    #[instrument(skip(self), err)]
    pub async fn fetch_operation_metadata(
        &self,
        address: &Address,
    ) -> Result<OperationMetadata, ProviderError> {
        let (header, counter, key) = futures_util::try_join!(
            self.get_block_header(),
            self.get_counter(address),
            self.get_manager_key(address),
        )?;
        Ok(OperationMetadata {
            chain_id: header.chain_id,
            branch: header.hash,
            protocol: header.protocol,
            counter,
            key,
        })
    }

    /// Dry runs a signed payload. The node does not check the signature.
    /// Fails if any operation, including internal ones, was not applied.
    #[instrument(skip(self, signed), fields(branch = signed.payload().branch()), err)]
    pub async fn run_operation(
        &self,
        signed: &SignedOperationPayload,
        chain_id: &str,
    ) -> Result<AppliedOperation, ProviderError> {
        let path = format!("chains/{}/blocks/head/helpers/scripts/run_operation", self.chain);
        let body = json!({ "operation": signed, "chain_id": chain_id });
        let applied: AppliedOperation = self
            .post(&path, &body, JsonDecoder::new())
            .await
            .map_err(ProviderError::detect_counter_conflict)?;
        applied.ensure_applied()?;
        Ok(applied)
    }

    /// Simulates the application of a protocol tagged payload on top of the
    /// block it is anchored to
    #[instrument(
        skip(self, payload),
        fields(protocol = payload.protocol(), branch = payload.signed().payload().branch()),
        err
    )]
    pub async fn preapply_operation(
        &self,
        payload: &SignedProtocolOperationPayload,
    ) -> Result<Vec<AppliedOperation>, ProviderError> {
        let path = format!(
            "chains/{}/blocks/{}/helpers/preapply/operations",
            self.chain,
            payload.signed().payload().branch()
        );
        let body = json!([payload]);
        let applied: Vec<AppliedOperation> = self
            .post(&path, &body, JsonDecoder::new())
            .await
            .map_err(ProviderError::detect_counter_conflict)?;
        for operation in &applied {
            operation.ensure_applied()?;
        }
        Ok(applied)
    }

    /// Injects the signed binary form of the payload and returns the hash the
    /// node assigned to it
    #[instrument(skip(self, signed), err)]
    pub async fn inject_operation(
        &self,
        signed: &SignedOperationPayload,
    ) -> Result<OperationHash, ProviderError> {
        let path = format!("injection/operation?chain={}", self.chain);
        let body = Value::String(hex::encode(signed.forge_signed()?));
        let hash = self
            .post(&path, &body, StringDecoder)
            .await
            .map_err(ProviderError::detect_counter_conflict)?;
        Ok(OperationHash::new(hash))
    }
}

impl TryFrom<&str> for Provider<crate::Http> {
    type Error = crate::HttpClientError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        Ok(Provider::new(crate::Http::try_from(src)?))
    }
}

impl Provider<crate::MockTransport> {
    /// Returns a `Provider` instantiated with the internal "mocked" version.
    ///
    /// This allows threading a mocked transport throughout the client while
    /// keeping a handle to it for pushing responses and asserting requests.
    pub fn mocked() -> (Self, crate::MockTransport) {
        let mock = crate::MockTransport::new();
        let mock_clone = mock.clone();
        (Self::new(mock), mock_clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, MockRequest, RawResponse};
    use tezos_core::types::{
        Operation, OperationPayload, OperationWithCounter, Signature, SigningCurve,
    };
    use tracing_test::traced_test;

    const BRANCH: &str = "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2";
    const SOURCE: &str = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx";
    const KEY: &str = "edpkuBknW28nW72KG6RoHtYW7p12T6GKc7nAbwYX5m8Wd9sDVC9yav";

    fn signed() -> SignedOperationPayload {
        let source: Address = SOURCE.parse().unwrap();
        let operation = Operation::transaction(source, source, Tez::from_mutez(1));
        let payload =
            OperationPayload::from_parts(BRANCH, vec![OperationWithCounter::new(operation, 1)]);
        let signature = Signature::from_slice(SigningCurve::Ed25519, &[7; 64]).unwrap();
        SignedOperationPayload::new(payload, signature)
    }

    fn header() -> Value {
        json!({
            "hash": BRANCH,
            "chain_id": "NetXdQprcVkpaWU",
            "protocol": "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb",
            "level": 1_000
        })
    }

    #[tokio::test]
    #[traced_test]
    async fn fetches_operation_metadata() {
        let (provider, mock) = Provider::mocked();
        mock.push(header()).unwrap();
        mock.push("41").unwrap();
        mock.push(KEY).unwrap();

        let address = SOURCE.parse().unwrap();
        let metadata = provider.fetch_operation_metadata(&address).await.unwrap();
        assert_eq!(metadata.branch, BRANCH);
        assert_eq!(metadata.chain_id, "NetXdQprcVkpaWU");
        assert_eq!(metadata.counter, 41);
        assert_eq!(metadata.key, Some(KEY.parse().unwrap()));

        mock.assert_request("chains/main/blocks/head/header");
        mock.assert_request(&format!("chains/main/blocks/head/context/contracts/{SOURCE}/counter"));
        mock.assert_request(&format!(
            "chains/main/blocks/head/context/contracts/{SOURCE}/manager_key"
        ));
        assert!(logs_contain("GET"));
    }

    #[tokio::test]
    async fn unrevealed_manager_key_is_none() {
        let (provider, mock) = Provider::mocked();
        mock.push(Value::Null).unwrap();
        let key = provider.get_manager_key(&SOURCE.parse().unwrap()).await.unwrap();
        assert_eq!(key, None);
    }

    #[tokio::test]
    async fn balance_uses_configured_chain() {
        let (provider, mock) = Provider::mocked();
        let provider = provider.with_chain("test");
        mock.push("1500000").unwrap();

        let balance = provider.get_balance(&SOURCE.parse().unwrap()).await.unwrap();
        assert_eq!(balance, Tez::from_mutez(1_500_000));
        mock.assert_request(&format!("chains/test/blocks/head/context/contracts/{SOURCE}/balance"));
    }

    #[tokio::test]
    async fn http_errors_surface_with_their_body() {
        let (provider, mock) = Provider::mocked();
        mock.push_response(RawResponse::new(404, "no contract"));

        let err = provider.get_counter(&SOURCE.parse().unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
        assert!(err.to_string().contains("no contract"));
    }

    #[tokio::test]
    async fn run_operation_rejects_failed_results() {
        let (provider, mock) = Provider::mocked();
        mock.push(json!({
            "contents": [{
                "kind": "transaction",
                "metadata": { "operation_result": {
                    "status": "failed",
                    "errors": [{ "kind": "temporary", "id": "proto.006-PsCARTHA.contract.balance_too_low" }]
                }}
            }]
        }))
        .unwrap();

        let err = provider.run_operation(&signed(), "NetXdQprcVkpaWU").await.unwrap_err();
        match err {
            ProviderError::OperationFailed { errors } => {
                assert_eq!(errors, vec!["proto.006-PsCARTHA.contract.balance_too_low"])
            }
            other => panic!("unexpected error {other:?}"),
        }

        let request = mock.assert_request("chains/main/blocks/head/helpers/scripts/run_operation");
        let MockRequest::Post(_, body) = request else { panic!("expected a POST") };
        assert_eq!(body["chain_id"], "NetXdQprcVkpaWU");
        assert_eq!(body["operation"]["branch"], BRANCH);
        assert_eq!(body["operation"]["contents"][0]["counter"], "1");
    }

    #[tokio::test]
    async fn counter_conflicts_in_server_errors() {
        let (provider, mock) = Provider::mocked();
        mock.push_response(RawResponse::new(
            500,
            r#"[{"kind":"temporary","id":"failure","msg":"counter_in_the_past"}]"#,
        ));
        let err = provider.run_operation(&signed(), "NetXdQprcVkpaWU").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CounterConflict);
    }

    #[tokio::test]
    async fn preapply_wraps_the_payload_in_a_list() {
        let (provider, mock) = Provider::mocked();
        let provider = provider.with_chain("NetXdQprcVkpaWU");
        mock.push(json!([{
            "contents": [{
                "kind": "transaction",
                "metadata": { "operation_result": { "status": "applied", "consumed_gas": "1427" } }
            }]
        }]))
        .unwrap();

        let payload = SignedProtocolOperationPayload::new(
            signed(),
            "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb",
        );
        let applied = provider.preapply_operation(&payload).await.unwrap();
        assert_eq!(applied.len(), 1);

        let path = format!("chains/NetXdQprcVkpaWU/blocks/{BRANCH}/helpers/preapply/operations");
        let MockRequest::Post(_, body) = mock.assert_request(&path) else {
            panic!("expected a POST")
        };
        assert_eq!(body[0]["protocol"], "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb");
        assert!(body[0]["signature"].as_str().unwrap().starts_with("edsig"));
    }

    #[tokio::test]
    async fn injects_signed_bytes() {
        let (provider, mock) = Provider::mocked();
        let signed = signed();
        let hash = signed.hash().unwrap();
        mock.push(hash.as_str()).unwrap();

        assert_eq!(provider.inject_operation(&signed).await.unwrap(), hash);

        let MockRequest::Post(_, body) = mock.assert_request("injection/operation?chain=main")
        else {
            panic!("expected a POST")
        };
        assert_eq!(body, Value::String(hex::encode(signed.forge_signed().unwrap())));
    }

    #[tokio::test]
    async fn missing_response_is_a_transport_failure() {
        let (provider, _mock) = Provider::mocked();
        let err = provider.get_block_header().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
