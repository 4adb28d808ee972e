use crate::{
    fees::{FeeError, FeeSchedule, OperationFeePolicy, RpcFeeEstimator},
    OperationFactory, PayloadAssembler, PayloadError,
};

use tezos_core::{
    types::{Address, Operation, OperationHash, OperationKind, Tez, TezosProtocol},
    utils::ForgeError,
};
use tezos_providers::{ErrorKind, Provider, ProviderError, Transport};
use tezos_signers::Signer;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
/// Error thrown when the client submits operations
pub enum ClientError {
    /// Thrown when the node could not be reached or refused a request
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Thrown when fees could not be resolved
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// Thrown when the payload could not be built or signed
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// The node injected the operation under another hash than the one
    /// computed locally
    #[error("node returned operation hash {received}, expected {expected}")]
    HashMismatch { expected: OperationHash, received: OperationHash },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Provider(err) => err.kind(),
            ClientError::Fee(FeeError::EstimationFailure(_)) => ErrorKind::FeeEstimationFailure,
            // the schedule has no fees for the request
            ClientError::Fee(_) => ErrorKind::MalformedRequest,
            ClientError::Payload(PayloadError::SigningUnavailable(_)) => {
                ErrorKind::SigningUnavailable
            }
            ClientError::Payload(_) | ClientError::Forge(_) => ErrorKind::MalformedRequest,
            ClientError::HashMismatch { .. } => ErrorKind::UnknownResponse,
        }
    }
}

#[derive(Clone, Debug)]
/// A client which submits operations signed by one [`Signer`].
///
/// Submitting fetches the account's counter and manager key, reveals the
/// signer's key first when the account has not revealed it yet, then signs,
/// pre-applies and injects the payload.
///
/// # Example
///
/// ```no_run
/// use tezos_core::types::{Tez, TezosProtocol};
/// use tezos_middleware::{fees::OperationFeePolicy, TezosClient};
/// use tezos_providers::{Http, Provider};
/// use tezos_signers::Wallet;
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Provider::<Http>::try_from("http://localhost:8732")?;
/// let wallet: Wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse()?;
/// let client = TezosClient::new(provider, wallet, TezosProtocol::Carthage);
///
/// let destination = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse()?;
/// let hash = client
///     .transfer(Tez::from_tez(1)?, destination, OperationFeePolicy::Estimate)
///     .await?;
/// println!("injected {hash}");
/// # Ok(())
/// # }
/// ```
pub struct TezosClient<T, S> {
    provider: Provider<T>,
    signer: S,
    address: Address,
    factory: OperationFactory<RpcFeeEstimator<T>>,
    assembler: PayloadAssembler,
}

impl<T, S> TezosClient<T, S>
where
    T: Transport + Clone,
    S: Signer,
{
    /// Creates a new client from the provider and signer. Operations are
    /// built for `protocol`, estimated fees go through the same provider.
    pub fn new(provider: Provider<T>, signer: S, protocol: TezosProtocol) -> Self {
        let address = signer.address();
        let factory = OperationFactory::new(protocol, RpcFeeEstimator::new(provider.clone()));
        TezosClient { provider, signer, address, factory, assembler: PayloadAssembler::default() }
    }

    /// Replaces the default fees
    #[must_use]
    pub fn with_fee_schedule(mut self, schedule: FeeSchedule) -> Self {
        self.factory = self.factory.fee_schedule(schedule);
        self
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// The account operations are submitted from
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> &OperationFactory<RpcFeeEstimator<T>> {
        &self.factory
    }

    /// Signs and submits `operations` as one payload, in order. Returns the
    /// hash the node injected the payload under.
    #[instrument(
        skip(self, operations),
        fields(source = %self.address, count = operations.len()),
        err
    )]
    pub async fn send_operations(
        &self,
        mut operations: Vec<Operation>,
    ) -> Result<OperationHash, ClientError> {
        if operations.is_empty() {
            return Err(PayloadError::Empty.into())
        }

        let metadata = self.provider.fetch_operation_metadata(&self.address).await?;

        let starts_with_reveal =
            operations.first().map(Operation::kind) == Some(OperationKind::Reveal);
        if metadata.key.is_none() && !starts_with_reveal {
            debug!("manager key not revealed, prepending a reveal");
            let reveal = self
                .factory
                .reveal(
                    self.address,
                    self.signer.public_key(),
                    OperationFeePolicy::Default,
                    &self.signer,
                )
                .await?;
            operations.insert(0, reveal);
        }

        let payload = self.assembler.build_payload(operations, &metadata);
        let signed = self.assembler.sign(payload, &self.signer).await?;
        let expected = signed.hash()?;

        let payload = self.assembler.wrap_for_protocol(signed, &metadata);
        self.provider.preapply_operation(&payload).await?;
        let received = self.provider.inject_operation(payload.signed()).await?;

        if received != expected {
            return Err(ClientError::HashMismatch { expected, received })
        }
        Ok(received)
    }

    /// Transfers `amount` to `destination`
    pub async fn transfer(
        &self,
        amount: Tez,
        destination: Address,
        policy: OperationFeePolicy,
    ) -> Result<OperationHash, ClientError> {
        let operation =
            self.factory.transact(amount, self.address, destination, policy, &self.signer).await?;
        self.send_operations(vec![operation]).await
    }

    /// Delegates to `delegate`, or clears the delegate when `None`
    pub async fn set_delegate(
        &self,
        delegate: Option<Address>,
        policy: OperationFeePolicy,
    ) -> Result<OperationHash, ClientError> {
        let operation = match delegate {
            Some(delegate) => {
                self.factory.delegate(self.address, delegate, policy, &self.signer).await?
            }
            None => self.factory.undelegate(self.address, policy, &self.signer).await?,
        };
        self.send_operations(vec![operation]).await
    }
}
