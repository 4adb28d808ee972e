use crate::fees::{FeeError, FeeEstimator, FeeSchedule, OperationFeePolicy};

use tezos_core::types::{Address, Operation, Parameters, PublicKey, Script, Tez, TezosProtocol};
use tezos_signers::Signer;
use tracing::debug;

/// Builds operations with their fees resolved.
///
/// Every constructor creates the operation without fees, resolves them once
/// through the given [`OperationFeePolicy`] and returns the operation with the
/// fees filled in. The signer is only used by [`OperationFeePolicy::Estimate`].
///
/// ```
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// use tezos_core::types::{OperationFees, Tez, TezosProtocol};
/// use tezos_middleware::{
///     fees::{OfflineEstimator, OperationFeePolicy},
///     OperationFactory,
/// };
/// use tezos_signers::Wallet;
///
/// let wallet: Wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse()?;
/// let factory = OperationFactory::new(TezosProtocol::Carthage, OfflineEstimator);
///
/// let custom = OperationFees::new(Tez::from_mutez(2_000), 10_600, 0);
/// let transfer = factory
///     .transact(
///         Tez::from_tez(1)?,
///         wallet.address(),
///         wallet.address(),
///         OperationFeePolicy::Custom(custom),
///         &wallet,
///     )
///     .await?;
/// assert_eq!(transfer.fees(), &custom);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OperationFactory<E> {
    protocol: TezosProtocol,
    schedule: FeeSchedule,
    estimator: E,
}

impl<E: FeeEstimator> OperationFactory<E> {
    /// A factory for `protocol` using the built-in default fees
    pub fn new(protocol: TezosProtocol, estimator: E) -> Self {
        Self { protocol, schedule: FeeSchedule::default(), estimator }
    }

    /// Replaces the default fees
    #[must_use]
    pub fn fee_schedule(mut self, schedule: FeeSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn protocol(&self) -> TezosProtocol {
        self.protocol
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    async fn with_resolved_fees<S: Signer>(
        &self,
        operation: Operation,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        let fees = match policy.resolve_offline(&self.schedule, operation.kind(), self.protocol) {
            Some(fees) => fees?,
            None => self.estimator.estimate(&operation, operation.source(), signer).await?,
        };
        debug!(kind = %operation.kind(), ?policy, ?fees, "resolved fees");
        Ok(operation.with_fees(fees))
    }

    /// Reveals `public_key` as the manager key of `source`
    pub async fn reveal<S: Signer>(
        &self,
        source: Address,
        public_key: PublicKey,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        self.with_resolved_fees(Operation::reveal(source, public_key), policy, signer).await
    }

    /// Originates a contract running `script`, funded with `balance`
    pub async fn originate<S: Signer>(
        &self,
        source: Address,
        balance: Tez,
        delegate: Option<Address>,
        script: Script,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        let operation = Operation::origination(source, balance, delegate, script);
        self.with_resolved_fees(operation, policy, signer).await
    }

    /// Registers `source` as a delegate, i.e. `source` delegates to itself
    pub async fn register_delegate<S: Signer>(
        &self,
        source: Address,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        self.with_resolved_fees(Operation::delegation(source, Some(source)), policy, signer).await
    }

    pub async fn delegate<S: Signer>(
        &self,
        source: Address,
        delegate: Address,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        self.with_resolved_fees(Operation::delegation(source, Some(delegate)), policy, signer)
            .await
    }

    /// Clears the delegate of `source`
    pub async fn undelegate<S: Signer>(
        &self,
        source: Address,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        self.with_resolved_fees(Operation::delegation(source, None), policy, signer).await
    }

    pub async fn transact<S: Signer>(
        &self,
        amount: Tez,
        source: Address,
        destination: Address,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        let operation = Operation::transaction(source, destination, amount);
        self.with_resolved_fees(operation, policy, signer).await
    }

    /// Calls the contract at `destination`. Without `parameters` the contract's
    /// default entrypoint is called with `Unit`.
    pub async fn invoke_contract<S: Signer>(
        &self,
        amount: Tez,
        parameters: Option<Parameters>,
        source: Address,
        destination: Address,
        policy: OperationFeePolicy,
        signer: &S,
    ) -> Result<Operation, FeeError> {
        let operation = Operation::contract_invocation(
            source,
            destination,
            amount,
            parameters.unwrap_or_default(),
        );
        self.with_resolved_fees(operation, policy, signer).await
    }
}
