//! Fee resolution for manager operations.
//!
//! Fees come from one of three places, selected per operation through an
//! [`OperationFeePolicy`]: the per protocol defaults of a [`FeeSchedule`], fees
//! supplied by the caller, or a dry run through a [`FeeEstimator`].
mod estimator;
pub use estimator::{FeeEstimator, OfflineEstimator, RpcFeeEstimator};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tezos_core::types::{OperationFees, OperationKind, Tez, TezosProtocol};
use thiserror::Error;

#[derive(Error, Debug)]
/// Error thrown when fees cannot be resolved
pub enum FeeError {
    /// The schedule has no entry for the protocol
    #[error("no default fees for protocol {0}")]
    UnknownProtocol(TezosProtocol),

    /// The schedule knows the protocol but not the operation kind
    #[error("no default fees for {kind} operations on {protocol}")]
    UnknownOperation { protocol: TezosProtocol, kind: OperationKind },

    /// The dry run could not be performed or was refused by the node
    #[error("fee estimation failed: {0}")]
    EstimationFailure(Box<dyn std::error::Error + Send + Sync>),
}

impl FeeError {
    pub(crate) fn estimation<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        FeeError::EstimationFailure(Box::new(err))
    }
}

/// How the fees of an operation are determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperationFeePolicy {
    /// The schedule's defaults for the operation kind
    #[default]
    Default,
    /// Exactly these fees
    Custom(OperationFees),
    /// Fees derived from a dry run of the operation
    Estimate,
}

impl OperationFeePolicy {
    /// Resolves the policies which need no network access. Returns `None` for
    /// [`OperationFeePolicy::Estimate`].
    pub fn resolve_offline(
        &self,
        schedule: &FeeSchedule,
        kind: OperationKind,
        protocol: TezosProtocol,
    ) -> Option<Result<OperationFees, FeeError>> {
        match self {
            OperationFeePolicy::Default => Some(schedule.compute_fees(kind, protocol)),
            OperationFeePolicy::Custom(fees) => Some(Ok(*fees)),
            OperationFeePolicy::Estimate => None,
        }
    }
}

/// Default fees per protocol and operation kind.
///
/// The built-in table covers Athens, Babylon and Carthage. Entries can be
/// overridden one by one, or the whole table loaded from JSON:
///
/// ```
/// use tezos_core::types::{OperationKind, TezosProtocol};
/// use tezos_middleware::fees::FeeSchedule;
///
/// let schedule: FeeSchedule = serde_json::from_str(
///     r#"{ "carthage": { "transaction": { "fee": "2000", "gas_limit": 10600, "storage_limit": 0 } } }"#,
/// )?;
/// let fees = schedule.compute_fees(OperationKind::Transaction, TezosProtocol::Carthage)?;
/// assert_eq!(fees.fee.as_mutez(), 2000);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeSchedule {
    table: BTreeMap<TezosProtocol, BTreeMap<OperationKind, OperationFees>>,
}

const fn fees(mutez: u64, gas_limit: u64, storage_limit: u64) -> OperationFees {
    OperationFees::new(Tez::from_mutez(mutez), gas_limit, storage_limit)
}

const ATHENS: [(OperationKind, OperationFees); 5] = [
    (OperationKind::Reveal, fees(1_268, 10_000, 0)),
    (OperationKind::Origination, fees(1_265, 10_000, 257)),
    (OperationKind::Delegation, fees(1_257, 10_000, 0)),
    (OperationKind::Transaction, fees(1_272, 10_100, 257)),
    (OperationKind::ContractInvocation, fees(100_000, 800_000, 60_000)),
];

const BABYLON: [(OperationKind, OperationFees); 5] = [
    (OperationKind::Reveal, fees(1_268, 10_000, 0)),
    (OperationKind::Origination, fees(3_000, 20_000, 1_000)),
    (OperationKind::Delegation, fees(1_400, 10_600, 0)),
    (OperationKind::Transaction, fees(1_420, 10_600, 300)),
    (OperationKind::ContractInvocation, fees(100_000, 800_000, 60_000)),
];

impl Default for FeeSchedule {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(TezosProtocol::Athens, ATHENS.into_iter().collect());
        // Carthage kept Babylon's gas model
        table.insert(TezosProtocol::Babylon, BABYLON.into_iter().collect());
        table.insert(TezosProtocol::Carthage, BABYLON.into_iter().collect());
        Self { table }
    }
}

impl FeeSchedule {
    /// A schedule without any entry
    pub fn empty() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Sets the default fees of `kind` operations on `protocol`
    #[must_use]
    pub fn with_fees(
        mut self,
        protocol: TezosProtocol,
        kind: OperationKind,
        fees: OperationFees,
    ) -> Self {
        self.table.entry(protocol).or_default().insert(kind, fees);
        self
    }

    /// The default fees of `kind` operations on `protocol`
    pub fn compute_fees(
        &self,
        kind: OperationKind,
        protocol: TezosProtocol,
    ) -> Result<OperationFees, FeeError> {
        let by_kind = self.table.get(&protocol).ok_or(FeeError::UnknownProtocol(protocol))?;
        by_kind.get(&kind).copied().ok_or(FeeError::UnknownOperation { protocol, kind })
    }
}
