use super::Tez;
use serde::{Deserialize, Serialize};

/// Fees attached to a manager operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationFees {
    /// Fee paid to the baker
    pub fee: Tez,
    /// Maximum gas the operation may consume
    pub gas_limit: u64,
    /// Maximum bytes of storage the operation may burn
    pub storage_limit: u64,
}

impl OperationFees {
    /// Sentinel for fees which have not been computed yet
    pub const ZERO: OperationFees = OperationFees { fee: Tez::ZERO, gas_limit: 0, storage_limit: 0 };

    pub const fn new(fee: Tez, gas_limit: u64, storage_limit: u64) -> Self {
        Self { fee, gas_limit, storage_limit }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}
