//! Shapes of the node RPC responses the provider reads.
use crate::ProviderError;
use serde::{Deserialize, Deserializer, Serialize};

/// The parts of a block header needed to anchor operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub hash: String,
    pub chain_id: String,
    pub protocol: String,
    #[serde(default)]
    pub level: i64,
}

/// Application status of one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Applied,
    Failed,
    Backtracked,
    Skipped,
}

/// An error reported by the protocol, e.g. `proto.006-PsCARTHA.contract.balance_too_low`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub kind: String,
    pub id: String,
}

/// Result of applying one operation, or one internal operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    #[serde(default, deserialize_with = "opt_u64_str")]
    pub consumed_gas: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64_str")]
    pub consumed_milligas: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64_str")]
    pub paid_storage_size_diff: Option<u64>,
    #[serde(default)]
    pub allocated_destination_contract: bool,
    #[serde(default)]
    pub originated_contracts: Vec<String>,
    #[serde(default)]
    pub errors: Vec<RpcError>,
}

impl OperationResult {
    /// Consumed milligas, falling back to the whole gas figure of older protocols
    pub fn milligas(&self) -> u64 {
        self.consumed_milligas
            .or_else(|| self.consumed_gas.map(|gas| gas.saturating_mul(1000)))
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalOperationResult {
    pub kind: String,
    pub result: OperationResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub operation_result: Option<OperationResult>,
    #[serde(default)]
    pub internal_operation_results: Vec<InternalOperationResult>,
}

/// One entry of `contents` as returned by dry runs and pre-application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub kind: String,
    #[serde(default)]
    pub metadata: Option<ContentMetadata>,
}

impl ContentResult {
    /// Whether the node reported a result for the operation itself
    pub fn has_result(&self) -> bool {
        self.metadata.as_ref().map_or(false, |metadata| metadata.operation_result.is_some())
    }

    /// The operation's own result followed by its internal results
    pub fn results(&self) -> impl Iterator<Item = &OperationResult> {
        self.metadata.iter().flat_map(|metadata| {
            metadata
                .operation_result
                .iter()
                .chain(metadata.internal_operation_results.iter().map(|internal| &internal.result))
        })
    }
}

/// An operation as applied by `run_operation` or `preapply`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOperation {
    pub contents: Vec<ContentResult>,
}

impl AppliedOperation {
    /// Fails with [`ProviderError::OperationFailed`] unless every result was applied.
    /// Counter mismatches surface as [`ProviderError::CounterConflict`].
    pub fn ensure_applied(&self) -> Result<(), ProviderError> {
        let mut failed = false;
        let mut errors = Vec::new();
        for result in self.contents.iter().flat_map(ContentResult::results) {
            if result.status != OperationStatus::Applied {
                failed = true;
                errors.extend(result.errors.iter().map(|e| e.id.clone()));
            }
        }
        if !failed {
            return Ok(())
        }
        if errors.is_empty() {
            errors.push("operation was not applied".to_owned());
        }
        Err(ProviderError::OperationFailed { errors }.detect_counter_conflict())
    }
}

fn opt_u64_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|value| value.parse().map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn applied(status: &str, errors: serde_json::Value) -> AppliedOperation {
        serde_json::from_value(json!({
            "contents": [{
                "kind": "transaction",
                "metadata": {
                    "operation_result": {
                        "status": "applied",
                        "consumed_gas": "10207",
                        "consumed_milligas": "10206185"
                    },
                    "internal_operation_results": [{
                        "kind": "transaction",
                        "result": { "status": status, "errors": errors }
                    }]
                }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn parses_node_results() {
        let op = applied("applied", json!([]));
        let results: Vec<_> = op.contents[0].results().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].milligas(), 10_206_185);
        assert_eq!(results[1].milligas(), 0);
        op.ensure_applied().unwrap();
    }

    #[test]
    fn internal_failures_fail_the_operation() {
        let op = applied(
            "failed",
            json!([{"kind": "temporary", "id": "proto.alpha.gas_exhausted.operation"}]),
        );
        match op.ensure_applied().unwrap_err() {
            ProviderError::OperationFailed { errors } => {
                assert_eq!(errors, vec!["proto.alpha.gas_exhausted.operation"])
            }
            other => panic!("unexpected error {other:?}"),
        }

        let op = applied(
            "backtracked",
            json!([{"kind": "temporary", "id": "proto.alpha.contract.counter_in_the_past"}]),
        );
        assert_eq!(op.ensure_applied().unwrap_err().kind(), ErrorKind::CounterConflict);
    }
}
