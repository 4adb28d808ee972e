//! Manager operations and their canonical encodings.
//!
//! Every operation kind the protocol accepts from an account is one variant of
//! [`Operation`]. Encoding sites match exhaustively over the variants, so adding
//! a kind is a compile error everywhere it must be handled.
mod payload;
pub use payload::{
    OperationHash, OperationMetadata, OperationPayload, OperationWithCounter,
    SignedOperationPayload, SignedProtocolOperationPayload,
};

use crate::{
    types::{Address, OperationFees, Parameters, PublicKey, Script, Tez},
    utils::forge::{write_bool, write_zarith, ForgeError, Reader},
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::fmt;

/// The kinds of operations an account can submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Reveal,
    Origination,
    Delegation,
    Transaction,
    /// A transaction carrying contract parameters
    ContractInvocation,
}

impl OperationKind {
    /// The `kind` field in the node's JSON
    pub const fn rpc_name(&self) -> &'static str {
        match self {
            OperationKind::Reveal => "reveal",
            OperationKind::Origination => "origination",
            OperationKind::Delegation => "delegation",
            OperationKind::Transaction | OperationKind::ContractInvocation => "transaction",
        }
    }

    /// Binary tag of the kind
    const fn tag(&self) -> u8 {
        match self {
            OperationKind::Reveal => 107,
            OperationKind::Transaction | OperationKind::ContractInvocation => 108,
            OperationKind::Origination => 109,
            OperationKind::Delegation => 110,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rpc_name())
    }
}

/// Reveals the public key behind an implicit account. Must precede the
/// account's first other operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reveal {
    pub source: Address,
    pub public_key: PublicKey,
}

/// Deploys a new smart contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origination {
    pub source: Address,
    pub balance: Tez,
    pub delegate: Option<Address>,
    pub script: Script,
}

/// Sets, changes or clears (`delegate: None`) the delegate of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub source: Address,
    pub delegate: Option<Address>,
}

/// A plain transfer of tez.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub source: Address,
    pub destination: Address,
    pub amount: Tez,
}

/// A transfer which calls a smart contract with parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInvocation {
    pub source: Address,
    pub destination: Address,
    pub amount: Tez,
    pub parameters: Parameters,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Content {
    Reveal(Reveal),
    Origination(Origination),
    Delegation(Delegation),
    Transaction(Transaction),
    ContractInvocation(ContractInvocation),
}

/// A manager operation together with its fees.
///
/// Operations are created with [`OperationFees::ZERO`] and are immutable apart
/// from [`Operation::with_fees`], which consumes the operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    content: Content,
    fees: OperationFees,
}

impl Operation {
    fn new(content: Content) -> Self {
        Self { content, fees: OperationFees::ZERO }
    }

    pub fn reveal(source: Address, public_key: PublicKey) -> Self {
        Self::new(Content::Reveal(Reveal { source, public_key }))
    }

    pub fn origination(
        source: Address,
        balance: Tez,
        delegate: Option<Address>,
        script: Script,
    ) -> Self {
        Self::new(Content::Origination(Origination { source, balance, delegate, script }))
    }

    pub fn delegation(source: Address, delegate: Option<Address>) -> Self {
        Self::new(Content::Delegation(Delegation { source, delegate }))
    }

    pub fn transaction(source: Address, destination: Address, amount: Tez) -> Self {
        Self::new(Content::Transaction(Transaction { source, destination, amount }))
    }

    pub fn contract_invocation(
        source: Address,
        destination: Address,
        amount: Tez,
        parameters: Parameters,
    ) -> Self {
        Self::new(Content::ContractInvocation(ContractInvocation {
            source,
            destination,
            amount,
            parameters,
        }))
    }

    /// Returns the operation with `fees` filled in
    #[must_use]
    pub fn with_fees(self, fees: OperationFees) -> Self {
        Self { fees, ..self }
    }

    pub fn fees(&self) -> &OperationFees {
        &self.fees
    }

    pub fn kind(&self) -> OperationKind {
        match &self.content {
            Content::Reveal(_) => OperationKind::Reveal,
            Content::Origination(_) => OperationKind::Origination,
            Content::Delegation(_) => OperationKind::Delegation,
            Content::Transaction(_) => OperationKind::Transaction,
            Content::ContractInvocation(_) => OperationKind::ContractInvocation,
        }
    }

    pub fn source(&self) -> &Address {
        match &self.content {
            Content::Reveal(op) => &op.source,
            Content::Origination(op) => &op.source,
            Content::Delegation(op) => &op.source,
            Content::Transaction(op) => &op.source,
            Content::ContractInvocation(op) => &op.source,
        }
    }

    pub fn as_reveal(&self) -> Option<&Reveal> {
        match &self.content {
            Content::Reveal(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_origination(&self) -> Option<&Origination> {
        match &self.content {
            Content::Origination(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_delegation(&self) -> Option<&Delegation> {
        match &self.content {
            Content::Delegation(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match &self.content {
            Content::Transaction(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_contract_invocation(&self) -> Option<&ContractInvocation> {
        match &self.content {
            Content::ContractInvocation(op) => Some(op),
            _ => None,
        }
    }

    /// Appends the forged form of this operation consuming `counter`.
    pub(crate) fn forge(&self, counter: u64, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        out.push(self.kind().tag());
        self.source().forge_public_key_hash(out)?;
        write_zarith(out, self.fees.fee.as_mutez());
        write_zarith(out, counter);
        write_zarith(out, self.fees.gas_limit);
        write_zarith(out, self.fees.storage_limit);

        match &self.content {
            Content::Reveal(op) => op.public_key.forge(out),
            Content::Origination(op) => {
                write_zarith(out, op.balance.as_mutez());
                forge_optional_delegate(op.delegate.as_ref(), out)?;
                op.script.forge(out)?;
            }
            Content::Delegation(op) => forge_optional_delegate(op.delegate.as_ref(), out)?,
            Content::Transaction(op) => {
                write_zarith(out, op.amount.as_mutez());
                op.destination.forge_contract_id(out);
                write_bool(out, false);
            }
            Content::ContractInvocation(op) => {
                write_zarith(out, op.amount.as_mutez());
                op.destination.forge_contract_id(out);
                write_bool(out, true);
                op.parameters.forge(out)?;
            }
        }
        Ok(())
    }

    /// Reads one forged operation, returning it with the counter it consumes.
    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<(Self, u64), ForgeError> {
        let tag = reader.read_u8()?;
        let source = Address::decode_public_key_hash(reader)?;
        let fee = Tez::from_mutez(reader.read_zarith()?);
        let counter = reader.read_zarith()?;
        let gas_limit = reader.read_zarith()?;
        let storage_limit = reader.read_zarith()?;

        let content = match tag {
            107 => Content::Reveal(Reveal { source, public_key: PublicKey::decode(reader)? }),
            108 => {
                let amount = Tez::from_mutez(reader.read_zarith()?);
                let destination = Address::decode_contract_id(reader)?;
                if reader.read_bool()? {
                    let parameters = Parameters::decode(reader)?;
                    Content::ContractInvocation(ContractInvocation {
                        source,
                        destination,
                        amount,
                        parameters,
                    })
                } else {
                    Content::Transaction(Transaction { source, destination, amount })
                }
            }
            109 => {
                let balance = Tez::from_mutez(reader.read_zarith()?);
                let delegate = decode_optional_delegate(reader)?;
                let script = Script::decode(reader)?;
                Content::Origination(Origination { source, balance, delegate, script })
            }
            110 => Content::Delegation(Delegation {
                source,
                delegate: decode_optional_delegate(reader)?,
            }),
            tag => return Err(ForgeError::InvalidTag { what: "operation", tag }),
        };

        let fees = OperationFees::new(fee, gas_limit, storage_limit);
        Ok((Self { content, fees }, counter))
    }

    /// Writes the JSON fields of this operation for the node RPC.
    pub(crate) fn serialize_fields<M: SerializeMap>(
        &self,
        counter: u64,
        map: &mut M,
    ) -> Result<(), M::Error> {
        map.serialize_entry("kind", self.kind().rpc_name())?;
        map.serialize_entry("source", self.source())?;
        map.serialize_entry("fee", &self.fees.fee)?;
        map.serialize_entry("counter", &counter.to_string())?;
        map.serialize_entry("gas_limit", &self.fees.gas_limit.to_string())?;
        map.serialize_entry("storage_limit", &self.fees.storage_limit.to_string())?;

        match &self.content {
            Content::Reveal(op) => map.serialize_entry("public_key", &op.public_key),
            Content::Origination(op) => {
                map.serialize_entry("balance", &op.balance)?;
                if let Some(delegate) = &op.delegate {
                    map.serialize_entry("delegate", delegate)?;
                }
                map.serialize_entry("script", &op.script)
            }
            Content::Delegation(op) => match &op.delegate {
                Some(delegate) => map.serialize_entry("delegate", delegate),
                None => Ok(()),
            },
            Content::Transaction(op) => {
                map.serialize_entry("amount", &op.amount)?;
                map.serialize_entry("destination", &op.destination)
            }
            Content::ContractInvocation(op) => {
                map.serialize_entry("amount", &op.amount)?;
                map.serialize_entry("destination", &op.destination)?;
                map.serialize_entry("parameters", &op.parameters)
            }
        }
    }
}

fn forge_optional_delegate(
    delegate: Option<&Address>,
    out: &mut Vec<u8>,
) -> Result<(), ForgeError> {
    match delegate {
        Some(delegate) => {
            write_bool(out, true);
            delegate.forge_public_key_hash(out)
        }
        None => {
            write_bool(out, false);
            Ok(())
        }
    }
}

fn decode_optional_delegate(reader: &mut Reader<'_>) -> Result<Option<Address>, ForgeError> {
    if reader.read_bool()? {
        Ok(Some(Address::decode_public_key_hash(reader)?))
    } else {
        Ok(None)
    }
}

/// Serializes without a counter, for display and logging.
impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_fields(0, &mut map)?;
        map.end()
    }
}
