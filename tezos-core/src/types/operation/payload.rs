use super::Operation;
use crate::{
    types::{PublicKey, Signature},
    utils::{
        blake2b_256, decode_check, encode_check,
        forge::{ForgeError, Reader},
        prefix,
    },
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::fmt;

/// Chain state needed to assemble a payload for one source account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Chain id, `Net...`
    pub chain_id: String,
    /// Hash of the block the payload is anchored to, `B...`
    pub branch: String,
    /// Hash of the protocol active at `branch`, `Ps...`
    pub protocol: String,
    /// The last counter consumed by the source
    pub counter: u64,
    /// The source's manager key, `None` while it has not been revealed
    pub key: Option<PublicKey>,
}

/// An [`Operation`] bound to the counter it consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationWithCounter {
    operation: Operation,
    counter: u64,
}

impl OperationWithCounter {
    pub fn new(operation: Operation, counter: u64) -> Self {
        Self { operation, counter }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn into_operation(self) -> Operation {
        self.operation
    }

    /// The canonical binary encoding of this single operation
    pub fn forge(&self) -> Result<Vec<u8>, ForgeError> {
        let mut out = Vec::new();
        self.operation.forge(self.counter, &mut out)?;
        Ok(out)
    }

    /// Decodes exactly one forged operation
    pub fn decode(bytes: &[u8]) -> Result<Self, ForgeError> {
        let mut reader = Reader::new(bytes);
        let decoded = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(decoded)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let (operation, counter) = Operation::decode(reader)?;
        Ok(Self { operation, counter })
    }
}

impl Serialize for OperationWithCounter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.operation.serialize_fields(self.counter, &mut map)?;
        map.end()
    }
}

/// An ordered batch of operations anchored to a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationPayload {
    branch: String,
    contents: Vec<OperationWithCounter>,
}

impl OperationPayload {
    pub fn from_parts(branch: impl Into<String>, contents: Vec<OperationWithCounter>) -> Self {
        Self { branch: branch.into(), contents }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn contents(&self) -> &[OperationWithCounter] {
        &self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Branch followed by every operation, in order. This is what gets signed.
    pub fn forge(&self) -> Result<Vec<u8>, ForgeError> {
        let mut out = decode_check(prefix::BLOCK_HASH, &self.branch, 32)?;
        for content in &self.contents {
            content.operation.forge(content.counter, &mut out)?;
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ForgeError> {
        let mut reader = Reader::new(bytes);
        let branch = encode_check(prefix::BLOCK_HASH, &reader.read_array::<32>()?);
        let mut contents = Vec::new();
        while !reader.is_empty() {
            contents.push(OperationWithCounter::read(&mut reader)?);
        }
        Ok(Self { branch, contents })
    }
}

/// A payload together with the signature over its forged bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedOperationPayload {
    payload: OperationPayload,
    signature: Signature,
}

impl SignedOperationPayload {
    pub fn new(payload: OperationPayload, signature: Signature) -> Self {
        Self { payload, signature }
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Forged payload followed by the raw signature, the form injected into
    /// the node.
    pub fn forge_signed(&self) -> Result<Vec<u8>, ForgeError> {
        let mut out = self.payload.forge()?;
        out.extend_from_slice(self.signature.as_bytes());
        Ok(out)
    }

    /// The hash the node will assign to this operation once injected.
    pub fn hash(&self) -> Result<OperationHash, ForgeError> {
        let signed = self.forge_signed()?;
        Ok(OperationHash(encode_check(prefix::OPERATION_HASH, &blake2b_256(signed))))
    }
}

impl Serialize for SignedOperationPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("branch", &self.payload.branch)?;
        map.serialize_entry("contents", &self.payload.contents)?;
        map.serialize_entry("signature", &self.signature)?;
        map.end()
    }
}

/// A signed payload tagged with the protocol it targets, as expected by the
/// pre-application RPC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedProtocolOperationPayload {
    signed: SignedOperationPayload,
    protocol: String,
}

impl SignedProtocolOperationPayload {
    pub fn new(signed: SignedOperationPayload, protocol: impl Into<String>) -> Self {
        Self { signed, protocol: protocol.into() }
    }

    pub fn signed(&self) -> &SignedOperationPayload {
        &self.signed
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn into_signed(self) -> SignedOperationPayload {
        self.signed
    }
}

impl Serialize for SignedProtocolOperationPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("protocol", &self.protocol)?;
        map.serialize_entry("branch", &self.signed.payload.branch)?;
        map.serialize_entry("contents", &self.signed.payload.contents)?;
        map.serialize_entry("signature", &self.signed.signature)?;
        map.end()
    }
}

/// Base58 operation hash, `o...`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHash(String);

impl OperationHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
