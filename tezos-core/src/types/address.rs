use super::SigningCurve;
use crate::utils::{
    decode_check, encode_check,
    forge::{ForgeError, Reader},
    prefix, Base58Error,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Error thrown when parsing an [`Address`]
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("unknown address prefix: {0}")]
    UnknownPrefix(String),
    #[error(transparent)]
    Base58(#[from] Base58Error),
}

/// What kind of account an [`Address`] identifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    /// A `tz1`, `tz2` or `tz3` account controlled by a key on the given curve
    Implicit(SigningCurve),
    /// A `KT1` smart contract
    Originated,
}

/// A validated Tezos account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    kind: AddressKind,
    hash: [u8; 20],
}

impl Address {
    pub const fn implicit(curve: SigningCurve, hash: [u8; 20]) -> Self {
        Self { kind: AddressKind::Implicit(curve), hash }
    }

    pub const fn originated(hash: [u8; 20]) -> Self {
        Self { kind: AddressKind::Originated, hash }
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self.kind, AddressKind::Implicit(_))
    }

    fn prefix(&self) -> &'static [u8] {
        match self.kind {
            AddressKind::Implicit(SigningCurve::Ed25519) => prefix::TZ1,
            AddressKind::Implicit(SigningCurve::Secp256k1) => prefix::TZ2,
            AddressKind::Implicit(SigningCurve::P256) => prefix::TZ3,
            AddressKind::Originated => prefix::KT1,
        }
    }

    /// Appends the 21 byte public key hash form. Only implicit accounts have one.
    pub fn forge_public_key_hash(&self, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        match self.kind {
            AddressKind::Implicit(curve) => {
                out.push(curve.tag());
                out.extend_from_slice(&self.hash);
                Ok(())
            }
            AddressKind::Originated => {
                Err(ForgeError::InvalidValue(format!("{self} is not an implicit account")))
            }
        }
    }

    /// Appends the 22 byte contract id form.
    pub fn forge_contract_id(&self, out: &mut Vec<u8>) {
        match self.kind {
            AddressKind::Implicit(curve) => {
                out.push(0x00);
                out.push(curve.tag());
                out.extend_from_slice(&self.hash);
            }
            AddressKind::Originated => {
                out.push(0x01);
                out.extend_from_slice(&self.hash);
                out.push(0x00);
            }
        }
    }

    pub fn decode_public_key_hash(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let curve = SigningCurve::from_tag(reader.read_u8()?)?;
        Ok(Self::implicit(curve, reader.read_array()?))
    }

    pub fn decode_contract_id(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        match reader.read_u8()? {
            0x00 => Self::decode_public_key_hash(reader),
            0x01 => {
                let hash = reader.read_array()?;
                match reader.read_u8()? {
                    0x00 => Ok(Self::originated(hash)),
                    tag => Err(ForgeError::InvalidTag { what: "contract padding", tag }),
                }
            }
            tag => Err(ForgeError::InvalidTag { what: "contract id", tag }),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_check(self.prefix(), &self.hash))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, prefix) = match s.get(..3) {
            Some("tz1") => (AddressKind::Implicit(SigningCurve::Ed25519), prefix::TZ1),
            Some("tz2") => (AddressKind::Implicit(SigningCurve::Secp256k1), prefix::TZ2),
            Some("tz3") => (AddressKind::Implicit(SigningCurve::P256), prefix::TZ3),
            Some("KT1") => (AddressKind::Originated, prefix::KT1),
            _ => return Err(AddressError::UnknownPrefix(s.to_owned())),
        };
        let payload = decode_check(prefix, s, 20)?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload);
        Ok(Self { kind, hash })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}
