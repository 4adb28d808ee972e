//! Micheline expressions, the data format of Michelson smart contract values.
use crate::utils::forge::{write_dynamic, write_zarith_signed, ForgeError, Reader};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};

/// Michelson primitives indexed by their binary code.
const PRIMITIVES: &[&str] = &[
    "parameter", "storage", "code", "False", "Elt", "Left", "None", "Pair", "Right", "Some",
    "True", "Unit", "PACK", "UNPACK", "BLAKE2B", "SHA256", "SHA512", "ABS", "ADD", "AMOUNT",
    "AND", "BALANCE", "CAR", "CDR", "CHECK_SIGNATURE", "COMPARE", "CONCAT", "CONS",
    "CREATE_ACCOUNT", "CREATE_CONTRACT", "IMPLICIT_ACCOUNT", "DIP", "DROP", "DUP", "EDIV",
    "EMPTY_MAP", "EMPTY_SET", "EQ", "EXEC", "FAILWITH", "GE", "GET", "GT", "HASH_KEY", "IF",
    "IF_CONS", "IF_LEFT", "IF_NONE", "INT", "LAMBDA", "LE", "LEFT", "LOOP", "LSL", "LSR", "LT",
    "MAP", "MEM", "MUL", "NEG", "NEQ", "NIL", "NONE", "NOT", "NOW", "OR", "PAIR", "PUSH",
    "RIGHT", "SIZE", "SOME", "SOURCE", "SENDER", "SELF", "STEPS_TO_QUOTA", "SUB", "SWAP",
    "TRANSFER_TOKENS", "SET_DELEGATE", "UNIT", "UPDATE", "XOR", "ITER", "LOOP_LEFT", "ADDRESS",
    "CONTRACT", "ISNAT", "CAST", "RENAME", "bool", "contract", "int", "key", "key_hash",
    "lambda", "list", "map", "big_map", "nat", "option", "or", "pair", "set", "signature",
    "string", "bytes", "mutez", "timestamp", "unit", "operation", "address", "SLICE", "DIG",
    "DUG", "EMPTY_BIG_MAP", "APPLY", "chain_id", "CHAIN_ID",
];

fn primitive_code(prim: &str) -> Result<u8, ForgeError> {
    PRIMITIVES
        .iter()
        .position(|p| *p == prim)
        .map(|code| code as u8)
        .ok_or_else(|| ForgeError::InvalidValue(format!("unknown michelson primitive {prim}")))
}

fn primitive_name(code: u8) -> Result<&'static str, ForgeError> {
    PRIMITIVES
        .get(code as usize)
        .copied()
        .ok_or(ForgeError::InvalidTag { what: "michelson primitive", tag: code })
}

/// A Micheline expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Micheline {
    Int(i128),
    String(String),
    Bytes(Vec<u8>),
    Prim { prim: String, args: Vec<Micheline>, annots: Vec<String> },
    Sequence(Vec<Micheline>),
}

impl Micheline {
    pub fn prim(prim: impl Into<String>, args: Vec<Micheline>) -> Self {
        Micheline::Prim { prim: prim.into(), args, annots: Vec::new() }
    }

    pub fn unit() -> Self {
        Self::prim("Unit", vec![])
    }

    pub fn bool(value: bool) -> Self {
        Self::prim(if value { "True" } else { "False" }, vec![])
    }

    pub fn pair(left: Micheline, right: Micheline) -> Self {
        Self::prim("Pair", vec![left, right])
    }

    pub fn left(value: Micheline) -> Self {
        Self::prim("Left", vec![value])
    }

    pub fn right(value: Micheline) -> Self {
        Self::prim("Right", vec![value])
    }

    pub fn some(value: Micheline) -> Self {
        Self::prim("Some", vec![value])
    }

    pub fn none() -> Self {
        Self::prim("None", vec![])
    }

    /// Appends the binary encoding of this expression.
    pub fn forge(&self, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        match self {
            Micheline::Int(value) => {
                out.push(0x00);
                write_zarith_signed(out, *value);
            }
            Micheline::String(value) => {
                out.push(0x01);
                write_dynamic(out, value.as_bytes())?;
            }
            Micheline::Sequence(items) => {
                out.push(0x02);
                let mut inner = Vec::new();
                for item in items {
                    item.forge(&mut inner)?;
                }
                write_dynamic(out, &inner)?;
            }
            Micheline::Prim { prim, args, annots } => {
                let code = primitive_code(prim)?;
                let annotated = !annots.is_empty();
                match args.len() {
                    0 => out.extend_from_slice(&[if annotated { 0x04 } else { 0x03 }, code]),
                    1 => {
                        out.extend_from_slice(&[if annotated { 0x06 } else { 0x05 }, code]);
                        args[0].forge(out)?;
                    }
                    2 => {
                        out.extend_from_slice(&[if annotated { 0x08 } else { 0x07 }, code]);
                        args[0].forge(out)?;
                        args[1].forge(out)?;
                    }
                    _ => {
                        out.extend_from_slice(&[0x09, code]);
                        let mut inner = Vec::new();
                        for arg in args {
                            arg.forge(&mut inner)?;
                        }
                        write_dynamic(out, &inner)?;
                        // the generic form always carries an annotation field
                        write_dynamic(out, annots.join(" ").as_bytes())?;
                        return Ok(())
                    }
                }
                if annotated {
                    write_dynamic(out, annots.join(" ").as_bytes())?;
                }
            }
            Micheline::Bytes(value) => {
                out.push(0x0a);
                write_dynamic(out, value)?;
            }
        }
        Ok(())
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let tag = reader.read_u8()?;
        let value = match tag {
            0x00 => Micheline::Int(reader.read_zarith_signed()?),
            0x01 => Micheline::String(String::from_utf8(reader.read_dynamic()?.to_vec())?),
            0x02 => Micheline::Sequence(Self::decode_all(reader.read_dynamic()?)?),
            0x03..=0x08 => {
                let prim = primitive_name(reader.read_u8()?)?.to_owned();
                let arity = usize::from((tag - 0x03) / 2);
                let mut args = Vec::with_capacity(arity);
                for _ in 0..arity {
                    args.push(Self::decode(reader)?);
                }
                // even tags carry annotations
                let annots =
                    if tag % 2 == 0 { Self::decode_annots(reader)? } else { Vec::new() };
                Micheline::Prim { prim, args, annots }
            }
            0x09 => {
                let prim = primitive_name(reader.read_u8()?)?.to_owned();
                let args = Self::decode_all(reader.read_dynamic()?)?;
                let annots = Self::decode_annots(reader)?;
                Micheline::Prim { prim, args, annots }
            }
            0x0a => Micheline::Bytes(reader.read_dynamic()?.to_vec()),
            tag => return Err(ForgeError::InvalidTag { what: "micheline", tag }),
        };
        Ok(value)
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Self>, ForgeError> {
        let mut reader = Reader::new(bytes);
        let mut items = Vec::new();
        while !reader.is_empty() {
            items.push(Self::decode(&mut reader)?);
        }
        Ok(items)
    }

    fn decode_annots(reader: &mut Reader<'_>) -> Result<Vec<String>, ForgeError> {
        let joined = String::from_utf8(reader.read_dynamic()?.to_vec())?;
        Ok(joined.split(' ').filter(|a| !a.is_empty()).map(str::to_owned).collect())
    }
}

impl Serialize for Micheline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Micheline::Int(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("int", &value.to_string())?;
                map.end()
            }
            Micheline::String(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("string", value)?;
                map.end()
            }
            Micheline::Bytes(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("bytes", &hex::encode(value))?;
                map.end()
            }
            Micheline::Prim { prim, args, annots } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("prim", prim)?;
                if !args.is_empty() {
                    map.serialize_entry("args", args)?;
                }
                if !annots.is_empty() {
                    map.serialize_entry("annots", annots)?;
                }
                map.end()
            }
            Micheline::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// The entrypoint a contract call targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Entrypoint {
    #[default]
    Default,
    Root,
    Do,
    SetDelegate,
    RemoveDelegate,
    Named(String),
}

impl Entrypoint {
    pub fn name(&self) -> &str {
        match self {
            Entrypoint::Default => "default",
            Entrypoint::Root => "root",
            Entrypoint::Do => "do",
            Entrypoint::SetDelegate => "set_delegate",
            Entrypoint::RemoveDelegate => "remove_delegate",
            Entrypoint::Named(name) => name,
        }
    }

    fn forge(&self, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        match self {
            Entrypoint::Default => out.push(0x00),
            Entrypoint::Root => out.push(0x01),
            Entrypoint::Do => out.push(0x02),
            Entrypoint::SetDelegate => out.push(0x03),
            Entrypoint::RemoveDelegate => out.push(0x04),
            Entrypoint::Named(name) => {
                if name.len() > 31 {
                    return Err(ForgeError::InvalidValue(format!(
                        "entrypoint {name} is longer than 31 bytes"
                    )))
                }
                out.push(0xff);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        Ok(match reader.read_u8()? {
            0x00 => Entrypoint::Default,
            0x01 => Entrypoint::Root,
            0x02 => Entrypoint::Do,
            0x03 => Entrypoint::SetDelegate,
            0x04 => Entrypoint::RemoveDelegate,
            0xff => {
                let len = usize::from(reader.read_u8()?);
                Entrypoint::Named(String::from_utf8(reader.read_bytes(len)?.to_vec())?)
            }
            tag => return Err(ForgeError::InvalidTag { what: "entrypoint", tag }),
        })
    }
}

impl From<&str> for Entrypoint {
    fn from(name: &str) -> Self {
        match name {
            "default" => Entrypoint::Default,
            "root" => Entrypoint::Root,
            "do" => Entrypoint::Do,
            "set_delegate" => Entrypoint::SetDelegate,
            "remove_delegate" => Entrypoint::RemoveDelegate,
            other => Entrypoint::Named(other.to_owned()),
        }
    }
}

impl Serialize for Entrypoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Arguments of a smart contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameters {
    pub entrypoint: Entrypoint,
    pub value: Micheline,
}

impl Parameters {
    pub fn new(entrypoint: impl Into<Entrypoint>, value: Micheline) -> Self {
        Self { entrypoint: entrypoint.into(), value }
    }

    pub(crate) fn forge(&self, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        self.entrypoint.forge(out)?;
        let mut value = Vec::new();
        self.value.forge(&mut value)?;
        write_dynamic(out, &value)
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let entrypoint = Entrypoint::decode(reader)?;
        let mut value = Reader::new(reader.read_dynamic()?);
        let decoded = Micheline::decode(&mut value)?;
        value.finish()?;
        Ok(Self { entrypoint, value: decoded })
    }
}

impl Default for Parameters {
    /// `Unit` on the default entrypoint, what the node assumes when no
    /// parameters are given
    fn default() -> Self {
        Self { entrypoint: Entrypoint::Default, value: Micheline::unit() }
    }
}

/// Code and initial storage of a contract to originate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Script {
    pub code: Micheline,
    pub storage: Micheline,
}

impl Script {
    pub(crate) fn forge(&self, out: &mut Vec<u8>) -> Result<(), ForgeError> {
        let mut code = Vec::new();
        self.code.forge(&mut code)?;
        write_dynamic(out, &code)?;
        let mut storage = Vec::new();
        self.storage.forge(&mut storage)?;
        write_dynamic(out, &storage)
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let mut code = Reader::new(reader.read_dynamic()?);
        let decoded_code = Micheline::decode(&mut code)?;
        code.finish()?;
        let mut storage = Reader::new(reader.read_dynamic()?);
        let decoded_storage = Micheline::decode(&mut storage)?;
        storage.finish()?;
        Ok(Self { code: decoded_code, storage: decoded_storage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn forge(value: &Micheline) -> Vec<u8> {
        let mut out = Vec::new();
        value.forge(&mut out).unwrap();
        out
    }

    #[test]
    fn forges_known_expressions() {
        assert_eq!(forge(&Micheline::unit()), hex!("030b"));
        assert_eq!(forge(&Micheline::Int(42)), hex!("002a"));
        assert_eq!(forge(&Micheline::String("ab".into())), hex!("01000000026162"));
        assert_eq!(
            forge(&Micheline::pair(Micheline::Int(1), Micheline::bool(true))),
            hex!("07070001030a")
        );
        assert_eq!(forge(&Micheline::Bytes(vec![0xca, 0xfe])), hex!("0a00000002cafe"));
    }

    #[test]
    fn decodes_nested_and_annotated() {
        let value = Micheline::Sequence(vec![
            Micheline::Prim {
                prim: "pair".into(),
                args: vec![Micheline::prim("nat", vec![]), Micheline::prim("string", vec![])],
                annots: vec!["%balance".into()],
            },
            Micheline::prim("CDR", vec![]),
            Micheline::Prim {
                prim: "PUSH".into(),
                args: vec![Micheline::prim("int", vec![]), Micheline::Int(-7), Micheline::unit()],
                annots: vec![],
            },
            Micheline::some(Micheline::Bytes(vec![1, 2, 3])),
        ]);
        let bytes = forge(&value);
        let mut reader = Reader::new(&bytes);
        assert_eq!(Micheline::decode(&mut reader).unwrap(), value);
        reader.finish().unwrap();
    }

    #[test]
    fn rejects_unknown_primitives() {
        let mut out = Vec::new();
        assert!(Micheline::prim("NOT_A_PRIM", vec![]).forge(&mut out).is_err());
        assert!(matches!(
            Micheline::decode(&mut Reader::new(&[0x03, 0xfe])),
            Err(ForgeError::InvalidTag { what: "michelson primitive", tag: 0xfe })
        ));
    }

    #[test]
    fn serializes_to_rpc_json() {
        let value = Micheline::pair(Micheline::Int(5), Micheline::String("tez".into()));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"prim": "Pair", "args": [{"int": "5"}, {"string": "tez"}]})
        );
        let params = Parameters::new("transfer", Micheline::unit());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"entrypoint": "transfer", "value": {"prim": "Unit"}})
        );
    }

    #[test]
    fn named_entrypoints_are_bounded() {
        let mut out = Vec::new();
        let params = Parameters::new("a".repeat(32).as_str(), Micheline::unit());
        assert!(params.forge(&mut out).is_err());

        let mut out = Vec::new();
        Parameters::new("mint", Micheline::Int(1)).forge(&mut out).unwrap();
        assert_eq!(Parameters::decode(&mut Reader::new(&out)).unwrap().entrypoint.name(), "mint");
    }
}
