use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Tezos protocol generations with distinct fee defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TezosProtocol {
    Athens,
    Babylon,
    #[default]
    Carthage,
}

impl TezosProtocol {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TezosProtocol::Athens => "athens",
            TezosProtocol::Babylon => "babylon",
            TezosProtocol::Carthage => "carthage",
        }
    }
}

impl fmt::Display for TezosProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TezosProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "athens" => Ok(TezosProtocol::Athens),
            "babylon" => Ok(TezosProtocol::Babylon),
            "carthage" => Ok(TezosProtocol::Carthage),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

/// One byte prefix identifying the category of signed bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Watermark {
    Block,
    Endorsement,
    GenericOperation,
    MichelsonData,
}

impl Watermark {
    pub const fn as_byte(&self) -> u8 {
        match self {
            Watermark::Block => 0x01,
            Watermark::Endorsement => 0x02,
            Watermark::GenericOperation => 0x03,
            Watermark::MichelsonData => 0x05,
        }
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Watermark::GenericOperation
    }
}
