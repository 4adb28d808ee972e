// Re-export common Tezos datatypes

mod address;
pub use address::{Address, AddressError, AddressKind};

mod tez;
pub use tez::{ConversionError, Tez};

mod fee;
pub use fee::OperationFees;

mod protocol;
pub use protocol::{TezosProtocol, Watermark};

mod crypto;
pub use crypto::*;

mod micheline;
pub use micheline::{Entrypoint, Micheline, Parameters, Script};

mod operation;
pub use operation::*;
