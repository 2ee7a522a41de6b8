pub mod codec;
pub mod rpc;
pub mod types;

pub use codec::{decode_payload, encode_payload, CodecError, CodecResult};
pub use types::*;
