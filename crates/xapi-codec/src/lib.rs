//! Byte-exact encoders for the EVM destination chain.
//!
//! Everything here is pure: no storage, no host calls, the same input always yields the same bytes.
//! Only the shapes the XAPI protocol relays are supported, see [abi::AbiType].

pub mod abi;
pub mod eip712;
pub mod error;
pub mod hex;
pub mod rlp;
pub mod transaction;

pub use crate::error::CodecError;

use sha3::{Digest, Keccak256};

/// keccak256 as used by the EVM (not NIST SHA3-256, the padding differs).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    <[u8; 32]>::from(hasher.finalize())
}
