//! Handles the creation and verification of (Ethereum) Signatures.
//!
//! Signatures are produced over `keccak256("\x19Ethereum Signed Message:\n32"
//! || hash)`, which is what `eth_sign` and `web3.eth.sign` produce for a
//! 32-byte hash. The recovery id byte `v` is accepted both in its raw form
//! (`0`/`1`) and with the EVM offset (`27`/`28`), so signatures coming from
//! different signing environments are treated the same.

use crate::abiencode::types::{Address, Hash, Signature};
use sha3::{Digest, Keccak256};

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("at least one signature backend feature (`k256` or `secp256k1`) must be enabled");

#[cfg(feature = "k256")]
mod k256;
#[cfg(feature = "secp256k1")]
mod secp256k1;

// libsecp256k1 takes precedence if both are compiled in.
#[cfg(feature = "secp256k1")]
use self::secp256k1 as backend;
#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
use self::k256 as backend;

pub use backend::Signer;


/// Offset added to the recovery id by the EVM, see
/// [EIP-2098](https://eips.ethereum.org/EIPS/eip-2098).
const ETH_V_OFFSET: u8 = 27;

/// Upper bound (inclusive) for `s`: half the order of secp256k1.
///
/// [EIP-2](https://eips.ethereum.org/EIPS/eip-2) makes all signatures with a
/// high `s` invalid for transactions, OpenZeppelin's ECDSA.sol rejects them for
/// `ecrecover()` as well. Without this both `(r, s)` and `(r, n - s)` would be
/// valid for the same state.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// `v` is neither `0`/`1` nor `27`/`28`.
    #[error("invalid recovery id {0}, expected one of 0, 1, 27 or 28")]
    InvalidRecoveryId(u8),
    /// `s` is in the upper half of the curve order (malleable signature).
    #[error("signature s value is not canonical (high s)")]
    NonCanonicalS,
    /// The backend rejected the signature or key, e.g. because `r` or `s`
    /// is zero or not on the curve.
    #[error("signature backend: {0}")]
    Backend(String),
}

/// Add the `\x19Ethereum Signed Message\n<length>` prefix to hash.
///
/// This is the format expected by the Solidity contracts.
fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding => We can't use the serializer
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

/// Ethereum address of an uncompressed SEC1 public key (65 bytes, starting
/// with `0x04`).
fn address_from_uncompressed(pk_bytes: &[u8]) -> Address {
    // Throw away the first byte, which is not part of the public key. It is
    // only the tag of the encoding.
    let hash: [u8; 32] = Keccak256::digest(&pk_bytes[1..]).into();

    let mut addr = Address([0; 20]);
    addr.0.copy_from_slice(&hash[32 - 20..]);
    addr
}

/// Map `v` to the raw recovery id (`0` or `1`).
pub fn normalize_recovery_id(v: u8) -> Result<u8, Error> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - ETH_V_OFFSET),
        _ => Err(Error::InvalidRecoveryId(v)),
    }
}

fn is_low_s(s: &[u8]) -> bool {
    // Both are big endian and of equal length, so lexicographic comparison is
    // numeric comparison.
    s <= SECP256K1_HALF_ORDER.as_slice()
}

/// Assemble the 65 byte Ethereum signature from the compact `r || s` and the
/// raw recovery id.
fn to_eth_signature(rs: &[u8; 64], recid: u8) -> Signature {
    debug_assert!(is_low_s(&rs[32..]));
    Signature::new(rs, recid + ETH_V_OFFSET)
}

/// Recover the address that signed `hash` (without the `Ethereum Signed
/// Message` prefix, it is added here).
pub fn recover_signer(hash: Hash, eth_sig: Signature) -> Result<Address, Error> {
    let recid = normalize_recovery_id(eth_sig.v())?;
    if !is_low_s(eth_sig.s()) {
        return Err(Error::NonCanonicalS);
    }

    let mut rs = [0u8; 64];
    rs.copy_from_slice(&eth_sig.0[..64]);

    let prehash = hash_to_eth_signed_msg_hash(hash);
    backend::recover_prehash(prehash, &rs, recid)
}
