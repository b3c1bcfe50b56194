//! Signer using the k256 Rust crate (implementation of ecdsa in Rust).

use crate::abiencode::types::{Address, Hash, Signature};
use k256::{
    ecdsa::{
        recoverable,
        signature::{hazmat::PrehashSigner, Signature as k256Signature},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
};

use super::{address_from_uncompressed, hash_to_eth_signed_msg_hash, to_eth_signature, Error};

fn backend_err(e: k256::ecdsa::Error) -> Error {
    Error::Backend(e.to_string())
}

impl From<VerifyingKey> for Address {
    fn from(key: VerifyingKey) -> Self {
        address_from_uncompressed(key.to_encoded_point(false).as_bytes())
    }
}

#[derive(Debug)]
pub struct Signer {
    key: SigningKey,
    addr: Address,
}

impl Signer {
    /// Create a signer with a fresh random key.
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let key = SigningKey::random(rng);
        let addr = key.verifying_key().into();
        Self { key, addr }
    }

    /// Create a signer from a raw 32 byte secret key.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, Error> {
        let key = SigningKey::from_bytes(secret).map_err(backend_err)?;
        let addr = key.verifying_key().into();
        Ok(Self { key, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign `msg` in the `"\x19Ethereum Signed Message:\n32"` format.
    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        let hash = hash_to_eth_signed_msg_hash(msg);

        let sig: recoverable::Signature = self.key.sign_prehash(&hash.0).map_err(backend_err)?;

        // Luckily for us, this Signature type already has the format we need:
        // 65 bytes containing r, s and the raw recovery id in this order.
        let bytes = sig.as_bytes();
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&bytes[..64]);
        Ok(to_eth_signature(&rs, bytes[64]))
    }
}

pub(super) fn recover_prehash(prehash: Hash, rs: &[u8; 64], recid: u8) -> Result<Address, Error> {
    let mut sig_bytes = [0u8; 65];
    sig_bytes[..64].copy_from_slice(rs);
    sig_bytes[64] = recid;

    let sig = recoverable::Signature::from_bytes(&sig_bytes).map_err(backend_err)?;
    let verifying_key = sig
        .recover_verifying_key_from_digest_bytes(&prehash.0.into())
        .map_err(backend_err)?;
    Ok(verifying_key.into())
}
