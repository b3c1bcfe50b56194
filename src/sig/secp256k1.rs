//! Signer using libsecp256k1 through the secp256k1 crate.

use crate::abiencode::types::{Address, Hash, Signature};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};

use super::{address_from_uncompressed, hash_to_eth_signed_msg_hash, to_eth_signature, Error};

fn backend_err(e: secp256k1::Error) -> Error {
    Error::Backend(e.to_string())
}

impl From<PublicKey> for Address {
    fn from(pk: PublicKey) -> Self {
        address_from_uncompressed(&pk.serialize_uncompressed())
    }
}

pub struct Signer {
    secp: Secp256k1<All>,
    key: SecretKey,
    addr: Address,
}

impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let secp = Secp256k1::new();
        let key = SecretKey::new(rng);
        let addr = PublicKey::from_secret_key(&secp, &key).into();
        Self { secp, key, addr }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, Error> {
        let secp = Secp256k1::new();
        let key = SecretKey::from_slice(secret).map_err(backend_err)?;
        let addr = PublicKey::from_secret_key(&secp, &key).into();
        Ok(Self { secp, key, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign a hash using a Ethereum 65-byte recoverable signature.
    ///
    /// Note that this differs from transaction signatures, as it does not
    /// include the length or a chain id.
    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        let hash = hash_to_eth_signed_msg_hash(msg);
        let msg = Message::from_slice(&hash.0).map_err(backend_err)?;

        // sign_ecdsa_recoverable gives us the additional information needed
        // for v. libsecp256k1 always produces low-s signatures.
        let sig = self.secp.sign_ecdsa_recoverable(&msg, &self.key);
        let (recid, rs) = sig.serialize_compact();

        Ok(to_eth_signature(&rs, recid.to_i32() as u8))
    }
}

pub(super) fn recover_prehash(prehash: Hash, rs: &[u8; 64], recid: u8) -> Result<Address, Error> {
    let msg = Message::from_slice(&prehash.0).map_err(backend_err)?;
    let recid = RecoveryId::from_i32(recid.into()).map_err(backend_err)?;
    let sig = RecoverableSignature::from_compact(rs, recid).map_err(backend_err)?;

    let pk = Secp256k1::verification_only()
        .recover_ecdsa(&msg, &sig)
        .map_err(backend_err)?;
    Ok(pk.into())
}
