use super::{to_writer, types::Hash, Error, Writer};

use serde::Serialize;
use sha3::{digest::Output, Digest, Keccak256};

/// Feeds the encoded slots straight into Keccak-256, without buffering the
/// encoding.
pub struct Keccak256Writer {
    hasher: Keccak256,
}

impl Default for Keccak256Writer {
    fn default() -> Self {
        Self {
            hasher: Keccak256::new(),
        }
    }
}

impl Writer for Keccak256Writer {
    fn write(&mut self, slot: &[u8]) {
        self.hasher.update(slot);
    }
}

impl Keccak256Writer {
    pub fn finalize(self) -> Output<Keccak256> {
        self.hasher.finalize()
    }
}

/// `keccak256(abi.encode(value))`
pub fn to_hash<T>(value: &T) -> Result<Hash, Error>
where
    T: Serialize + ?Sized,
{
    let mut writer = Keccak256Writer::default();
    to_writer(value, &mut writer)?;
    Ok(Hash(writer.finalize().into()))
}
