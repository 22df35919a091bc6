//! Symmetric key material.
//!
//! The credential store deals in strings, so key bytes travel as standard
//! base64. The raw bytes are zeroized when the value is dropped.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::{env::Environment, error::KeyError};

/// Length of an encryption key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// 256-bit symmetric key.
///
/// `Debug` never prints the bytes. Equality compares the bytes in constant
/// time.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Draw a fresh key from the environment's secure random source.
    ///
    /// Fails with [`KeyError::RandomSourceUnavailable`] rather than falling
    /// back to a weaker generator.
    pub fn generate<E: Environment>(env: &E) -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_LEN];
        if let Err(err) = env.random_bytes(&mut bytes) {
            bytes.zeroize();
            return Err(KeyError::RandomSourceUnavailable(err));
        }
        Ok(Self { bytes })
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Standard base64 encoding, as stored and as handed to consumers.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.bytes))
    }

    /// Decode a stored value.
    ///
    /// `field` names the store entry for the error; the value itself is never
    /// echoed.
    pub fn from_base64(encoded: &str, field: &'static str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(
            STANDARD.decode(encoded.trim()).map_err(|_| KeyError::MalformedKey { field })?,
        );

        let bytes: [u8; KEY_LEN] =
            decoded.as_slice().try_into().map_err(|_| KeyError::MalformedKey { field })?;

        Ok(Self { bytes })
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
