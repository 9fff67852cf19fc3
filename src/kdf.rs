//! Password-based key derivation
//!
//! Stretches a password into an AES-256 key with PBKDF2-HMAC-SHA256. The
//! salt travels in the container, so decryption can rebuild the exact key
//! used at encryption time.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A derived AES-256 key, wiped from memory on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Derive a 32-byte key from a password and salt.
///
/// Deterministic: the same (password, salt) pair always yields the same key.
/// Nothing is cached between calls.
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> DerivedKey {
    log::debug!("deriving key ({} PBKDF2 iterations)", PBKDF2_ITERATIONS);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *key);

    DerivedKey(key)
}
