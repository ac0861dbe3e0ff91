//! Key derivation: Argon2id secret stretching and the two-secret master key
//!
//! ```text
//! password ──Argon2id(salt_password)──┐
//!                                     ├── HKDF-SHA256 ── MasterKey
//! email ─────Argon2id(salt_email)─────┘
//! ```

use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{SealError, SealResult};
use crate::provider::CryptoProvider;
use crate::{KEY_SIZE, SALT_SIZE};

/// HKDF info label for the master key.
const MASTER_KEY_INFO: &[u8] = b"sealbox-master-key-v1";

pub type Salt = [u8; SALT_SIZE];

/// 256-bit output of stretching one secret. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StretchedKey {
    bytes: [u8; KEY_SIZE],
}

impl StretchedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for StretchedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StretchedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 256-bit master key bound to both the password and the email.
///
/// Only ever used to wrap or unwrap a data key. Zeroized on drop.
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for stretching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Generate a fresh random salt.
pub fn generate_salt(provider: &dyn CryptoProvider) -> Salt {
    let mut salt = [0u8; SALT_SIZE];
    provider.fill_random(&mut salt);
    salt
}

/// Stretch a password or email into 256 bits of key material.
///
/// Deterministic for a given secret, salt and params. An empty secret or a
/// salt that is not exactly [`SALT_SIZE`] bytes is a caller bug and fails
/// with [`SealError::Derivation`].
pub fn stretch(
    provider: &dyn CryptoProvider,
    secret: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> SealResult<StretchedKey> {
    let secret = secret.expose_secret();
    if secret.is_empty() {
        return Err(SealError::Derivation("empty secret".into()));
    }
    if salt.len() != SALT_SIZE {
        return Err(SealError::Derivation(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }

    let mut key = StretchedKey::from_bytes([0u8; KEY_SIZE]);
    provider.stretch(secret.as_bytes(), salt, params, &mut key.bytes)?;
    Ok(key)
}

/// Combine the stretched password and stretched email into the master key.
///
/// HKDF-SHA256 over `password_key || email_key`. Argument order is part of
/// the format.
pub fn combine(
    provider: &dyn CryptoProvider,
    stretched_password: &StretchedKey,
    stretched_email: &StretchedKey,
) -> SealResult<MasterKey> {
    let mut ikm = [0u8; 2 * KEY_SIZE];
    ikm[..KEY_SIZE].copy_from_slice(stretched_password.as_bytes());
    ikm[KEY_SIZE..].copy_from_slice(stretched_email.as_bytes());

    let mut master = MasterKey::from_bytes([0u8; KEY_SIZE]);
    let result = provider.hkdf_extract_expand(None, &ikm, MASTER_KEY_INFO, &mut master.bytes);
    ikm.zeroize();
    result?;

    Ok(master)
}

/// Stretch both secrets and combine them.
pub fn derive_master_key(
    provider: &dyn CryptoProvider,
    password: &SecretString,
    email: &SecretString,
    salt_password: &Salt,
    salt_email: &Salt,
    params: &KdfParams,
) -> SealResult<MasterKey> {
    let kp = stretch(provider, password, salt_password, params)?;
    let ke = stretch(provider, email, salt_email, params)?;
    combine(provider, &kp, &ke)
}
