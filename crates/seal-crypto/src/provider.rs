//! Cryptographic capability seam.
//!
//! The envelope pipeline never calls a primitive directly; it goes through a
//! [`CryptoProvider`]. [`RustCryptoProvider`] is the production
//! implementation (Argon2id, HKDF-SHA256, AES-256-GCM, OS-seeded CSPRNG).

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{SealError, SealResult};
use crate::kdf::KdfParams;
use crate::{KEY_SIZE, NONCE_SIZE};

/// An AEAD operation failed. Deliberately opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeadError;

impl std::fmt::Display for AeadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AEAD operation failed")
    }
}

impl std::error::Error for AeadError {}

pub trait CryptoProvider: Send + Sync {
    /// Fill `dest` with cryptographically secure random bytes.
    fn fill_random(&self, dest: &mut [u8]);

    /// Slow, memory-hard derivation of `out` from `secret` and `salt`.
    fn stretch(
        &self,
        secret: &[u8],
        salt: &[u8],
        params: &KdfParams,
        out: &mut [u8; KEY_SIZE],
    ) -> SealResult<()>;

    /// HKDF extract-then-expand into `out`.
    fn hkdf_extract_expand(
        &self,
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
        out: &mut [u8],
    ) -> SealResult<()>;

    /// Returns `ciphertext || tag`.
    fn aead_seal(
        &self,
        key: &[u8; KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AeadError>;

    /// Inverse of [`CryptoProvider::aead_seal`]. Returns nothing on failure.
    fn aead_open(
        &self,
        key: &[u8; KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AeadError>;
}

/// RustCrypto-backed provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn fill_random(&self, dest: &mut [u8]) {
        rand::thread_rng().fill_bytes(dest);
    }

    fn stretch(
        &self,
        secret: &[u8],
        salt: &[u8],
        params: &KdfParams,
        out: &mut [u8; KEY_SIZE],
    ) -> SealResult<()> {
        let argon2_params = Params::new(
            params.mem_cost_kib,
            params.time_cost,
            params.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| SealError::Derivation(format!("invalid Argon2id params: {e}")))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
            .hash_password_into(secret, salt, out)
            .map_err(|e| SealError::Derivation(format!("Argon2id failed: {e}")))
    }

    fn hkdf_extract_expand(
        &self,
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
        out: &mut [u8],
    ) -> SealResult<()> {
        let hkdf = Hkdf::<Sha256>::new(salt, ikm);
        hkdf.expand(info, out)
            .map_err(|e| SealError::Derivation(format!("HKDF expand failed: {e}")))
    }

    fn aead_seal(
        &self,
        key: &[u8; KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        let cipher = Aes256Gcm::new(key.into());
        cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| AeadError)
    }

    fn aead_open(
        &self,
        key: &[u8; KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        let cipher = Aes256Gcm::new(key.into());
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| AeadError)
    }
}
