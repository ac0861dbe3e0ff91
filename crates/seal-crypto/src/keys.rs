//! Data keys: generation and AES-256-GCM wrapping under the master key

use zeroize::Zeroize;

use crate::error::{SealError, SealResult};
use crate::kdf::MasterKey;
use crate::provider::CryptoProvider;
use crate::{KEY_SIZE, NONCE_SIZE};

/// A per-file 256-bit data-encryption key. Zeroized on drop.
///
/// The only key that ever touches file content.
pub struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit data key.
pub fn generate_data_key(provider: &dyn CryptoProvider) -> DataKey {
    let mut key = DataKey::from_bytes([0u8; KEY_SIZE]);
    provider.fill_random(&mut key.bytes);
    key
}

/// Generate a random 96-bit nonce.
pub fn generate_nonce(provider: &dyn CryptoProvider) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    provider.fill_random(&mut nonce);
    nonce
}

/// Wrap (encrypt) a data key under the master key.
///
/// Returns `(ciphertext + 16-byte tag, nonce)`.
pub fn wrap_key(
    provider: &dyn CryptoProvider,
    master: &MasterKey,
    data_key: &DataKey,
) -> SealResult<(Vec<u8>, [u8; NONCE_SIZE])> {
    let nonce = generate_nonce(provider);
    let wrapped = provider
        .aead_seal(master.as_bytes(), &nonce, &[], data_key.as_bytes())
        .map_err(|e| SealError::Derivation(format!("key wrapping failed: {e}")))?;
    Ok((wrapped, nonce))
}

/// Unwrap (decrypt) a data key with the master key.
///
/// A tag mismatch and a plaintext of the wrong size both fail with
/// [`SealError::Authentication`]; the caller cannot tell which secret was wrong.
pub fn unwrap_key(
    provider: &dyn CryptoProvider,
    master: &MasterKey,
    wrapped: &[u8],
    nonce: &[u8; NONCE_SIZE],
) -> SealResult<DataKey> {
    let mut plaintext = provider
        .aead_open(master.as_bytes(), nonce, &[], wrapped)
        .map_err(|_| SealError::Authentication)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(SealError::Authentication);
    }

    let mut key = DataKey::from_bytes([0u8; KEY_SIZE]);
    key.bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RustCryptoProvider;
    use crate::TAG_SIZE;

    fn test_master_key() -> MasterKey {
        MasterKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_data_key_generation() {
        let k1 = generate_data_key(&RustCryptoProvider);
        let k2 = generate_data_key(&RustCryptoProvider);
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_key_wrap_unwrap_roundtrip() {
        let p = RustCryptoProvider;
        let master = test_master_key();
        let data_key = generate_data_key(&p);

        let (wrapped, nonce) = wrap_key(&p, &master, &data_key).unwrap();
        let unwrapped = unwrap_key(&p, &master, &wrapped, &nonce).unwrap();

        assert_eq!(data_key.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_wrapped_key_size() {
        let p = RustCryptoProvider;
        let (wrapped, _) = wrap_key(&p, &test_master_key(), &generate_data_key(&p)).unwrap();

        // key (32) + tag (16) = 48
        assert_eq!(wrapped.len(), KEY_SIZE + TAG_SIZE);
    }

    #[test]
    fn test_wrapped_key_hides_data_key() {
        let p = RustCryptoProvider;
        let data_key = generate_data_key(&p);
        let (wrapped, _) = wrap_key(&p, &test_master_key(), &data_key).unwrap();

        assert!(!wrapped
            .windows(KEY_SIZE)
            .any(|w| w == data_key.as_bytes().as_slice()));
    }

    #[test]
    fn test_key_unwrap_wrong_master() {
        let p = RustCryptoProvider;
        let master1 = MasterKey::from_bytes([1u8; KEY_SIZE]);
        let master2 = MasterKey::from_bytes([2u8; KEY_SIZE]);

        let (wrapped, nonce) = wrap_key(&p, &master1, &generate_data_key(&p)).unwrap();
        let result = unwrap_key(&p, &master2, &wrapped, &nonce);

        assert!(matches!(result, Err(SealError::Authentication)));
    }

    #[test]
    fn test_key_unwrap_wrong_nonce() {
        let p = RustCryptoProvider;
        let master = test_master_key();

        let (wrapped, mut nonce) = wrap_key(&p, &master, &generate_data_key(&p)).unwrap();
        nonce[0] ^= 0x01;

        assert!(matches!(
            unwrap_key(&p, &master, &wrapped, &nonce),
            Err(SealError::Authentication)
        ));
    }

    #[test]
    fn test_unwrap_rejects_wrong_length_plaintext() {
        let p = RustCryptoProvider;
        let master = test_master_key();
        let nonce = [5u8; NONCE_SIZE];
        let short = p.aead_seal(master.as_bytes(), &nonce, &[], &[0u8; 16]).unwrap();

        assert!(matches!(
            unwrap_key(&p, &master, &short, &nonce),
            Err(SealError::Authentication)
        ));
    }

    #[test]
    fn test_wrap_nonces_are_fresh() {
        let p = RustCryptoProvider;
        let master = test_master_key();
        let data_key = generate_data_key(&p);

        let (w1, n1) = wrap_key(&p, &master, &data_key).unwrap();
        let (w2, n2) = wrap_key(&p, &master, &data_key).unwrap();

        assert_ne!(n1, n2);
        assert_ne!(w1, w2);
    }
}
