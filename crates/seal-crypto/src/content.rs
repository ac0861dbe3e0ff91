//! File content AEAD under the data key
//!
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! AAD = serialized envelope header
//! ```
//!
//! Binding the header as AAD means the filename, which nothing else
//! authenticates, cannot be swapped without failing the content tag.
//!
//! The whole buffer is sealed in one AEAD call. Very large inputs would need
//! a chunked layout with per-chunk nonces, which this format does not define.

use crate::error::{SealError, SealResult};
use crate::keys::{generate_nonce, DataKey};
use crate::provider::CryptoProvider;
use crate::NONCE_SIZE;

/// Encrypt file content under the data key with a fresh nonce.
///
/// Returns `(nonce, ciphertext + tag)`.
pub fn encrypt_content(
    provider: &dyn CryptoProvider,
    data_key: &DataKey,
    aad: &[u8],
    plaintext: &[u8],
) -> SealResult<([u8; NONCE_SIZE], Vec<u8>)> {
    let nonce = generate_nonce(provider);
    let ciphertext = provider
        .aead_seal(data_key.as_bytes(), &nonce, aad, plaintext)
        .map_err(|_| {
            SealError::Validation(format!(
                "content of {} bytes exceeds the AEAD length limit",
                plaintext.len()
            ))
        })?;
    Ok((nonce, ciphertext))
}

/// Decrypt file content. Any tag failure is [`SealError::Integrity`] and no
/// plaintext is returned.
pub fn decrypt_content(
    provider: &dyn CryptoProvider,
    data_key: &DataKey,
    aad: &[u8],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> SealResult<Vec<u8>> {
    provider
        .aead_open(data_key.as_bytes(), nonce, aad, ciphertext)
        .map_err(|_| SealError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_data_key;
    use crate::provider::RustCryptoProvider;
    use crate::TAG_SIZE;

    const AAD: &[u8] = b"header-bytes";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);
        let plaintext = b"hello, encrypted world!";

        let (nonce, ct) = encrypt_content(&p, &key, AAD, plaintext).unwrap();
        let decrypted = decrypt_content(&p, &key, AAD, &nonce, &ct).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);

        let (nonce, ct) = encrypt_content(&p, &key, AAD, b"").unwrap();
        assert_eq!(ct.len(), TAG_SIZE);
        let decrypted = decrypt_content(&p, &key, AAD, &nonce, &ct).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_encrypted_size() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);
        let plaintext = vec![0u8; 1000];

        let (_, ct) = encrypt_content(&p, &key, AAD, &plaintext).unwrap();

        // plaintext (1000) + tag (16)
        assert_eq!(ct.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let p = RustCryptoProvider;
        let key1 = generate_data_key(&p);
        let key2 = generate_data_key(&p);

        let (nonce, ct) = encrypt_content(&p, &key1, AAD, b"secret data").unwrap();
        let result = decrypt_content(&p, &key2, AAD, &nonce, &ct);

        assert!(matches!(result, Err(SealError::Integrity)));
    }

    #[test]
    fn test_decrypt_wrong_aad() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);

        let (nonce, ct) = encrypt_content(&p, &key, AAD, b"secret data").unwrap();
        let result = decrypt_content(&p, &key, b"header-bytez", &nonce, &ct);

        assert!(
            matches!(result, Err(SealError::Integrity)),
            "header mismatch must fail"
        );
    }

    #[test]
    fn test_tampered_ciphertext() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);

        let (nonce, mut ct) = encrypt_content(&p, &key, AAD, b"secret data").unwrap();
        ct[3] ^= 0xFF;

        let result = decrypt_content(&p, &key, AAD, &nonce, &ct);
        assert!(matches!(result, Err(SealError::Integrity)));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let p = RustCryptoProvider;
        let key = generate_data_key(&p);

        let (nonce, ct) = encrypt_content(&p, &key, AAD, b"secret data").unwrap();
        let result = decrypt_content(&p, &key, AAD, &nonce, &ct[..ct.len() - 1]);
        assert!(matches!(result, Err(SealError::Integrity)));
    }
}
