//! Sealed container format
//!
//! ```text
//! [u16 LE: filename_len][filename_len bytes: UTF-8 filename]
//! [16 bytes: password salt][16 bytes: email salt]
//! [12 bytes: wrap nonce]
//! [u16 LE: wrapped_key_len][wrapped_key_len bytes: wrapped data key + tag]
//! ---------------------------------------------------------------- header
//! [12 bytes: content nonce][remainder: content ciphertext + 16-byte tag]
//! ```
//!
//! Every length prefix is checked against the bytes actually present before
//! anything is copied out of the buffer.

use serde::Serialize;

use crate::error::{SealError, SealResult};
use crate::kdf::Salt;
use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Largest filename or wrapped key a `u16` length prefix can describe.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Size of a header with empty variable-length fields.
pub const FIXED_HEADER_LEN: usize = 2 + 2 * SALT_SIZE + NONCE_SIZE + 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub filename: String,
    pub salt_password: Salt,
    pub salt_email: Salt,
    pub wrap_nonce: [u8; NONCE_SIZE],
    pub wrapped_key: Vec<u8>,
}

impl EnvelopeHeader {
    /// Serialize the header in its fixed field order.
    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        let name = self.filename.as_bytes();
        let name_len = field_len(name.len(), "filename")?;
        let wrapped_len = field_len(self.wrapped_key.len(), "wrapped key")?;

        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + name.len() + self.wrapped_key.len());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&self.salt_password);
        out.extend_from_slice(&self.salt_email);
        out.extend_from_slice(&self.wrap_nonce);
        out.extend_from_slice(&wrapped_len.to_le_bytes());
        out.extend_from_slice(&self.wrapped_key);
        Ok(out)
    }

    /// Parse a header from the front of `bytes`.
    ///
    /// Returns the header and its exact length in bytes, so the caller can
    /// slice the remainder as encrypted content.
    pub fn parse(bytes: &[u8]) -> SealResult<(Self, usize)> {
        let mut r = Reader::new(bytes);

        let name_len = r.u16_le("filename length")? as usize;
        let name = r.take(name_len, "filename")?;
        if name.is_empty() {
            return Err(SealError::MalformedEnvelope("empty filename".into()));
        }
        let filename = std::str::from_utf8(name)
            .map_err(|_| SealError::MalformedEnvelope("filename is not valid UTF-8".into()))?
            .to_string();

        let salt_password = r.array::<SALT_SIZE>("password salt")?;
        let salt_email = r.array::<SALT_SIZE>("email salt")?;
        let wrap_nonce = r.array::<NONCE_SIZE>("wrap nonce")?;

        let wrapped_len = r.u16_le("wrapped key length")? as usize;
        if wrapped_len < TAG_SIZE {
            return Err(SealError::MalformedEnvelope(format!(
                "wrapped key of {wrapped_len} bytes cannot hold a {TAG_SIZE}-byte tag"
            )));
        }
        let wrapped_key = r.take(wrapped_len, "wrapped key")?.to_vec();

        Ok((
            Self {
                filename,
                salt_password,
                salt_email,
                wrap_nonce,
                wrapped_key,
            },
            r.pos,
        ))
    }
}

fn field_len(len: usize, field: &str) -> SealResult<u16> {
    u16::try_from(len).map_err(|_| {
        SealError::Validation(format!(
            "{field} is {len} bytes; the container allows at most {MAX_FIELD_LEN}"
        ))
    })
}

/// A parsed container, borrowing its variable-size parts from the input.
#[derive(Debug)]
pub struct Envelope<'a> {
    pub header: EnvelopeHeader,
    /// Raw header bytes, authenticated as AAD by the content cipher.
    pub header_bytes: &'a [u8],
    pub content_nonce: [u8; NONCE_SIZE],
    /// Content ciphertext including the trailing tag.
    pub ciphertext: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn parse(bytes: &'a [u8]) -> SealResult<Self> {
        let (header, header_len) = EnvelopeHeader::parse(bytes)?;
        let (header_bytes, rest) = bytes.split_at(header_len);

        if rest.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SealError::MalformedEnvelope(format!(
                "content section is {} bytes (minimum {})",
                rest.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        let mut content_nonce = [0u8; NONCE_SIZE];
        content_nonce.copy_from_slice(nonce);

        Ok(Self {
            header,
            header_bytes,
            content_nonce,
            ciphertext,
        })
    }

    /// Non-secret facts about the container.
    pub fn summary(&self) -> EnvelopeSummary {
        EnvelopeSummary {
            filename: self.header.filename.clone(),
            header_len: self.header_bytes.len(),
            wrapped_key_len: self.header.wrapped_key.len(),
            plaintext_len: self.ciphertext.len() - TAG_SIZE,
        }
    }
}

/// What `inspect` may show: no salts, no nonces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeSummary {
    pub filename: String,
    pub header_len: usize,
    pub wrapped_key_len: usize,
    pub plaintext_len: usize,
}

/// Concatenate header, content nonce and content ciphertext.
pub fn assemble(header_bytes: &[u8], content_nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header_bytes.len() + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(header_bytes);
    out.extend_from_slice(content_nonce);
    out.extend_from_slice(ciphertext);
    out
}

/// Bounds-checked cursor over the header bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &str) -> SealResult<&'a [u8]> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(SealError::MalformedEnvelope(format!(
                "{field} needs {n} bytes but only {remaining} remain"
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self, field: &str) -> SealResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn u16_le(&mut self, field: &str) -> SealResult<u16> {
        Ok(u16::from_le_bytes(self.array::<2>(field)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> EnvelopeHeader {
        EnvelopeHeader {
            filename: "note.txt".into(),
            salt_password: [1u8; SALT_SIZE],
            salt_email: [2u8; SALT_SIZE],
            wrap_nonce: [3u8; NONCE_SIZE],
            wrapped_key: vec![4u8; 48],
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_header().to_bytes().unwrap();

        assert_eq!(bytes.len(), FIXED_HEADER_LEN + 8 + 48);
        assert_eq!(&bytes[..2], &8u16.to_le_bytes());
        assert_eq!(&bytes[2..10], b"note.txt");
        assert_eq!(&bytes[10..26], &[1u8; 16]);
        assert_eq!(&bytes[26..42], &[2u8; 16]);
        assert_eq!(&bytes[42..54], &[3u8; 12]);
        assert_eq!(&bytes[54..56], &48u16.to_le_bytes());
        assert_eq!(&bytes[56..], &[4u8; 48][..]);
    }

    #[test]
    fn test_parse_reports_header_length() {
        let header = sample_header();
        let mut bytes = header.to_bytes().unwrap();
        let header_len = bytes.len();
        bytes.extend_from_slice(b"trailing content");

        let (parsed, len) = EnvelopeHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(len, header_len);
    }

    #[test]
    fn test_unicode_filename() {
        let header = EnvelopeHeader {
            filename: "résumé 📄.pdf".into(),
            ..sample_header()
        };
        let bytes = header.to_bytes().unwrap();
        let (parsed, _) = EnvelopeHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.filename, "résumé 📄.pdf");
    }

    #[test]
    fn test_oversized_filename_length_rejected() {
        // Claims a 65535-byte filename in a 10-byte buffer
        let mut bytes = u16::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"short");

        let err = EnvelopeHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, SealError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_oversized_wrapped_key_length_rejected() {
        let mut bytes = sample_header().to_bytes().unwrap();
        // wrapped key length lives right after the fixed fields + filename
        let at = 2 + 8 + 2 * SALT_SIZE + NONCE_SIZE;
        bytes[at..at + 2].copy_from_slice(&u16::MAX.to_le_bytes());

        let err = EnvelopeHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, SealError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_every_truncation_is_malformed() {
        let bytes = sample_header().to_bytes().unwrap();
        for cut in 0..bytes.len() {
            assert!(
                matches!(
                    EnvelopeHeader::parse(&bytes[..cut]),
                    Err(SealError::MalformedEnvelope(_))
                ),
                "truncation at {cut} must be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_utf8_filename() {
        let mut bytes = sample_header().to_bytes().unwrap();
        bytes[2] = 0xFF;
        assert!(matches!(
            EnvelopeHeader::parse(&bytes),
            Err(SealError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_empty_filename_rejected() {
        let mut bytes = 0u16.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 2 * SALT_SIZE + NONCE_SIZE]);
        bytes.extend_from_slice(&48u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 48]);
        assert!(matches!(
            EnvelopeHeader::parse(&bytes),
            Err(SealError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_serialize_rejects_long_filename() {
        let header = EnvelopeHeader {
            filename: "a".repeat(MAX_FIELD_LEN + 1),
            ..sample_header()
        };
        assert!(matches!(header.to_bytes(), Err(SealError::Validation(_))));
    }

    #[test]
    fn test_envelope_split() {
        let header_bytes = sample_header().to_bytes().unwrap();
        let ciphertext = [9u8; 40];
        let container = assemble(&header_bytes, &[8u8; NONCE_SIZE], &ciphertext);

        let env = Envelope::parse(&container).unwrap();
        assert_eq!(env.header_bytes, &header_bytes[..]);
        assert_eq!(env.content_nonce, [8u8; NONCE_SIZE]);
        assert_eq!(env.ciphertext, &ciphertext[..]);

        let summary = env.summary();
        assert_eq!(summary.filename, "note.txt");
        assert_eq!(summary.wrapped_key_len, 48);
        assert_eq!(summary.plaintext_len, 40 - TAG_SIZE);
    }

    #[test]
    fn test_envelope_without_content_rejected() {
        let header_bytes = sample_header().to_bytes().unwrap();
        let container = assemble(&header_bytes, &[8u8; NONCE_SIZE], &[0u8; TAG_SIZE - 1]);

        assert!(matches!(
            Envelope::parse(&container),
            Err(SealError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse(&header_bytes),
            Err(SealError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            Envelope::parse(&[]),
            Err(SealError::MalformedEnvelope(_))
        ));
    }
}
