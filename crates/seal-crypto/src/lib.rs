//! seal-crypto: two-secret hybrid envelope encryption for single files
//!
//! Key hierarchy:
//! ```text
//! password ── Argon2id(salt_p) ──┐
//!                                ├── HKDF-SHA256 ── Master Key (never stored)
//! email ───── Argon2id(salt_e) ──┘        │
//!                                         └── wraps (AES-256-GCM) ── Data Key (random, per file)
//!                                                                      └── Content AEAD: AES-256-GCM
//!                                                                          (AAD = container header)
//! ```
//!
//! Decryption succeeds only when both secrets match: the master key is
//! derived from both, and the wrapped data key's tag is the single check.

pub mod content;
pub mod envelope;
pub mod error;
pub mod events;
pub mod io;
pub mod kdf;
pub mod keys;
pub mod policy;
pub mod provider;
pub mod sealer;

pub use envelope::{Envelope, EnvelopeHeader, EnvelopeSummary};
pub use error::{ErrorKind, SealError, SealResult};
pub use events::{EventSink, NoopEvents, SecurityEvent, Severity, Stage, TracingEvents};
pub use io::{MemoryFile, MemorySink, SealSink, SealSource};
pub use kdf::{KdfParams, MasterKey, StretchedKey};
pub use keys::DataKey;
pub use policy::{password_strength, PasswordStrength, Policy, MIN_PASSWORD_LEN, SEALED_SUFFIX};
pub use provider::{CryptoProvider, RustCryptoProvider};
pub use sealer::{OpenedFile, SealedFile, Sealer};

/// Size of every symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a stretching salt
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
