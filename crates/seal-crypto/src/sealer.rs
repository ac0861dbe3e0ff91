//! End-to-end seal and open flows.
//!
//! ```text
//! encrypt: validate → salts → stretch ×2 → combine → DEK → wrap → header → content AEAD
//! decrypt: validate → parse → stretch ×2 → combine → unwrap → content AEAD
//! ```
//!
//! Each call is a single attempt. Any error moves the call straight to
//! [`Stage::Failed`] and nothing partial is returned.

use std::sync::Arc;

use secrecy::SecretString;

use crate::content::{decrypt_content, encrypt_content};
use crate::envelope::{assemble, Envelope, EnvelopeHeader, MAX_FIELD_LEN};
use crate::error::{ErrorKind, SealError, SealResult};
use crate::events::{EventSink, NoopEvents, SecurityEvent, Severity, Stage};
use crate::io::{SealSink, SealSource};
use crate::kdf::{derive_master_key, generate_salt};
use crate::keys::{generate_data_key, unwrap_key, wrap_key};
use crate::policy::{sealed_name, Policy};
use crate::provider::{CryptoProvider, RustCryptoProvider};

/// A finished container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFile {
    /// Original name with the sealed suffix appended.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A recovered file.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenedFile {
    /// Filename recorded in the container header.
    pub name: String,
    pub plaintext: Vec<u8>,
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("name", &self.name)
            .field("plaintext_len", &self.plaintext.len())
            .finish()
    }
}

/// Runs the encrypt and decrypt flows.
///
/// Holds no per-call state, so one `Sealer` may be cloned into worker
/// threads. The stretching stage is deliberately slow; async callers should
/// run calls on a blocking thread.
#[derive(Clone)]
pub struct Sealer {
    policy: Policy,
    provider: Arc<dyn CryptoProvider>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sealer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Sealer {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl Sealer {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            provider: Arc::new(RustCryptoProvider),
            events: Arc::new(NoopEvents),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Seal `source` under `password` and `email`.
    pub fn encrypt<S: SealSource + ?Sized>(
        &self,
        source: &S,
        password: &SecretString,
        email: &SecretString,
    ) -> SealResult<SealedFile> {
        self.events.log(SecurityEvent::EncryptStarted, Severity::Info);
        let result = self.run_encrypt(source, password, email);
        self.finish(result, SecurityEvent::EncryptSucceeded)
    }

    /// Open a container produced by [`Sealer::encrypt`].
    pub fn decrypt<S: SealSource + ?Sized>(
        &self,
        container: &S,
        password: &SecretString,
        email: &SecretString,
    ) -> SealResult<OpenedFile> {
        self.events.log(SecurityEvent::DecryptStarted, Severity::Info);
        let result = self.run_decrypt(container, password, email);
        self.finish(result, SecurityEvent::DecryptSucceeded)
    }

    /// [`Sealer::encrypt`], handing the container to `sink`. Returns its name.
    pub fn encrypt_to<S, K>(
        &self,
        source: &S,
        password: &SecretString,
        email: &SecretString,
        sink: &mut K,
    ) -> SealResult<String>
    where
        S: SealSource + ?Sized,
        K: SealSink + ?Sized,
    {
        self.events.log(SecurityEvent::EncryptStarted, Severity::Info);
        let result = self
            .run_encrypt(source, password, email)
            .and_then(|sealed| {
                deliver(sink, &sealed.bytes, &sealed.name)?;
                Ok(sealed.name)
            });
        self.finish(result, SecurityEvent::EncryptSucceeded)
    }

    /// [`Sealer::decrypt`], handing the plaintext to `sink`. Returns the
    /// recorded filename.
    pub fn decrypt_to<S, K>(
        &self,
        container: &S,
        password: &SecretString,
        email: &SecretString,
        sink: &mut K,
    ) -> SealResult<String>
    where
        S: SealSource + ?Sized,
        K: SealSink + ?Sized,
    {
        self.events.log(SecurityEvent::DecryptStarted, Severity::Info);
        let result = self
            .run_decrypt(container, password, email)
            .and_then(|opened| {
                deliver(sink, &opened.plaintext, &opened.name)?;
                Ok(opened.name)
            });
        self.finish(result, SecurityEvent::DecryptSucceeded)
    }

    fn run_encrypt<S: SealSource + ?Sized>(
        &self,
        source: &S,
        password: &SecretString,
        email: &SecretString,
    ) -> SealResult<SealedFile> {
        let p = self.provider.as_ref();

        self.enter(Stage::Validating);
        let filename = source.name();
        self.policy.validate_inputs(filename, password, email)?;
        if filename.len() > MAX_FIELD_LEN {
            return Err(SealError::Validation(format!(
                "File name is too long ({} bytes, at most {MAX_FIELD_LEN}).",
                filename.len()
            )));
        }

        self.enter(Stage::DerivingKeys);
        let salt_password = generate_salt(p);
        let salt_email = generate_salt(p);
        let master = derive_master_key(
            p,
            password,
            email,
            &salt_password,
            &salt_email,
            &self.policy.kdf,
        )?;

        self.enter(Stage::WrappingKey);
        let data_key = generate_data_key(p);
        let (wrapped_key, wrap_nonce) = wrap_key(p, &master, &data_key)?;
        drop(master);

        let header = EnvelopeHeader {
            filename: filename.to_string(),
            salt_password,
            salt_email,
            wrap_nonce,
            wrapped_key,
        };
        let header_bytes = header.to_bytes()?;

        self.enter(Stage::ProcessingContent);
        let (content_nonce, ciphertext) =
            encrypt_content(p, &data_key, &header_bytes, source.bytes())?;

        Ok(SealedFile {
            name: sealed_name(filename),
            bytes: assemble(&header_bytes, &content_nonce, &ciphertext),
        })
    }

    fn run_decrypt<S: SealSource + ?Sized>(
        &self,
        container: &S,
        password: &SecretString,
        email: &SecretString,
    ) -> SealResult<OpenedFile> {
        let p = self.provider.as_ref();

        self.enter(Stage::Validating);
        self.policy
            .validate_inputs(container.name(), password, email)?;

        // Reject garbage before paying for two Argon2id runs
        self.enter(Stage::ParsingEnvelope);
        let envelope = Envelope::parse(container.bytes())?;

        self.enter(Stage::DerivingKeys);
        let master = derive_master_key(
            p,
            password,
            email,
            &envelope.header.salt_password,
            &envelope.header.salt_email,
            &self.policy.kdf,
        )?;

        self.enter(Stage::UnwrappingKey);
        let data_key = unwrap_key(
            p,
            &master,
            &envelope.header.wrapped_key,
            &envelope.header.wrap_nonce,
        )?;
        drop(master);

        self.enter(Stage::ProcessingContent);
        let plaintext = decrypt_content(
            p,
            &data_key,
            envelope.header_bytes,
            &envelope.content_nonce,
            envelope.ciphertext,
        )?;

        Ok(OpenedFile {
            name: envelope.header.filename,
            plaintext,
        })
    }

    fn enter(&self, stage: Stage) {
        self.events
            .log(SecurityEvent::StageEntered(stage), Severity::Info);
    }

    fn finish<T>(&self, result: SealResult<T>, success: SecurityEvent) -> SealResult<T> {
        match &result {
            Ok(_) => {
                self.enter(Stage::Done);
                self.events.log(success, Severity::Info);
            }
            Err(e) => {
                let kind = e.kind();
                let severity = match kind {
                    ErrorKind::Validation => Severity::Warn,
                    _ => Severity::Error,
                };
                self.events
                    .log(SecurityEvent::StageEntered(Stage::Failed(kind)), severity);
                self.events.log(SecurityEvent::Failed(kind), severity);
            }
        }
        result
    }
}

fn deliver<K: SealSink + ?Sized>(sink: &mut K, bytes: &[u8], name: &str) -> SealResult<()> {
    sink.accept(bytes, name).map_err(SealError::Output)
}
