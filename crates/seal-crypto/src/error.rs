//! Error taxonomy for the envelope pipeline

use thiserror::Error;

pub type SealResult<T> = Result<T, SealError>;

#[derive(Debug, Error)]
pub enum SealError {
    /// Missing or unacceptable caller input, detected before any key work.
    #[error("{0}")]
    Validation(String),

    /// Malformed input to the stretching/combining stage.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// The wrapped data key did not verify under the derived master key.
    ///
    /// Wrong password, wrong email and a tampered header all land here.
    #[error("key unwrapping failed: invalid credentials or corrupted file")]
    Authentication,

    /// The content tag did not verify.
    #[error("content decryption failed: invalid credentials or corrupted file")]
    Integrity,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The output sink could not persist the result.
    #[error("output failed: {0}")]
    Output(#[source] anyhow::Error),
}

/// Discriminant of [`SealError`], safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Derivation,
    Authentication,
    Integrity,
    MalformedEnvelope,
    Output,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Derivation => "derivation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Integrity => "integrity",
            ErrorKind::MalformedEnvelope => "malformed_envelope",
            ErrorKind::Output => "output",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SealError::Validation(_) => ErrorKind::Validation,
            SealError::Derivation(_) => ErrorKind::Derivation,
            SealError::Authentication => ErrorKind::Authentication,
            SealError::Integrity => ErrorKind::Integrity,
            SealError::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
            SealError::Output(_) => ErrorKind::Output,
        }
    }

    /// Message suitable for showing to the person at the keyboard.
    ///
    /// Authentication and integrity failures share one message so the
    /// output never reveals which secret was wrong.
    pub fn user_message(&self) -> String {
        match self {
            SealError::Validation(msg) => msg.clone(),
            SealError::Derivation(_) => "Operation failed due to an internal error.".into(),
            SealError::Authentication | SealError::Integrity => {
                "Invalid credentials or corrupted file.".into()
            }
            SealError::MalformedEnvelope(_) => "Not a valid sealed container.".into(),
            SealError::Output(e) => format!("Could not save the result: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures_are_indistinguishable_to_users() {
        assert_eq!(
            SealError::Authentication.user_message(),
            SealError::Integrity.user_message()
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SealError::MalformedEnvelope("x".into()).kind(),
            ErrorKind::MalformedEnvelope
        );
        assert_eq!(SealError::Validation("x".into()).kind().as_str(), "validation");
        assert_eq!(
            SealError::Output(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Output
        );
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = SealError::Validation("Missing: Password.".into());
        assert_eq!(err.user_message(), "Missing: Password.");
    }
}
