//! Security event reporting.
//!
//! The pipeline reports what it is doing through an [`EventSink`]. Events are
//! fixed names plus a severity; nothing secret can be attached to them.

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Where a seal/open call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Before the first call. Never logged; a call starts at `Validating`.
    Idle,
    Validating,
    ParsingEnvelope,
    DerivingKeys,
    WrappingKey,
    UnwrappingKey,
    ProcessingContent,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    EncryptStarted,
    DecryptStarted,
    StageEntered(Stage),
    EncryptSucceeded,
    DecryptSucceeded,
    Failed(ErrorKind),
}

impl SecurityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SecurityEvent::EncryptStarted => "encrypt.started",
            SecurityEvent::DecryptStarted => "decrypt.started",
            SecurityEvent::StageEntered(stage) => match stage {
                Stage::Idle => "stage.idle",
                Stage::Validating => "stage.validating",
                Stage::ParsingEnvelope => "stage.parsing_envelope",
                Stage::DerivingKeys => "stage.deriving_keys",
                Stage::WrappingKey => "stage.wrapping_key",
                Stage::UnwrappingKey => "stage.unwrapping_key",
                Stage::ProcessingContent => "stage.processing_content",
                Stage::Done => "stage.done",
                Stage::Failed(_) => "stage.failed",
            },
            SecurityEvent::EncryptSucceeded => "encrypt.succeeded",
            SecurityEvent::DecryptSucceeded => "decrypt.succeeded",
            SecurityEvent::Failed(kind) => match kind {
                ErrorKind::Validation => "failed.validation",
                ErrorKind::Derivation => "failed.derivation",
                ErrorKind::Authentication => "failed.authentication",
                ErrorKind::Integrity => "failed.integrity",
                ErrorKind::MalformedEnvelope => "failed.malformed_envelope",
                ErrorKind::Output => "failed.output",
            },
        }
    }
}

pub trait EventSink: Send + Sync {
    fn log(&self, event: SecurityEvent, severity: Severity);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
    fn log(&self, _event: SecurityEvent, _severity: Severity) {}
}

/// Forwards events to `tracing` under the `seal::security` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn log(&self, event: SecurityEvent, severity: Severity) {
        let name = event.name();
        match severity {
            Severity::Info => tracing::info!(target: "seal::security", event = name, "security event"),
            Severity::Warn => tracing::warn!(target: "seal::security", event = name, "security event"),
            Severity::Error => {
                tracing::error!(target: "seal::security", event = name, "security event")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Done.is_terminal());
        assert!(Stage::Failed(ErrorKind::Integrity).is_terminal());
        assert!(!Stage::DerivingKeys.is_terminal());
    }

    #[test]
    fn test_event_names_are_dotted() {
        let events = [
            SecurityEvent::EncryptStarted,
            SecurityEvent::StageEntered(Stage::UnwrappingKey),
            SecurityEvent::Failed(ErrorKind::MalformedEnvelope),
        ];
        for e in events {
            assert!(e.name().contains('.'), "{}", e.name());
        }
        assert_eq!(
            SecurityEvent::StageEntered(Stage::DerivingKeys).name(),
            "stage.deriving_keys"
        );
    }
}
