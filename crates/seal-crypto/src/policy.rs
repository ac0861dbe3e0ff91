//! Input policy: required fields, minimum password length, strength hint

use secrecy::{ExposeSecret, SecretString};

use crate::error::{SealError, SealResult};
use crate::kdf::KdfParams;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 7;

/// Suffix appended to the original filename of a sealed container.
pub const SEALED_SUFFIX: &str = ".sealed";

/// Deployment-wide settings. Every envelope produced under one policy can be
/// opened under the same policy; none of it varies per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub min_password_len: usize,
    pub kdf: KdfParams,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_password_len: MIN_PASSWORD_LEN,
            kdf: KdfParams::default(),
        }
    }
}

impl Policy {
    /// Check that all three inputs are present and the password is long
    /// enough. Runs before any key derivation.
    pub fn validate_inputs(
        &self,
        file_name: &str,
        password: &SecretString,
        email: &SecretString,
    ) -> SealResult<()> {
        let password = password.expose_secret();

        let mut missing = Vec::new();
        if file_name.is_empty() {
            missing.push("File");
        }
        if password.is_empty() {
            missing.push("Password");
        }
        if email.expose_secret().is_empty() {
            missing.push("Receiver Email");
        }
        if let Some(msg) = missing_inputs_message(&missing) {
            return Err(SealError::Validation(msg));
        }

        if password.chars().count() < self.min_password_len {
            return Err(SealError::Validation(format!(
                "Password must be at least {} characters long.",
                self.min_password_len
            )));
        }
        Ok(())
    }
}

/// "Missing: File.", "Missing: File and Password.", "Missing: File, Password and Receiver Email."
fn missing_inputs_message(missing: &[&str]) -> Option<String> {
    match missing {
        [] => None,
        [only] => Some(format!("Missing: {only}.")),
        [init @ .., last] => Some(format!("Missing: {} and {last}.", init.join(", "))),
    }
}

/// Name of the container produced for `original`.
pub fn sealed_name(original: &str) -> String {
    format!("{original}{SEALED_SUFFIX}")
}

/// Advisory password strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    /// Below the minimum length; not scored.
    None,
    Weak,
    Medium,
    Strong,
}

impl std::fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PasswordStrength::None => "none",
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        })
    }
}

/// One point each for length, uppercase, lowercase, digit and symbol.
pub fn password_strength(password: &str, min_len: usize) -> PasswordStrength {
    if password.chars().count() < min_len {
        return PasswordStrength::None;
    }

    let checks = [
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let score = 1 + checks.iter().filter(|&&hit| hit).count();

    match score {
        0..=2 => PasswordStrength::Weak,
        3..=4 => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    }
}
