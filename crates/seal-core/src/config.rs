use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Smallest minimum-password-length a deployment may configure.
pub const MIN_PASSWORD_LEN_FLOOR: usize = 7;

/// Top-level configuration (loaded from seal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    pub log: LogConfig,
    pub kdf: KdfConfig,
    pub policy: PolicyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Argon2id cost parameters.
///
/// Every envelope produced under one deployment must be opened with the same
/// values, so these are set here and never per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum password length in characters (default: 7)
    pub min_password_len: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Replace an existing file at the output path (default: false)
    pub overwrite: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_password_len: MIN_PASSWORD_LEN_FLOOR,
        }
    }
}

impl SealConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> CoreResult<Self> {
        let config: SealConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the key derivation or the password policy cannot accept.
    pub fn validate(&self) -> CoreResult<()> {
        let kdf = &self.kdf;
        if kdf.argon2_parallelism == 0 {
            return Err(CoreError::Config(
                "kdf.argon2_parallelism must be at least 1".into(),
            ));
        }
        if kdf.argon2_time_cost == 0 {
            return Err(CoreError::Config(
                "kdf.argon2_time_cost must be at least 1".into(),
            ));
        }
        // Argon2 needs 8 KiB of memory per lane
        let min_mem = kdf.argon2_parallelism.saturating_mul(8);
        if kdf.argon2_mem_cost_kib < min_mem {
            return Err(CoreError::Config(format!(
                "kdf.argon2_mem_cost_kib must be at least {min_mem} for parallelism {}",
                kdf.argon2_parallelism
            )));
        }
        if self.policy.min_password_len < MIN_PASSWORD_LEN_FLOOR {
            return Err(CoreError::Config(format!(
                "policy.min_password_len must be at least {MIN_PASSWORD_LEN_FLOOR}"
            )));
        }
        match self.log.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(CoreError::Config(format!(
                "log.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}
