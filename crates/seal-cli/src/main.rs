//! seal: password + recipient-email file encryption
//!
//! Commands:
//!   encrypt <file> --email <addr>   - write <file>.sealed
//!   decrypt <file> --email <addr>   - recover the original file
//!   inspect <file>                  - show non-secret container facts
//!   config show                     - display current configuration

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

use seal_core::SealConfig;
use seal_crypto::{
    password_strength, Envelope, EventSink, KdfParams, MemoryFile, Policy, SealError,
    SecurityEvent, Sealer, Severity, Stage, TracingEvents,
};

use output::DirSink;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "seal",
    version,
    about = "Encrypt files under a password and a recipient email",
    long_about = "seal: Argon2id + AES-256-GCM envelope encryption. \
                  Opening a sealed file needs both the password and the email used to seal it."
)]
struct Cli {
    /// Path to seal.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SEAL_CONFIG",
        default_value = "~/.config/sealbox/seal.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "SEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal a file
    ///
    /// The password is read from SEAL_PASSWORD or prompted for (twice).
    Encrypt {
        /// File to seal
        file: PathBuf,
        /// Recipient email; required again to open the file
        #[arg(long, short = 'e', env = "SEAL_EMAIL")]
        email: String,
        /// Output directory (default: next to the input)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },

    /// Open a sealed file
    ///
    /// The password is read from SEAL_PASSWORD or prompted for.
    Decrypt {
        /// Sealed container
        file: PathBuf,
        /// Recipient email used when sealing
        #[arg(long, short = 'e', env = "SEAL_EMAIL")]
        email: String,
        /// Output directory (default: next to the container)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },

    /// Show what a container holds without decrypting it
    Inspect {
        /// Sealed container
        file: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let (config, from_file) = load_config(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    if !from_file {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            config_path.display()
        );
    }

    match cli.command {
        Commands::Encrypt { file, email, out_dir } => {
            cmd_encrypt(&config, &file, email, out_dir.as_deref()).await
        }
        Commands::Decrypt { file, email, out_dir } => {
            cmd_decrypt(&config, &file, email, out_dir.as_deref()).await
        }
        Commands::Inspect { file, json } => cmd_inspect(&file, json).await,
        Commands::Config { action: ConfigAction::Show } => {
            cmd_config_show(&config, &config_path, from_file)
        }
    }
}

// ── Config + logging ──────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<(SealConfig, bool)> {
    if path.exists() {
        let config = SealConfig::load(path)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((SealConfig::default(), false))
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn policy_from_config(config: &SealConfig) -> Policy {
    Policy {
        min_password_len: config.policy.min_password_len,
        kdf: KdfParams {
            mem_cost_kib: config.kdf.argon2_mem_cost_kib,
            time_cost: config.kdf.argon2_time_cost,
            parallelism: config.kdf.argon2_parallelism,
        },
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

// ── Progress ──────────────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Logs security events through `tracing` and mirrors stage changes on the spinner.
struct SpinnerEvents {
    pb: ProgressBar,
}

impl EventSink for SpinnerEvents {
    fn log(&self, event: SecurityEvent, severity: Severity) {
        TracingEvents.log(event, severity);
        if let SecurityEvent::StageEntered(stage) = event {
            let msg = match stage {
                Stage::Idle => "",
                Stage::Validating => "checking inputs",
                Stage::ParsingEnvelope => "reading container",
                Stage::DerivingKeys => "deriving keys (Argon2id)",
                Stage::WrappingKey => "wrapping data key",
                Stage::UnwrappingKey => "verifying credentials",
                Stage::ProcessingContent => "processing content",
                Stage::Done => "done",
                Stage::Failed(_) => "failed",
            };
            self.pb.set_message(msg);
            if stage.is_terminal() {
                self.pb.finish_and_clear();
            }
        }
    }
}

fn make_sealer(config: &SealConfig, pb: &ProgressBar) -> Sealer {
    Sealer::new(policy_from_config(config)).with_events(Arc::new(SpinnerEvents { pb: pb.clone() }))
}

// ── Secrets ───────────────────────────────────────────────────────────────────

/// Password from SEAL_PASSWORD, otherwise an interactive prompt.
fn read_password(confirm: bool) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("SEAL_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    let first =
        Zeroizing::new(rpassword::prompt_password("Password: ").context("reading password")?);
    if !confirm {
        return Ok(take_secret(first));
    }
    let second =
        Zeroizing::new(rpassword::prompt_password("Confirm password: ").context("reading password")?);
    confirm_password(first, second)
}

/// Both entries are wiped on every path; only a match becomes a secret.
fn confirm_password(first: Zeroizing<String>, second: Zeroizing<String>) -> Result<SecretString> {
    if *first != *second {
        anyhow::bail!("passwords do not match");
    }
    Ok(take_secret(first))
}

fn take_secret(mut entry: Zeroizing<String>) -> SecretString {
    SecretString::from(std::mem::take(&mut *entry))
}

/// Turn a pipeline error into the message shown on the terminal.
fn seal_failure(e: SealError) -> anyhow::Error {
    tracing::debug!(kind = %e.kind(), error = %e, "operation failed");
    anyhow::anyhow!(e.user_message())
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no UTF-8 file name", path.display()))
}

fn output_dir(out_dir: Option<&Path>, input: &Path) -> PathBuf {
    match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    }
}

// ── `seal encrypt` ────────────────────────────────────────────────────────────

async fn cmd_encrypt(
    config: &SealConfig,
    file: &Path,
    email: String,
    out_dir: Option<&Path>,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let source = MemoryFile::new(file_name_of(file)?, bytes);

    let password = read_password(true)?;
    let strength = password_strength(password.expose_secret(), config.policy.min_password_len);
    let email = SecretString::from(email);
    let mut sink = DirSink::new(output_dir(out_dir, file), config.output.overwrite);

    let pb = make_spinner("encrypt");
    let sealer = make_sealer(config, &pb);
    let result = tokio::task::spawn_blocking(move || {
        sealer
            .encrypt_to(&source, &password, &email, &mut sink)
            .map(|_| sink)
    })
    .await
    .context("encrypt task failed")?;
    pb.finish_and_clear();

    let sink = result.map_err(seal_failure)?;
    println!("Encrypted:");
    for (path, size) in sink.written() {
        println!("  output:   {}", path.display());
        println!("  size:     {}", fmt_bytes(*size));
    }
    println!("  password: {strength}");
    println!();
    println!("Keep the password and the recipient email safe: both are required to decrypt.");
    Ok(())
}

// ── `seal decrypt` ────────────────────────────────────────────────────────────

async fn cmd_decrypt(
    config: &SealConfig,
    file: &Path,
    email: String,
    out_dir: Option<&Path>,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let container = MemoryFile::new(file_name_of(file)?, bytes);

    let password = read_password(false)?;
    let email = SecretString::from(email);
    let mut sink = DirSink::new(output_dir(out_dir, file), config.output.overwrite);

    let pb = make_spinner("decrypt");
    let sealer = make_sealer(config, &pb);
    let result = tokio::task::spawn_blocking(move || {
        sealer
            .decrypt_to(&container, &password, &email, &mut sink)
            .map(|_| sink)
    })
    .await
    .context("decrypt task failed")?;
    pb.finish_and_clear();

    let sink = result.map_err(seal_failure)?;
    println!("Decrypted:");
    for (path, size) in sink.written() {
        println!("  output: {}", path.display());
        println!("  size:   {}", fmt_bytes(*size));
    }
    Ok(())
}

// ── `seal inspect` ────────────────────────────────────────────────────────────

async fn cmd_inspect(file: &Path, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let summary = Envelope::parse(&bytes).map_err(seal_failure)?.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Container: {}", file.display());
    println!("  filename:    {}", summary.filename);
    println!("  content:     {}", fmt_bytes(summary.plaintext_len as u64));
    println!("  header:      {} bytes", summary.header_len);
    println!("  wrapped key: {} bytes", summary.wrapped_key_len);
    Ok(())
}

// ── `seal config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &SealConfig, config_path: &Path, from_file: bool) -> Result<()> {
    if from_file {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let toml_str = toml::to_string_pretty(config).context("serializing config")?;
    print!("{toml_str}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
