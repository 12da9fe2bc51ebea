//! CLI entry point for the digitizer register tester.
//!
//! Loads configuration, initializes tracing, and runs the three-phase
//! register readback against the selected transport backend. The hardware
//! transport driver is an external collaborator; this binary ships with the
//! mock backend only, so runs must request `--mock` until a hardware backend
//! is linked in.

use anyhow::{bail, Context, Result};
use clap::Parser;
use digitizer_daq::{DigitizerConfig, MockTransport, Vx1730Digitizer};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Config path used when `--config` is not given; allowed to be absent.
const DEFAULT_CONFIG_PATH: &str = "config/digitizer.toml";

#[derive(Parser)]
#[command(name = "digitizer_daq")]
#[command(about = "Vx1730 digitizer register configuration and readback verification")]
struct Cli {
    /// Path to the TOML configuration file [default: config/digitizer.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against the built-in mock transport instead of hardware
    #[arg(long)]
    mock: bool,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

/// Resolve the configuration for this run.
///
/// An explicitly supplied path must exist; a typo would otherwise masquerade
/// as a clean default run. Only the implicit default path may be absent, in
/// which case built-in defaults apply.
fn resolve_config(explicit: Option<&Path>) -> Result<DigitizerConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            DigitizerConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                DigitizerConfig::load_from(path)
                    .with_context(|| format!("failed to load config from {}", path.display()))
            } else {
                Ok(DigitizerConfig::default())
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref())?;
    config.validate()?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(level)?;

    tracing::info!("starting up");

    if !cli.mock {
        bail!(
            "no hardware transport backend is built into this binary; \
             run with --mock to exercise the register engine"
        );
    }

    let mut digitizer = Vx1730Digitizer::new(&config, MockTransport::new())?;
    digitizer
        .configure_registers()
        .context("register readback failed")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_explicit_config_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-config.toml");
        let err = resolve_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "module_number = 7\nchannel_count = 8\n").unwrap();
        let config = resolve_config(Some(file.path())).unwrap();
        assert_eq!(config.module_number, 7);
        assert_eq!(config.channel_count, 8);
    }
}
