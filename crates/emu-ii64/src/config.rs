//! Bridge configuration: cartridge behaviour, endpoints and launch commands.
//!
//! Everything has a default, so a config file only needs the fields it
//! changes:
//!
//! ```json
//! {
//!     "cart": { "single_step": false, "reset_suppression_window": 0.5 },
//!     "monitor_addr": "localhost:6510"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How the cartridge behaves between commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartConfig {
    /// After a reset is accepted, further resets are ignored this long.
    #[serde(deserialize_with = "seconds")]
    pub reset_suppression_window: Duration,
    /// "Get status" single-steps one instruction before reading registers.
    pub single_step: bool,
    /// Let the C64 run again after each command.
    pub auto_resume: bool,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            reset_suppression_window: Duration::from_secs(1),
            single_step: true,
            auto_resume: true,
        }
    }
}

/// Emulator command lines for `--launch`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// VICE, with its binary monitor enabled.
    pub target: Vec<String>,
    /// MAME, with the Lua script that bridges the cartridge lines.
    pub host: Vec<String>,
    /// Working directory for both; the current one if unset.
    pub working_dir: Option<PathBuf>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        let argv =
            |args: &[&str]| -> Vec<String> { args.iter().map(ToString::to_string).collect() };
        Self {
            target: argv(&["./x64", "-directory", "x64data", "-binarymonitor"]),
            host: argv(&[
                "./mame",
                "-resolution",
                "1120x768",
                "-autoboot_script",
                "ii64.lua",
                "-window",
                "-skip_gameinfo",
                "-rompath",
                "roms",
                "-samplepath",
                "samples",
                "apple2e",
                "-flop1",
                "Disk23.dsk",
                "-flop2",
                "demodisk.dsk",
            ]),
            working_dir: None,
        }
    }
}

/// Full configuration of the bridge process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub cart: CartConfig,
    /// VICE binary monitor address.
    pub monitor_addr: String,
    /// FIFO MAME writes line events to.
    pub pipe_in: PathBuf,
    /// FIFO MAME reads status bytes from.
    pub pipe_out: PathBuf,
    /// Start both emulators before connecting.
    pub launch: Option<LaunchConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cart: CartConfig::default(),
            monitor_addr: "localhost:6502".to_string(),
            pipe_in: PathBuf::from("mameout"),
            pipe_out: PathBuf::from("mamein"),
            launch: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Durations are written as (fractional) seconds.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
