//! CLI settings – reads/writes `~/.duet/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted CLI settings stored in `~/.duet/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Simulated frames per second used by `/run` and `duet run`.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Preset name or scenario file loaded at startup.
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Fixed random seed; unset means a fresh seed per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Directory `/save` writes snapshots into.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

fn default_tick_hz() -> u32 {
    60
}
fn default_scenario() -> String {
    "bidirectional".to_string()
}
fn default_snapshot_dir() -> String {
    ".".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            scenario: default_scenario(),
            seed: None,
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl CliConfig {
    /// Fixed time step derived from `tick_hz` (a zero rate is treated as 1 Hz).
    pub fn dt(&self) -> f64 {
        1.0 / f64::from(self.tick_hz.max(1))
    }
}

/// Return the path to `~/.duet/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".duet").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<CliConfig>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<CliConfig>, String> {
    let mut cfg = read_from(path)?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// The file contents alone, without environment overrides.
pub(crate) fn read_from(path: &Path) -> Result<Option<CliConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Failed to parse config: {}", e))
}

/// Apply `DUET_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `DUET_TICK_HZ` | `tick_hz` |
/// | `DUET_SCENARIO` | `scenario` |
/// | `DUET_SEED` | `seed` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut CliConfig) {
    if let Ok(v) = std::env::var("DUET_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("DUET_SCENARIO")
        && !v.trim().is_empty()
    {
        cfg.scenario = v;
    }
    if let Ok(v) = std::env::var("DUET_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.seed = Some(seed);
    }
}

/// Save the config to disk, creating `~/.duet/` if necessary.
pub fn save(cfg: &CliConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &CliConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    write_private(path, raw.as_bytes())
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

/// Write `bytes` to `path`, owner read/write only on Unix.
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(bytes))
    }
    #[cfg(not(unix))]
    {
        fs::write(path, bytes)
    }
}
