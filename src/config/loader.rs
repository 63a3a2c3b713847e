// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** apply
/// environment overrides or validate. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file, apply environment overrides and validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw = load_from_path(&path)?;
    apply_env_overrides(&mut raw, |key| std::env::var(key).ok());
    ConfigFile::try_from(raw)
}

/// Like [`load_and_validate`], but an absent file means "all defaults".
///
/// With `path = None`, [`default_config_path`] is used if it exists.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = default_config_path();
            default.is_file().then_some(default)
        }
    };

    match path {
        Some(p) => {
            debug!(path = ?p, "loading config file");
            load_and_validate(p)
        }
        None => {
            debug!("no config file; using defaults");
            let mut raw = RawConfigFile::default();
            apply_env_overrides(&mut raw, |key| std::env::var(key).ok());
            ConfigFile::try_from(raw)
        }
    }
}

/// Apply the `TIME_*_MS` and `COMPUTING_POWER` overrides looked up
/// through `lookup`.
///
/// Values that do not parse are ignored with a warning and the configured
/// value is kept.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let timing = &mut raw.timing;
    override_u64(&lookup, "TIME_ADDITION_MS", &mut timing.addition_ms);
    override_u64(&lookup, "TIME_SUBTRACTION_MS", &mut timing.subtraction_ms);
    override_u64(&lookup, "TIME_MULTIPLICATIONS_MS", &mut timing.multiplication_ms);
    override_u64(&lookup, "TIME_DIVISIONS_MS", &mut timing.division_ms);
    override_u64(&lookup, "TIME_FULL_MS", &mut timing.whole_ms);

    if let Some(value) = lookup("COMPUTING_POWER") {
        match value.trim().parse::<usize>() {
            Ok(n) => raw.agent.computing_power = n,
            Err(_) => warn!(
                var = "COMPUTING_POWER",
                %value,
                "ignoring unparseable environment override"
            ),
        }
    }
}

fn override_u64<F>(lookup: &F, key: &str, slot: &mut u64)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        match value.trim().parse::<u64>() {
            Ok(v) => *slot = v,
            Err(_) => warn!(var = key, %value, "ignoring unparseable environment override"),
        }
    }
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Calcdag.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Calcdag.toml")
}
