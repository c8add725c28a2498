//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use subgrab_core::batch::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use subgrab_core::provider::ProviderSpec;
use subgrab_core::video::SubtitleNaming;
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SUBGRAB_CONFIG";

const MAX_GATE_CAPACITY: usize = 16;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;
const MAX_DRY_RUN_DELAY_MS: u64 = 60_000;

/// TOML-backed file configuration for subgrab defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default root directory to scan.
    pub root_dir: Option<PathBuf>,
    /// Default worker pool size (same range as CLI).
    pub concurrency: Option<usize>,
    /// Run videos concurrently (false = sequential).
    pub multithread: Option<bool>,
    /// Simultaneous outbound catalog requests.
    pub gate_capacity: Option<usize>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Subtitle file naming convention.
    pub subtitle_naming: Option<SubtitleNaming>,
    /// Synthetic per-video delay in dry-run mode.
    pub dry_run_delay_ms: Option<u64>,
    /// Catalog providers in the order they are tried.
    pub providers: Option<Vec<ProviderSpec>>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }

        if let Some(capacity) = self.gate_capacity
            && !(1..=MAX_GATE_CAPACITY).contains(&capacity)
        {
            bail!(
                "Invalid config value for `gate_capacity`: {capacity}. Expected range: 1..={MAX_GATE_CAPACITY}"
            );
        }

        if let Some(timeout) = self.request_timeout_secs
            && !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout)
        {
            bail!(
                "Invalid config value for `request_timeout_secs`: {timeout}. Expected range: 1..={MAX_REQUEST_TIMEOUT_SECS}"
            );
        }

        if let Some(delay) = self.dry_run_delay_ms
            && delay > MAX_DRY_RUN_DELAY_MS
        {
            bail!(
                "Invalid config value for `dry_run_delay_ms`: {delay}. Expected range: 0..={MAX_DRY_RUN_DELAY_MS}"
            );
        }

        for (index, provider) in self.providers.iter().flatten().enumerate() {
            validate_provider(index, provider)?;
        }

        Ok(())
    }
}

fn validate_provider(index: usize, provider: &ProviderSpec) -> Result<()> {
    if provider.name.trim().is_empty() {
        bail!("Invalid provider #{}: `name` must not be empty", index + 1);
    }
    let url = Url::parse(&provider.base_url).with_context(|| {
        format!(
            "Invalid provider '{}': `base_url` '{}' is not a URL",
            provider.name, provider.base_url
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "Invalid provider '{}': `base_url` must use http or https",
            provider.name
        );
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config, empty when no file exists.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$SUBGRAB_CONFIG`
/// 2. `$XDG_CONFIG_HOME/subgrab/config.toml`
/// 3. `$HOME/.config/subgrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env_var_non_empty_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("subgrab")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("subgrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
///
/// An explicit `$SUBGRAB_CONFIG` path must exist.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        if env_var_non_empty_os(CONFIG_PATH_ENV).is_some() {
            bail!(
                "Config file '{}' named by ${CONFIG_PATH_ENV} does not exist",
                path_ref.display()
            );
        }
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config,
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}
