//! Merges CLI flags over file config into the settings for one run.
//!
//! Priority: CLI flag > config file > built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use subgrab_core::batch::{BatchOptions, DEFAULT_CONCURRENCY, DEFAULT_DRY_RUN_DELAY};
use subgrab_core::provider::{DEFAULT_REQUEST_TIMEOUT_SECS, ProviderSettings, ProviderSpec};
use subgrab_core::resolution::DEFAULT_GATE_CAPACITY;
use subgrab_core::video::SubtitleNaming;

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Everything `main` needs to run one batch.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub root_dir: PathBuf,
    pub options: BatchOptions,
    pub gate_capacity: usize,
    pub naming: SubtitleNaming,
    pub dry_run_delay: Duration,
    pub provider_settings: ProviderSettings,
    /// `None` means the built-in SubtitleCat chain.
    pub providers: Option<Vec<ProviderSpec>>,
}

pub(crate) fn resolve_run_settings(args: &Args, config: &FileConfig) -> Result<RunSettings> {
    let Some(root_dir) = args.root_dir.clone().or_else(|| config.root_dir.clone()) else {
        bail!(
            "No video directory given\n  Suggestion: pass a directory (subgrab /videos) or set `root_dir` in the config file"
        );
    };

    let max_concurrency = args
        .concurrency
        .map(usize::from)
        .or(config.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    let concurrent =
        !args.sequential && (args.concurrent || config.multithread.unwrap_or(true));

    let options = BatchOptions {
        concurrent,
        max_concurrency,
        dry_run: args.dry_run,
        include_existing: args.include_existing,
    };

    let gate_capacity = args
        .gate_capacity
        .map(usize::from)
        .or(config.gate_capacity)
        .unwrap_or(DEFAULT_GATE_CAPACITY);

    let timeout_secs = config
        .request_timeout_secs
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    let mut provider_settings = ProviderSettings::default();
    provider_settings.http = provider_settings
        .http
        .with_request_timeout(Duration::from_secs(timeout_secs));

    Ok(RunSettings {
        root_dir,
        options,
        gate_capacity,
        naming: args
            .naming
            .or(config.subtitle_naming)
            .unwrap_or_default(),
        dry_run_delay: config
            .dry_run_delay_ms
            .map_or(DEFAULT_DRY_RUN_DELAY, Duration::from_millis),
        provider_settings,
        providers: config.providers.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["subgrab"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = resolve_run_settings(&args(&["/videos"]), &FileConfig::default()).unwrap();
        assert_eq!(settings.root_dir, PathBuf::from("/videos"));
        assert!(settings.options.concurrent);
        assert_eq!(settings.options.max_concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(settings.gate_capacity, DEFAULT_GATE_CAPACITY);
        assert_eq!(settings.naming, SubtitleNaming::Plain);
        assert_eq!(settings.dry_run_delay, DEFAULT_DRY_RUN_DELAY);
        assert_eq!(
            settings.provider_settings.http.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert!(settings.providers.is_none());
    }

    #[test]
    fn test_missing_root_dir_is_an_error() {
        let err = resolve_run_settings(&args(&[]), &FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No video directory"));
    }

    #[test]
    fn test_config_fills_unset_flags() {
        let config = FileConfig {
            root_dir: Some(PathBuf::from("/from-config")),
            concurrency: Some(4),
            multithread: Some(false),
            gate_capacity: Some(2),
            request_timeout_secs: Some(30),
            subtitle_naming: Some(SubtitleNaming::LanguageQualified),
            dry_run_delay_ms: Some(5),
            providers: Some(vec![ProviderSpec::subtitlecat()]),
        };
        let settings = resolve_run_settings(&args(&[]), &config).unwrap();
        assert_eq!(settings.root_dir, PathBuf::from("/from-config"));
        assert!(!settings.options.concurrent);
        assert_eq!(settings.options.max_concurrency, 4);
        assert_eq!(settings.gate_capacity, 2);
        assert_eq!(settings.naming, SubtitleNaming::LanguageQualified);
        assert_eq!(settings.dry_run_delay, Duration::from_millis(5));
        assert_eq!(
            settings.provider_settings.http.request_timeout,
            Duration::from_secs(30)
        );
        assert_eq!(settings.providers.unwrap().len(), 1);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let config = FileConfig {
            root_dir: Some(PathBuf::from("/from-config")),
            concurrency: Some(4),
            gate_capacity: Some(2),
            subtitle_naming: Some(SubtitleNaming::LanguageQualified),
            ..FileConfig::default()
        };
        let settings = resolve_run_settings(
            &args(&[
                "/from-cli",
                "-c",
                "12",
                "--gate-capacity",
                "5",
                "--naming",
                "plain",
                "--sequential",
                "--dry-run",
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(settings.root_dir, PathBuf::from("/from-cli"));
        assert_eq!(settings.options.max_concurrency, 12);
        assert!(!settings.options.concurrent);
        assert!(settings.options.dry_run);
        assert_eq!(settings.gate_capacity, 5);
        assert_eq!(settings.naming, SubtitleNaming::Plain);
    }

    #[test]
    fn test_concurrent_flag_overrides_sequential_config() {
        let config = FileConfig {
            multithread: Some(false),
            ..FileConfig::default()
        };
        let settings = resolve_run_settings(&args(&["/videos"]), &config).unwrap();
        assert!(!settings.options.concurrent);

        let settings =
            resolve_run_settings(&args(&["/videos", "--concurrent"]), &config).unwrap();
        assert!(settings.options.concurrent);
    }

    #[test]
    fn test_sequential_flag_overrides_concurrent_config() {
        let config = FileConfig {
            multithread: Some(true),
            ..FileConfig::default()
        };
        let settings =
            resolve_run_settings(&args(&["/videos", "--sequential"]), &config).unwrap();
        assert!(!settings.options.concurrent);
    }
}
