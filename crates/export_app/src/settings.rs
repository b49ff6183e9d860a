//! Merges the optional RON settings file with command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine_logging::engine_debug;
use export_engine::{Credentials, ExportConfig, ExportFormat};
use ron::extensions::Extensions;
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_MAX_WAIT_SECS: u64 = 30 * 60;

/// Non-secret settings read from `--config`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub api_base: Option<String>,
    pub space_id: Option<String>,
    pub user_id: Option<String>,
    pub format: Option<ExportFormat>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub working_dir: Option<PathBuf>,
    pub archive_name: Option<String>,
}

pub fn parse_file_settings(text: &str) -> Result<FileSettings> {
    let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
    let settings = options.from_str(text).context("invalid settings file")?;
    Ok(settings)
}

pub fn load_file_settings(path: &Path) -> Result<FileSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = parse_file_settings(&text)
        .with_context(|| format!("failed to load settings file {}", path.display()))?;
    engine_debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Builds the engine configuration. Flags win over the file, the file wins
/// over built-in defaults. Credentials are checked later by the pipeline.
pub fn build_config(cli: &Cli, file: FileSettings) -> Result<ExportConfig> {
    let credentials = Credentials {
        token: cli.token.clone().unwrap_or_default(),
        space_id: cli.space_id.clone().or(file.space_id).unwrap_or_default(),
        user_id: cli.user_id.clone().or(file.user_id).unwrap_or_default(),
    };
    let mut config = ExportConfig::new(credentials);

    if let Some(base) = file.api_base {
        config.api_base = base
            .parse()
            .with_context(|| format!("invalid api_base {base:?}"))?;
    }

    if let Some(format) = cli.format.or(file.format) {
        config.options.format = format;
    }
    if let Some(locale) = cli.locale.clone().or(file.locale) {
        config.options.locale = locale;
    }
    if let Some(time_zone) = cli.time_zone.clone().or(file.time_zone) {
        config.options.time_zone = time_zone;
    }

    if let Some(secs) = cli.poll_interval.or(file.poll_interval_secs) {
        if secs == 0 {
            bail!("poll interval must be at least one second");
        }
        config.poll.interval = Duration::from_secs(secs);
    }
    config.poll.max_wait = if cli.no_max_wait {
        None
    } else {
        let secs = cli
            .max_wait
            .or(file.max_wait_secs)
            .unwrap_or(DEFAULT_MAX_WAIT_SECS);
        Some(Duration::from_secs(secs))
    };

    if let Some(secs) = file.connect_timeout_secs {
        config.fetch.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = cli.working_dir.clone().or(file.working_dir) {
        config.working_dir = dir;
    }
    if let Some(name) = file.archive_name {
        config.archive_name = name;
    }

    Ok(config)
}
