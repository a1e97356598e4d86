//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::export::{ImageFormat, check_scale};
use crate::domain::naming::NamingStrategy;

mod cli;

pub use cli::*;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "figport";
const DEFAULT_API_BASE_URL: &str = "https://api.figma.com";
const DEFAULT_API_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EXPORT_SCALE: f64 = 2.0;
const DEFAULT_EXPORT_CONCURRENCY: usize = 4;
const MAX_EXPORT_CONCURRENCY: usize = 64;
const DEFAULT_OUTPUT_DIR: &str = ".";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub scale: f64,
    pub format: ImageFormat,
    pub concurrency: NonZeroUsize,
    pub deadline: Option<Duration>,
    pub output_dir: PathBuf,
    pub naming: NamingStrategy,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FIGPORT").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    if let Command::Export(args) = &cli.command {
        raw.apply_export_overrides(&args.overrides);
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    export: RawExportSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(path) = overrides.token_file.as_ref() {
            self.api.token_file = Some(path.clone());
        }
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_export_overrides(&mut self, overrides: &ExportOverrides) {
        if let Some(scale) = overrides.scale {
            self.export.scale = Some(scale);
        }
        if let Some(format) = overrides.format.as_ref() {
            self.export.format = Some(format.clone());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.export.concurrency = Some(concurrency);
        }
        if let Some(seconds) = overrides.deadline_seconds {
            self.export.deadline_seconds = Some(seconds);
        }
        if let Some(dir) = overrides.output_dir.as_ref() {
            self.export.output_dir = Some(dir.clone());
        }
        if let Some(naming) = overrides.naming.as_ref() {
            self.export.naming = Some(naming.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            export,
            logging,
        } = raw;

        let api = build_api_settings(api)?;
        let export = build_export_settings(export)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            api,
            export,
            logging,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            "scheme must be http or https",
        ));
    }

    let token = match api.token_file {
        Some(path) => Some(read_token_file(&path)?),
        None => api.token.and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }),
    };

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        token,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn read_token_file(path: &Path) -> Result<String, LoadError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        LoadError::invalid(
            "api.token_file",
            format!("failed to read {}: {err}", path.display()),
        )
    })?;
    let token = contents.trim();
    if token.is_empty() {
        return Err(LoadError::invalid(
            "api.token_file",
            format!("{} is empty", path.display()),
        ));
    }
    Ok(token.to_string())
}

fn build_export_settings(export: RawExportSettings) -> Result<ExportSettings, LoadError> {
    let scale = check_scale(export.scale.unwrap_or(DEFAULT_EXPORT_SCALE))
        .map_err(|err| LoadError::invalid("export.scale", err.to_string()))?;

    let format = match export.format {
        Some(value) => ImageFormat::from_str(&value)
            .map_err(|err| LoadError::invalid("export.format", err.to_string()))?,
        None => ImageFormat::Png,
    };

    let concurrency = export.concurrency.unwrap_or(DEFAULT_EXPORT_CONCURRENCY);
    let concurrency = NonZeroUsize::new(concurrency.min(MAX_EXPORT_CONCURRENCY))
        .ok_or_else(|| LoadError::invalid("export.concurrency", "must be greater than zero"))?;

    let deadline = match export.deadline_seconds {
        Some(0) => {
            return Err(LoadError::invalid(
                "export.deadline_seconds",
                "must be greater than zero",
            ));
        }
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => None,
    };

    let output_dir = export
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let naming = match export.naming {
        Some(value) => NamingStrategy::from_str(&value)
            .map_err(|err| LoadError::invalid("export.naming", err.to_string()))?,
        None => NamingStrategy::default(),
    };

    Ok(ExportSettings {
        scale,
        format,
        concurrency,
        deadline,
        output_dir,
        naming,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    token: Option<String>,
    token_file: Option<PathBuf>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExportSettings {
    scale: Option<f64>,
    format: Option<String>,
    concurrency: Option<usize>,
    deadline_seconds: Option<u64>,
    output_dir: Option<PathBuf>,
    naming: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
