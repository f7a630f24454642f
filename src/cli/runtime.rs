use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use action_flow::EngineConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Keeps the file writer flushing until the process exits
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub struct LogOptions<'a> {
    pub level: &'a str,
    pub debug: bool,
    pub json: bool,
    pub dir: Option<&'a Path>,
}

/// Logs go to stderr so `--output json` on stdout stays machine-readable.
pub fn init_logging(options: &LogOptions<'_>) -> Result<()> {
    let level = if options.debug {
        tracing::Level::DEBUG
    } else {
        options.level.parse().context("Invalid log level")?
    };

    let stderr_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "sheetform.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub path: Option<PathBuf>,
}

/// Defaults, then the YAML file, then `SHEETFORM_<SECTION>__<KEY>` environment overrides.
///
/// An explicit path must exist. Otherwise `./config/sheetform.yaml` is tried, then
/// `<config dir>/sheetform/config.yaml`; neither is required.
pub fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let mut builder = Config::builder();
    match &path {
        Some(path) => {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Yaml)
                    .required(true),
            );
        }
        None => warn!("No configuration file found, using defaults"),
    }
    let settings = builder
        .add_source(
            Environment::with_prefix("SHEETFORM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: EngineConfig = settings
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &path {
        info!("Loaded configuration from: {}", path.display());
    }
    Ok(LoadedConfig { config, path })
}

// Priority: ./config/sheetform.yaml > ~/.config/sheetform/config.yaml
fn default_config_path() -> Option<PathBuf> {
    let local_config = PathBuf::from("config/sheetform.yaml");
    if local_config.exists() {
        return Some(local_config);
    }
    let mut path = dirs::config_dir()?;
    path.push("sheetform");
    path.push("config.yaml");
    path.exists().then_some(path)
}
