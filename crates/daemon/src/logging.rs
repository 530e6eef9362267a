//! Logging setup: console output, optional rolling file, optional OTLP export

use crate::config::{LogFormat, LoggingConfig, TelemetryConfig};
use crate::telemetry;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "ingestflow=info,ingest_flow=info";
const LOG_FILE_PREFIX: &str = "ingest-flow.log";

/// Keeps the background log writer alive; dropping it flushes pending lines
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

pub fn init(logging: &LoggingConfig, telemetry: &TelemetryConfig) -> Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let mut layers = Vec::new();

    layers.push(match logging.format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });

    let file_guard = match &logging.directory {
        Some(directory) => {
            let directory = crate::config::expand_path(directory);
            std::fs::create_dir_all(&directory).with_context(|| {
                format!("Failed to create log directory {}", directory.display())
            })?;
            let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    if let Some(layer) = telemetry::layer(telemetry)? {
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: file_guard })
}
