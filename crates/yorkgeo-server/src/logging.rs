use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};
use yorkgeo_core::AppConfig;

/// File name (before the date suffix) of the ERROR-only log.
pub const ERROR_LOG_FILE: &str = "dev_errors.log";

/// Install the global subscriber.
///
/// Console output honours `RUST_LOG`, falling back to the configured level.
/// When an error log directory is configured, ERROR events are also written
/// there through a daily rolling, non-blocking appender; the returned guard
/// must be held until shutdown or buffered lines are lost.
///
/// # Errors
///
/// Fails if the filter directive is invalid, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn init_logging(config: &AppConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let console = fmt::layer().with_filter(env_filter);

    let (error_file, guard) = match config.error_log_dir.as_deref() {
        Some(dir) => {
            let (layer, guard) = error_file_layer(dir)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(error_file)
        .with(console)
        .try_init()?;

    Ok(guard)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn error_file_layer(dir: &Path) -> anyhow::Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create error log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(ERROR_LOG_FILE)
        .build(dir)
        .context("failed to open error log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(LevelFilter::ERROR)
        .boxed();

    Ok((layer, guard))
}
