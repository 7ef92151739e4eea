use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Dataset directory used when `YORKGEO_DATA_DIR` is unset.
///
/// Resolved relative to this crate so the service finds `<workspace>/data`
/// regardless of the working directory it is launched from.
pub const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data");

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let env = parse_environment(&or_default("YORKGEO_ENV", "development"))?;

    let bind_addr = or_default("YORKGEO_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("YORKGEO_BIND_ADDR", e.to_string()))?;

    let log_level = or_default("YORKGEO_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("YORKGEO_DATA_DIR", DEFAULT_DATA_DIR));

    let error_log_dir = lookup("YORKGEO_ERROR_LOG_DIR")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from);

    let metric_epsg = or_default("YORKGEO_METRIC_EPSG", "27700")
        .parse::<u32>()
        .map_err(|e| invalid("YORKGEO_METRIC_EPSG", e.to_string()))?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        data_dir,
        error_log_dir,
        metric_epsg,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "YORKGEO_ENV".to_string(),
            reason: format!("expected development, test or production, got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
