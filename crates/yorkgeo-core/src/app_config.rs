use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Directory holding the five York GeoJSON datasets.
    pub data_dir: PathBuf,
    /// When set, ERROR events are also written to `dev_errors.log` here.
    pub error_log_dir: Option<PathBuf>,
    /// EPSG code of the projected CRS used for metre-based distances.
    pub metric_epsg: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("data_dir", &self.data_dir.display())
            .field(
                "error_log_dir",
                &self.error_log_dir.as_ref().map(|p| p.display().to_string()),
            )
            .field("metric_epsg", &self.metric_epsg)
            .finish()
    }
}
