use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
