use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Frame index {got} does not follow {last}")]
    NonMonotonicFrame { last: u64, got: u64 },
}
