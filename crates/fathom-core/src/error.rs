use thiserror::Error;

/// Top-level error type for setup failures: the only errors in this
/// workspace that are allowed to bubble out of a component rather than
/// being absorbed and logged in place.
#[derive(Debug, Error)]
pub enum FathomError {
    #[error("socket setup failed: {0}")]
    SocketSetup(#[from] std::io::Error),

    #[error("config file read failed: {0}")]
    ConfigRead(String),

    #[error("config parse failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid address {addr:?}: {reason}")]
    InvalidAddr { addr: String, reason: String },
}
