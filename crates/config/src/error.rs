//! Configuration errors

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Structurally valid but semantically wrong
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
