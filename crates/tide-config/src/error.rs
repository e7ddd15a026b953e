use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer failed to parse or extract.
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A section is missing the fields its consumer requires.
    #[error("configuration section '{section}' is incomplete")]
    NotConfigured { section: String },

    /// A field parsed but holds a value the consumer cannot use.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
