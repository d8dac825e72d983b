use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue { var: &'static str, value: String, reason: String },

    #[error("{var} must be set")]
    Missing { var: &'static str },
}
