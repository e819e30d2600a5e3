use thiserror::Error;

#[derive(Error, Debug)]
pub enum PbacError {
    #[error("Policy validation failed at {path}: {message}")]
    PolicyValidation { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PbacError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        PbacError::PolicyValidation {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PbacError>;
