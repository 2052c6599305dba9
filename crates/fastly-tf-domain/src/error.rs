use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("gcslogging '{endpoint}': {field} is not set and {env_var} is empty")]
    MissingCredential {
        endpoint: String,
        field: &'static str,
        env_var: &'static str,
    },

    #[error("gcslogging '{endpoint}': gzip_level must be between 0 and 9, got {level}")]
    InvalidGzipLevel { endpoint: String, level: u8 },

    #[error("duplicate gcslogging name '{0}'")]
    DuplicateEndpoint(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
