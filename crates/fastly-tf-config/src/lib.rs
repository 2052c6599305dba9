mod raw;
mod loader;
pub mod error;

pub use error::ConfigError;
pub use loader::{
    load_gcs_env, load_provider_config, ProviderConfig, DEFAULT_API_URL, FASTLY_API_KEY,
    FASTLY_API_URL,
};
