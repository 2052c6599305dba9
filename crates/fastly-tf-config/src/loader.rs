use std::path::Path;
use std::time::Duration;

use fastly_tf_domain::{GcsEnv, FASTLY_GCS_EMAIL, FASTLY_GCS_SECRET_KEY};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawProviderConfig;

/// API token used by the provider.
pub const FASTLY_API_KEY: &str = "FASTLY_API_KEY";
/// Optional API base URL override.
pub const FASTLY_API_URL: &str = "FASTLY_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.fastly.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Provider-level settings, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-request timeout for the API client.
    pub timeout: Duration,
    /// Credential fallback for `gcslogging` blocks that omit `email`/`secret_key`.
    pub gcs: GcsEnv,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("gcs_email", &self.gcs.email)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            gcs: GcsEnv::default(),
        }
    }

    /// Resolve from the process environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve(RawProviderConfig::default(), lookup)
    }

    /// Resolve from an optional YAML file, with variables from `lookup`
    /// taking precedence over file values.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = match path {
            Some(p) => read_raw(p)?,
            None => RawProviderConfig::default(),
        };
        resolve(raw, lookup)
    }
}

/// Load provider settings from `path` (if any) and the process environment.
pub fn load_provider_config(path: Option<&Path>) -> Result<ProviderConfig, ConfigError> {
    ProviderConfig::load(path, |k| std::env::var(k).ok())
}

/// Snapshot `FASTLY_GCS_EMAIL` / `FASTLY_GCS_SECRET_KEY` from the process environment.
pub fn load_gcs_env() -> GcsEnv {
    gcs_env_from(|k| std::env::var(k).ok())
}

fn gcs_env_from<F>(lookup: F) -> GcsEnv
where
    F: Fn(&str) -> Option<String>,
{
    GcsEnv {
        email: non_empty(lookup(FASTLY_GCS_EMAIL)),
        secret_key: non_empty(lookup(FASTLY_GCS_SECRET_KEY)),
    }
}

fn read_raw(path: &Path) -> Result<RawProviderConfig, ConfigError> {
    debug!("Loading provider config from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })
}

fn resolve<F>(raw: RawProviderConfig, lookup: F) -> Result<ProviderConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = non_empty(lookup(FASTLY_API_KEY))
        .or_else(|| non_empty(raw.api_key))
        .ok_or(ConfigError::MissingApiKey(FASTLY_API_KEY))?;

    let base_url = non_empty(lookup(FASTLY_API_URL))
        .or_else(|| non_empty(raw.base_url))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            key: FASTLY_API_URL.to_string(),
            message: format!("'{}' is not an http(s) URL", base_url),
        });
    }

    let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "timeout_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    let env_gcs = gcs_env_from(&lookup);
    let file_gcs = raw.gcs.unwrap_or_default();
    let gcs = GcsEnv {
        email: env_gcs.email.or_else(|| non_empty(file_gcs.email)),
        secret_key: env_gcs.secret_key.or_else(|| non_empty(file_gcs.secret_key)),
    };

    Ok(ProviderConfig {
        api_key,
        base_url: base_url.trim_end_matches('/').to_string(),
        timeout: Duration::from_secs(timeout_secs),
        gcs,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
