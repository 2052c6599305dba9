use serde::{Deserialize, Serialize};

use crate::de::{lenient_bool, lenient_uint, nullable_string};
use crate::error::DomainError;

// ── Environment fallback ──────────────────────────────────────────────────────

/// Environment variable consulted when a `gcslogging` block omits `email`.
pub const FASTLY_GCS_EMAIL: &str = "FASTLY_GCS_EMAIL";
/// Environment variable consulted when a `gcslogging` block omits `secret_key`.
pub const FASTLY_GCS_SECRET_KEY: &str = "FASTLY_GCS_SECRET_KEY";

/// Default log line format applied when a block does not set `format`.
pub const DEFAULT_GCS_FORMAT: &str = "%h %l %u %t %r %>s";
/// Default upload period in seconds.
pub const DEFAULT_GCS_PERIOD: u32 = 3600;

/// Snapshot of the GCS credential fallback.
///
/// Read once by the configuration layer and handed to whatever expands
/// `gcslogging` blocks. Nothing in this crate touches the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcsEnv {
    pub email: Option<String>,
    pub secret_key: Option<String>,
}

impl GcsEnv {
    pub fn new(email: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            secret_key: Some(secret_key.into()),
        }
    }

    /// Key/value pairs suitable for a subprocess environment. Unset values are skipped.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        if let Some(email) = &self.email {
            vars.push((FASTLY_GCS_EMAIL, email.clone()));
        }
        if let Some(secret) = &self.secret_key {
            vars.push((FASTLY_GCS_SECRET_KEY, secret.clone()));
        }
        vars
    }
}

// ── Remote records ────────────────────────────────────────────────────────────

/// A GCS logging endpoint as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gcs {
    #[serde(deserialize_with = "nullable_string")]
    pub service_id: String,
    #[serde(deserialize_with = "lenient_uint")]
    pub version: u32,
    #[serde(deserialize_with = "nullable_string")]
    pub name: String,
    /// Service account email.
    #[serde(deserialize_with = "nullable_string")]
    pub user: String,
    #[serde(deserialize_with = "nullable_string")]
    pub bucket_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub secret_key: String,
    #[serde(deserialize_with = "nullable_string")]
    pub path: String,
    #[serde(deserialize_with = "nullable_string")]
    pub format: String,
    #[serde(deserialize_with = "lenient_uint")]
    pub period: u32,
    #[serde(deserialize_with = "lenient_uint")]
    pub gzip_level: u8,
    #[serde(deserialize_with = "nullable_string")]
    pub message_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub timestamp_format: String,
    #[serde(deserialize_with = "nullable_string")]
    pub response_condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    #[serde(deserialize_with = "lenient_uint")]
    pub number: u32,
    #[serde(deserialize_with = "lenient_bool")]
    pub active: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub locked: bool,
    #[serde(deserialize_with = "nullable_string")]
    pub comment: String,
}

/// Entry of the service listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub comment: String,
    /// Number of the active version; zero when nothing is active.
    #[serde(rename = "version", deserialize_with = "lenient_uint")]
    pub active_version: u32,
    pub versions: Vec<Version>,
}

/// Full service record returned by the details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDetail {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub comment: String,
    pub active_version: Option<Version>,
    /// The latest version, active or not.
    pub version: Option<Version>,
    pub versions: Vec<Version>,
}

impl ServiceDetail {
    /// Number of the active version, or zero.
    pub fn active_version_number(&self) -> u32 {
        self.active_version.as_ref().map_or(0, |v| v.number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    pub name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub comment: String,
    #[serde(deserialize_with = "lenient_uint")]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backend {
    pub name: String,
    pub address: String,
    #[serde(deserialize_with = "lenient_uint")]
    pub port: u16,
    #[serde(deserialize_with = "lenient_uint")]
    pub version: u32,
}

// ── Create inputs ─────────────────────────────────────────────────────────────

/// Form body for creating a GCS logging endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGcsInput {
    pub name: String,
    pub user: String,
    pub bucket_name: String,
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub format: String,
    pub period: u32,
    pub gzip_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_condition: Option<String>,
}

// ── Declarative configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBlock {
    pub name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendBlock {
    pub name: String,
    pub address: String,
    pub port: Option<u16>,
}

/// A `gcslogging` block. `email` and `secret_key` fall back to
/// [`FASTLY_GCS_EMAIL`] / [`FASTLY_GCS_SECRET_KEY`] when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcsLoggingBlock {
    pub name: String,
    pub bucket_name: String,
    pub email: Option<String>,
    pub secret_key: Option<String>,
    pub path: Option<String>,
    pub format: String,
    pub period: u32,
    pub gzip_level: u8,
    pub response_condition: Option<String>,
}

impl GcsLoggingBlock {
    /// A block with no credentials and default format, period and gzip level.
    pub fn new(name: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket_name: bucket_name.into(),
            email: None,
            secret_key: None,
            path: None,
            format: DEFAULT_GCS_FORMAT.to_string(),
            period: DEFAULT_GCS_PERIOD,
            gzip_level: 0,
            response_condition: None,
        }
    }

    pub fn with_credentials(mut self, email: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

/// Desired state of one `fastly_service_v1` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub domains: Vec<DomainBlock>,
    pub backends: Vec<BackendBlock>,
    pub gcslogging: Vec<GcsLoggingBlock>,
    pub force_destroy: bool,
}

impl ServiceConfig {
    /// Structural checks that do not need credentials.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidConfig("service name is empty".into()));
        }
        if self.domains.is_empty() {
            return Err(DomainError::InvalidConfig(format!(
                "service '{}' declares no domain",
                self.name
            )));
        }
        if self.backends.is_empty() {
            return Err(DomainError::InvalidConfig(format!(
                "service '{}' declares no backend",
                self.name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for block in &self.gcslogging {
            if block.name.is_empty() {
                return Err(DomainError::InvalidConfig("gcslogging name is empty".into()));
            }
            if block.gzip_level > 9 {
                return Err(DomainError::InvalidGzipLevel {
                    endpoint: block.name.clone(),
                    level: block.gzip_level,
                });
            }
            if !seen.insert(block.name.as_str()) {
                return Err(DomainError::DuplicateEndpoint(block.name.clone()));
            }
        }
        Ok(())
    }
}
