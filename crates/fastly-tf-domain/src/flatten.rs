use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::DomainError;
use crate::types::{CreateGcsInput, Gcs, GcsEnv, GcsLoggingBlock, FASTLY_GCS_EMAIL, FASTLY_GCS_SECRET_KEY};

/// Field name → value, as stored for one `gcslogging` block.
pub type FlatRecord = BTreeMap<String, Value>;

/// Attribute names of the `gcslogging` block.
pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const BUCKET_NAME: &str = "bucket_name";
    pub const SECRET_KEY: &str = "secret_key";
    pub const PATH: &str = "path";
    pub const FORMAT: &str = "format";
    pub const PERIOD: &str = "period";
    pub const GZIP_LEVEL: &str = "gzip_level";
    pub const RESPONSE_CONDITION: &str = "response_condition";
}

/// Convert remote GCS endpoints into `gcslogging` attribute maps.
///
/// Output element `i` is built from input element `i` only, so order and
/// length are preserved.
pub fn flatten_gcs(remote: &[Gcs]) -> Vec<FlatRecord> {
    remote.iter().map(flatten_one).collect()
}

fn flatten_one(gcs: &Gcs) -> FlatRecord {
    let mut out = FlatRecord::new();
    out.insert(fields::NAME.into(), Value::from(gcs.name.as_str()));
    out.insert(fields::EMAIL.into(), Value::from(gcs.user.as_str()));
    out.insert(fields::BUCKET_NAME.into(), Value::from(gcs.bucket_name.as_str()));
    out.insert(fields::SECRET_KEY.into(), Value::from(gcs.secret_key.as_str()));
    out.insert(fields::FORMAT.into(), Value::from(gcs.format.as_str()));
    out.insert(fields::PERIOD.into(), Value::from(gcs.period));
    out.insert(fields::GZIP_LEVEL.into(), Value::from(gcs.gzip_level));
    out
}

/// Build the create input for a `gcslogging` block.
///
/// Explicit credentials win over `env`. Blank values count as unset.
pub fn expand_gcs(block: &GcsLoggingBlock, env: &GcsEnv) -> Result<CreateGcsInput, DomainError> {
    if block.gzip_level > 9 {
        return Err(DomainError::InvalidGzipLevel {
            endpoint: block.name.clone(),
            level: block.gzip_level,
        });
    }

    let user = resolve_credential(
        &block.name,
        block.email.as_deref(),
        env.email.as_deref(),
        fields::EMAIL,
        FASTLY_GCS_EMAIL,
    )?;
    let secret_key = resolve_credential(
        &block.name,
        block.secret_key.as_deref(),
        env.secret_key.as_deref(),
        fields::SECRET_KEY,
        FASTLY_GCS_SECRET_KEY,
    )?;

    Ok(CreateGcsInput {
        name: block.name.clone(),
        user,
        bucket_name: block.bucket_name.clone(),
        secret_key,
        path: block.path.clone().filter(|p| !p.is_empty()),
        format: block.format.clone(),
        period: block.period,
        gzip_level: block.gzip_level,
        response_condition: block.response_condition.clone().filter(|c| !c.is_empty()),
    })
}

fn resolve_credential(
    endpoint: &str,
    explicit: Option<&str>,
    fallback: Option<&str>,
    field: &'static str,
    env_var: &'static str,
) -> Result<String, DomainError> {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.filter(|v| !v.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| DomainError::MissingCredential {
            endpoint: endpoint.to_string(),
            field,
            env_var,
        })
}
