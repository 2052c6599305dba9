use fastly_tf_client::ClientError;
use fastly_tf_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("error setting env var {key}: {reason}")]
    InvalidVar { key: String, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] DomainError),

    #[error("api error: {0}")]
    Client(#[from] ClientError),

    #[error("apply failed: {0}")]
    ApplyFailed(String),

    #[error("destroy failed: {0}")]
    DestroyFailed(String),

    #[error("internal engine error: {0}")]
    Internal(String),
}

/// Mismatch between expected and observed remote state.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("No service ID is set")]
    NoId,

    #[error("error looking up service ({id}): {source}")]
    ServiceLookup {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("service details not loaded; ServiceExists must run first")]
    ServiceNotLoaded,

    #[error("Bad name, expected ({expected}), got ({got})")]
    BadName { expected: String, got: String },

    #[error("error looking up GCSs for ({service}), version ({version}): {source}")]
    GcsLookup {
        service: String,
        version: u32,
        #[source]
        source: ClientError,
    },

    #[error("GCS missing, expected: {expected}, got: {got}")]
    GcsCount { expected: usize, got: usize },

    #[error("GCS name mismatch, expected: {expected}, got: {got:?}")]
    GcsNameMismatch { expected: String, got: String },

    #[error("GCS ({name}) not found")]
    GcsNotFound { name: String },

    #[error("GCS ({name}) user mismatch, expected: {expected}, got: {got:?}")]
    GcsUserMismatch {
        name: String,
        expected: String,
        got: String,
    },

    #[error("error listing services: {0}")]
    ListServices(#[source] ClientError),

    #[error("service ({0}) still exists")]
    ServiceNotDestroyed(String),
}

/// Why an acceptance test case failed.
#[derive(Debug, Error)]
pub enum AccError {
    #[error("pre-check failed: {0}")]
    PreCheck(String),

    #[error("step {step}: apply: {source}")]
    Apply {
        step: usize,
        #[source]
        source: EngineError,
    },

    #[error("step {step}: check: {source}")]
    Check {
        step: usize,
        #[source]
        source: CheckError,
    },

    #[error("destroy: {0}")]
    Destroy(#[source] EngineError),

    #[error("check destroy: {0}")]
    CheckDestroy(#[source] CheckError),
}
