use serde::{Deserialize, Serialize};

/// Raw YAML representation of a provider settings file.
///
/// ```yaml
/// api_key: "..."
/// base_url: "https://api.fastly.com"
/// timeout_secs: 60
/// gcs:
///   email: "logger@project.iam.gserviceaccount.com"
///   secret_key: "..."
/// ```
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub gcs: Option<RawGcsCredentials>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawGcsCredentials {
    pub email: Option<String>,
    pub secret_key: Option<String>,
}
