use std::io::Write;
use std::path::Path;

use fastly_tf_config::{load_gcs_env, ConfigError, ProviderConfig};
use serial_test::serial;

fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[test]
fn load_from_yaml_file() {
    let f = yaml_file(
        "api_key: file-key\n\
         base_url: http://localhost:9000\n\
         timeout_secs: 5\n\
         gcs:\n  email: logger@example.com\n  secret_key: file-secret\n",
    );
    let cfg = ProviderConfig::load(Some(f.path()), |_| None).expect("should load without error");
    assert_eq!(cfg.api_key, "file-key");
    assert_eq!(cfg.base_url, "http://localhost:9000");
    assert_eq!(cfg.timeout.as_secs(), 5);
    assert_eq!(cfg.gcs.email.as_deref(), Some("logger@example.com"));
    assert_eq!(cfg.gcs.secret_key.as_deref(), Some("file-secret"));
}

#[test]
fn environment_overrides_file_values() {
    let f = yaml_file("api_key: file-key\ngcs:\n  email: file@example.com\n");
    let cfg = ProviderConfig::load(Some(f.path()), |k| match k {
        "FASTLY_API_KEY" => Some("env-key".into()),
        "FASTLY_GCS_EMAIL" => Some("env@example.com".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.api_key, "env-key");
    assert_eq!(cfg.gcs.email.as_deref(), Some("env@example.com"));
    assert_eq!(cfg.gcs.secret_key, None);
}

#[test]
fn malformed_yaml_is_reported_with_path() {
    let f = yaml_file("api_key: [unterminated\n");
    let err = ProviderConfig::load(Some(f.path()), |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }));
    assert!(err.to_string().contains(&f.path().display().to_string()));
}

#[test]
fn missing_file_returns_error() {
    let path = Path::new("/nonexistent/path/provider.yml");
    assert!(matches!(
        ProviderConfig::load(Some(path), |_| None),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let f = yaml_file("api_key: k\ntimeout_secs: 0\n");
    assert!(matches!(
        ProviderConfig::load(Some(f.path()), |_| None),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
#[serial]
fn gcs_env_is_read_from_process() {
    let prev_email = std::env::var("FASTLY_GCS_EMAIL").ok();
    let prev_secret = std::env::var("FASTLY_GCS_SECRET_KEY").ok();

    std::env::set_var("FASTLY_GCS_EMAIL", "process@example.com");
    std::env::remove_var("FASTLY_GCS_SECRET_KEY");
    let env = load_gcs_env();

    match prev_email {
        Some(v) => std::env::set_var("FASTLY_GCS_EMAIL", v),
        None => std::env::remove_var("FASTLY_GCS_EMAIL"),
    }
    if let Some(v) = prev_secret {
        std::env::set_var("FASTLY_GCS_SECRET_KEY", v);
    }

    assert_eq!(env.email.as_deref(), Some("process@example.com"));
    assert_eq!(env.secret_key, None);
}
