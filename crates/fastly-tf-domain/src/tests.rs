use serde_json::{json, Value};

use crate::*;

fn as_record(value: Value) -> FlatRecord {
    serde_json::from_value(value).unwrap()
}

fn collector() -> Gcs {
    Gcs {
        name: "GCS collector".into(),
        user: "email@example.com".into(),
        bucket_name: "bucketName".into(),
        secret_key: "secretKey".into(),
        format: "log format".into(),
        period: 3600,
        gzip_level: 0,
        ..Default::default()
    }
}

fn service_with(gcslogging: Vec<GcsLoggingBlock>) -> ServiceConfig {
    ServiceConfig {
        name: "tf-test-abc".into(),
        domains: vec![DomainBlock {
            name: "fastly-test.tf-abc.com".into(),
            comment: Some("tf-testing-domain".into()),
        }],
        backends: vec![BackendBlock {
            name: "tf -test backend".into(),
            address: "xyz.aws.amazon.com".into(),
            port: None,
        }],
        gcslogging,
        force_destroy: true,
    }
}

// ── flatten ──────────────────────────────────────────────────────────────────

#[test]
fn flatten_gcs_maps_every_field() {
    let out = flatten_gcs(&[collector()]);
    let expected = vec![as_record(json!({
        "name":        "GCS collector",
        "email":       "email@example.com",
        "bucket_name": "bucketName",
        "secret_key":  "secretKey",
        "format":      "log format",
        "period":      3600,
        "gzip_level":  0,
    }))];
    assert_eq!(out, expected, "expected: {:#?}\ngot: {:#?}", expected, out);
}

#[test]
fn flatten_gcs_preserves_order_and_length() {
    let names = ["first", "second", "third"];
    let remote: Vec<Gcs> = names
        .iter()
        .map(|n| Gcs { name: n.to_string(), ..collector() })
        .collect();

    let out = flatten_gcs(&remote);
    assert_eq!(out.len(), remote.len());
    for (i, rec) in out.iter().enumerate() {
        assert_eq!(rec["name"], names[i]);
    }
}

#[test]
fn flatten_gcs_unset_fields_are_zero() {
    let out = flatten_gcs(&[Gcs { name: "bare".into(), ..Default::default() }]);
    assert_eq!(out[0]["period"], 0);
    assert_eq!(out[0]["gzip_level"], 0);
    assert_eq!(out[0]["email"], "");
    assert_eq!(out[0].len(), 7);
}

#[test]
fn flatten_gcs_empty_input() {
    assert!(flatten_gcs(&[]).is_empty());
}

// ── decoding ─────────────────────────────────────────────────────────────────

#[test]
fn gcs_decodes_numbers_sent_as_strings() {
    let gcs: Gcs = serde_json::from_value(json!({
        "name":       "gcs one",
        "user":       "svc@example.iam.gserviceaccount.com",
        "period":     "3600",
        "gzip_level": "9",
        "version":    "3",
        "path":       null,
    }))
    .unwrap();
    assert_eq!(gcs.period, 3600);
    assert_eq!(gcs.gzip_level, 9);
    assert_eq!(gcs.version, 3);
    assert_eq!(gcs.path, "");
    assert_eq!(gcs.bucket_name, "");
}

#[test]
fn gcs_rejects_out_of_range_gzip_level() {
    let res: Result<Gcs, _> = serde_json::from_value(json!({ "gzip_level": 300 }));
    assert!(res.is_err());
}

#[test]
fn version_decodes_numeric_booleans() {
    let v: Version = serde_json::from_value(json!({ "number": 2, "active": "1", "locked": 0 })).unwrap();
    assert_eq!(v.number, 2);
    assert!(v.active);
    assert!(!v.locked);
}

#[test]
fn version_rejects_non_integer_boolean_numbers() {
    for bad in [json!(-1), json!(1.0)] {
        let res: Result<Version, _> = serde_json::from_value(json!({ "number": 1, "active": bad.clone() }));
        assert!(res.is_err(), "accepted {}", bad);
    }
}

// ── expand ───────────────────────────────────────────────────────────────────

#[test]
fn expand_gcs_prefers_explicit_credentials() {
    let block = GcsLoggingBlock::new("gcs", "bucketName").with_credentials("explicit@example.com", "explicit");
    let env = GcsEnv::new("env@example.com", "from-env");
    let input = expand_gcs(&block, &env).unwrap();
    assert_eq!(input.user, "explicit@example.com");
    assert_eq!(input.secret_key, "explicit");
    assert_eq!(input.period, DEFAULT_GCS_PERIOD);
    assert_eq!(input.format, DEFAULT_GCS_FORMAT);
}

#[test]
fn expand_gcs_falls_back_to_env() {
    let block = GcsLoggingBlock::new("gcs", "bucketName");
    let env = GcsEnv::new("someEnv", "someEnv");
    let input = expand_gcs(&block, &env).unwrap();
    assert_eq!(input.user, "someEnv");
    assert_eq!(input.secret_key, "someEnv");
}

#[test]
fn expand_gcs_blank_explicit_value_uses_env() {
    let mut block = GcsLoggingBlock::new("gcs", "bucketName");
    block.email = Some(String::new());
    block.secret_key = Some("explicit".into());
    let env = GcsEnv { email: Some("env@example.com".into()), secret_key: None };
    let input = expand_gcs(&block, &env).unwrap();
    assert_eq!(input.user, "env@example.com");
    assert_eq!(input.secret_key, "explicit");
}

#[test]
fn expand_gcs_missing_credential_names_env_var() {
    let block = GcsLoggingBlock::new("gcs", "bucketName");
    let env = GcsEnv { email: Some("env@example.com".into()), secret_key: Some(String::new()) };
    let err = expand_gcs(&block, &env).unwrap_err();
    assert!(matches!(
        err,
        DomainError::MissingCredential { field: "secret_key", env_var: FASTLY_GCS_SECRET_KEY, .. }
    ));
    assert!(err.to_string().contains("FASTLY_GCS_SECRET_KEY"));
}

#[test]
fn expand_gcs_rejects_gzip_level_above_nine() {
    let mut block = GcsLoggingBlock::new("gcs", "bucketName").with_credentials("a@b.c", "k");
    block.gzip_level = 10;
    assert!(matches!(
        expand_gcs(&block, &GcsEnv::default()),
        Err(DomainError::InvalidGzipLevel { level: 10, .. })
    ));
}

#[test]
fn expand_gcs_drops_empty_response_condition() {
    let mut block = GcsLoggingBlock::new("gcs", "bucketName").with_credentials("a@b.c", "k");
    block.response_condition = Some(String::new());
    let input = expand_gcs(&block, &GcsEnv::default()).unwrap();
    assert_eq!(input.response_condition, None);
}

// ── rendering ────────────────────────────────────────────────────────────────

#[test]
fn render_includes_explicit_credentials() {
    let cfg = service_with(vec![GcsLoggingBlock::new("gcs abc", "bucketName")
        .with_credentials("email@example.com", "secretKey")
        .with_format("log format")]);
    let hcl = render_service("foo", &cfg);

    assert!(hcl.starts_with("resource \"fastly_service_v1\" \"foo\" {\n"));
    assert!(hcl.contains("  gcslogging {\n"));
    assert!(hcl.contains("    name = \"gcs abc\"\n"));
    assert!(hcl.contains("    email = \"email@example.com\"\n"));
    assert!(hcl.contains("    secret_key = \"secretKey\"\n"));
    assert!(hcl.contains("    format = \"log format\"\n"));
    assert!(hcl.contains("  force_destroy = true\n"));
    assert!(hcl.trim_end().ends_with('}'));
}

#[test]
fn render_omits_unset_credentials_and_empty_condition() {
    let mut block = GcsLoggingBlock::new("gcs abc", "bucketName");
    block.response_condition = Some(String::new());
    let hcl = render_service("foo", &service_with(vec![block]));

    assert!(!hcl.contains("email"));
    assert!(!hcl.contains("secret_key"));
    assert!(!hcl.contains("response_condition"));
    assert!(!hcl.contains("\","), "rendered document has a trailing comma:\n{}", hcl);
}

#[test]
fn render_escapes_quotes_and_interpolation() {
    let block = GcsLoggingBlock::new("gcs", "bucket").with_format("%h \"%r\" ${var}");
    let hcl = render_service("foo", &service_with(vec![block]));
    assert!(hcl.contains(r#"format = "%h \"%r\" $${var}""#), "{}", hcl);
}

// ── validation ───────────────────────────────────────────────────────────────

#[test]
fn validate_accepts_minimal_service() {
    service_with(vec![GcsLoggingBlock::new("gcs", "bucket")]).validate().unwrap();
}

#[test]
fn validate_rejects_duplicate_endpoint_names() {
    let cfg = service_with(vec![
        GcsLoggingBlock::new("gcs", "a"),
        GcsLoggingBlock::new("gcs", "b"),
    ]);
    assert!(matches!(cfg.validate(), Err(DomainError::DuplicateEndpoint(n)) if n == "gcs"));
}

#[test]
fn validate_rejects_service_without_backend() {
    let mut cfg = service_with(vec![]);
    cfg.backends.clear();
    assert!(matches!(cfg.validate(), Err(DomainError::InvalidConfig(_))));
}

#[test]
fn gcs_env_vars_skip_unset_values() {
    let env = GcsEnv { email: Some("a@b.c".into()), secret_key: None };
    assert_eq!(env.vars(), vec![(FASTLY_GCS_EMAIL, "a@b.c".to_string())]);
}
