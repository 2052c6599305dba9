use fastly_tf_domain::{BackendBlock, DomainBlock, GcsLoggingBlock, ServiceConfig};

use crate::names::rand_string;

/// Resource name used in every rendered test document.
pub const RESOURCE_NAME: &str = "foo";

/// Service with one `gcslogging` block carrying explicit credentials.
pub fn service_config_gcs(name: &str, gcs_name: &str) -> ServiceConfig {
    let block = GcsLoggingBlock::new(gcs_name, "bucketName")
        .with_credentials("email@example.com", "secretKey")
        .with_format("log format");
    base_service(name, block)
}

/// Service with one `gcslogging` block that leaves `email` and `secret_key`
/// to the environment fallback.
pub fn service_config_gcs_env(name: &str, gcs_name: &str) -> ServiceConfig {
    let block = GcsLoggingBlock::new(gcs_name, "bucketName").with_format("log format");
    base_service(name, block)
}

fn base_service(name: &str, block: GcsLoggingBlock) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        domains: vec![DomainBlock {
            name: format!("fastly-test.tf-{}.com", rand_string(10)),
            comment: Some("tf-testing-domain".into()),
        }],
        backends: vec![BackendBlock {
            name: "tf -test backend".into(),
            address: format!("{}.aws.amazon.com", rand_string(3)),
            port: None,
        }],
        gcslogging: vec![block],
        force_destroy: true,
    }
}
