use crate::flatten::fields;
use crate::types::{BackendBlock, DomainBlock, GcsLoggingBlock, ServiceConfig};

/// Resource type every rendered document declares.
pub const SERVICE_RESOURCE_TYPE: &str = "fastly_service_v1";

/// Render `cfg` as a `fastly_service_v1` resource block named `resource_name`.
///
/// Unset optional attributes are omitted, as is an empty `response_condition`.
pub fn render_service(resource_name: &str, cfg: &ServiceConfig) -> String {
    let mut hcl = format!(
        "resource {} {} {{\n",
        quote(SERVICE_RESOURCE_TYPE),
        quote(resource_name)
    );
    hcl.push_str(&attr(1, "name", &quote(&cfg.name)));

    for domain in &cfg.domains {
        hcl.push('\n');
        render_domain(&mut hcl, domain);
    }
    for backend in &cfg.backends {
        hcl.push('\n');
        render_backend(&mut hcl, backend);
    }
    for block in &cfg.gcslogging {
        hcl.push('\n');
        render_gcslogging(&mut hcl, block);
    }

    hcl.push('\n');
    hcl.push_str(&attr(1, "force_destroy", if cfg.force_destroy { "true" } else { "false" }));
    hcl.push_str("}\n");
    hcl
}

impl ServiceConfig {
    /// Shorthand for [`render_service`].
    pub fn to_hcl(&self, resource_name: &str) -> String {
        render_service(resource_name, self)
    }
}

fn render_domain(hcl: &mut String, domain: &DomainBlock) {
    hcl.push_str("  domain {\n");
    hcl.push_str(&attr(2, "name", &quote(&domain.name)));
    if let Some(comment) = &domain.comment {
        hcl.push_str(&attr(2, "comment", &quote(comment)));
    }
    hcl.push_str("  }\n");
}

fn render_backend(hcl: &mut String, backend: &BackendBlock) {
    hcl.push_str("  backend {\n");
    hcl.push_str(&attr(2, "address", &quote(&backend.address)));
    hcl.push_str(&attr(2, "name", &quote(&backend.name)));
    if let Some(port) = backend.port {
        hcl.push_str(&attr(2, "port", &port.to_string()));
    }
    hcl.push_str("  }\n");
}

fn render_gcslogging(hcl: &mut String, block: &GcsLoggingBlock) {
    hcl.push_str("  gcslogging {\n");
    hcl.push_str(&attr(2, fields::NAME, &quote(&block.name)));
    if let Some(email) = &block.email {
        hcl.push_str(&attr(2, fields::EMAIL, &quote(email)));
    }
    hcl.push_str(&attr(2, fields::BUCKET_NAME, &quote(&block.bucket_name)));
    if let Some(secret) = &block.secret_key {
        hcl.push_str(&attr(2, fields::SECRET_KEY, &quote(secret)));
    }
    if let Some(path) = block.path.as_deref().filter(|p| !p.is_empty()) {
        hcl.push_str(&attr(2, fields::PATH, &quote(path)));
    }
    hcl.push_str(&attr(2, fields::FORMAT, &quote(&block.format)));
    hcl.push_str(&attr(2, fields::PERIOD, &block.period.to_string()));
    hcl.push_str(&attr(2, fields::GZIP_LEVEL, &block.gzip_level.to_string()));
    if let Some(cond) = block.response_condition.as_deref().filter(|c| !c.is_empty()) {
        hcl.push_str(&attr(2, fields::RESPONSE_CONDITION, &quote(cond)));
    }
    hcl.push_str("  }\n");
}

fn attr(depth: usize, key: &str, rendered: &str) -> String {
    format!("{}{} = {}\n", "  ".repeat(depth), key, rendered)
}

/// Quote an HCL string literal. `${` and `%{` are escaped so log format
/// strings are never read as template interpolation.
pub fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace("${", "$${")
        .replace("%{", "%%{");
    format!("\"{}\"", escaped)
}
