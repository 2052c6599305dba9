use fastly_tf_config::ProviderConfig;
use fastly_tf_domain::{
    Backend, BackendBlock, CreateGcsInput, Domain, DomainBlock, Gcs, Service, ServiceDetail, Version,
};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Header carrying the API token.
const AUTH_HEADER: &str = "Fastly-Key";

/// Arguments of [`FastlyClient::list_gcss`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListGcssInput {
    pub service: String,
    pub version: u32,
}

/// Thin async client for the service configuration API.
///
/// Every call is a single round trip. Nothing is retried; callers decide what
/// a failure means.
#[derive(Clone)]
pub struct FastlyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FastlyClient {
    /// Build a client from resolved provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fastly-tf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Http { operation: "build client", source: e })?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Build a client with default HTTP settings against `base_url`.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    // ── Services ──────────────────────────────────────────────────────────────

    pub async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        let url = self.url(&["service"])?;
        self.send(self.request(Method::GET, url), "list services").await
    }

    pub async fn create_service(&self, name: &str, comment: &str) -> Result<Service, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidInput {
                operation: "create service",
                message: "name must not be empty".into(),
            });
        }
        let url = self.url(&["service"])?;
        let req = self
            .request(Method::POST, url)
            .form(&[("name", name), ("comment", comment)]);
        self.send(req, "create service").await
    }

    pub async fn get_service_details(&self, service_id: &str) -> Result<ServiceDetail, ClientError> {
        check_service_id(service_id, "get service details")?;
        let url = self.url(&["service", service_id, "details"])?;
        self.send(self.request(Method::GET, url), "get service details").await
    }

    pub async fn delete_service(&self, service_id: &str) -> Result<(), ClientError> {
        check_service_id(service_id, "delete service")?;
        let url = self.url(&["service", service_id])?;
        self.send_empty(self.request(Method::DELETE, url), "delete service").await
    }

    // ── Versions ──────────────────────────────────────────────────────────────

    pub async fn activate_version(&self, service_id: &str, version: u32) -> Result<Version, ClientError> {
        self.version_action(service_id, version, "activate", "activate version").await
    }

    pub async fn deactivate_version(&self, service_id: &str, version: u32) -> Result<Version, ClientError> {
        self.version_action(service_id, version, "deactivate", "deactivate version").await
    }

    async fn version_action(
        &self,
        service_id: &str,
        version: u32,
        action: &str,
        operation: &'static str,
    ) -> Result<Version, ClientError> {
        check_service_version(service_id, version, operation)?;
        let v = version.to_string();
        let url = self.url(&["service", service_id, "version", &v, action])?;
        self.send(self.request(Method::PUT, url), operation).await
    }

    // ── Domains and backends ──────────────────────────────────────────────────

    pub async fn create_domain(
        &self,
        service_id: &str,
        version: u32,
        domain: &DomainBlock,
    ) -> Result<Domain, ClientError> {
        check_service_version(service_id, version, "create domain")?;
        let v = version.to_string();
        let url = self.url(&["service", service_id, "version", &v, "domain"])?;
        let mut form = vec![("name", domain.name.clone())];
        if let Some(comment) = &domain.comment {
            form.push(("comment", comment.clone()));
        }
        self.send(self.request(Method::POST, url).form(&form), "create domain").await
    }

    pub async fn create_backend(
        &self,
        service_id: &str,
        version: u32,
        backend: &BackendBlock,
    ) -> Result<Backend, ClientError> {
        check_service_version(service_id, version, "create backend")?;
        let v = version.to_string();
        let url = self.url(&["service", service_id, "version", &v, "backend"])?;
        let mut form = vec![
            ("name", backend.name.clone()),
            ("address", backend.address.clone()),
        ];
        if let Some(port) = backend.port {
            form.push(("port", port.to_string()));
        }
        self.send(self.request(Method::POST, url).form(&form), "create backend").await
    }

    // ── GCS logging ───────────────────────────────────────────────────────────

    /// List the GCS logging endpoints of one service version, in API order.
    pub async fn list_gcss(&self, input: &ListGcssInput) -> Result<Vec<Gcs>, ClientError> {
        check_service_version(&input.service, input.version, "list gcs endpoints")?;
        let v = input.version.to_string();
        let url = self.url(&["service", &input.service, "version", &v, "logging", "gcs"])?;
        self.send(self.request(Method::GET, url), "list gcs endpoints").await
    }

    pub async fn create_gcs(
        &self,
        service_id: &str,
        version: u32,
        input: &CreateGcsInput,
    ) -> Result<Gcs, ClientError> {
        check_service_version(service_id, version, "create gcs endpoint")?;
        let v = version.to_string();
        let url = self.url(&["service", service_id, "version", &v, "logging", "gcs"])?;
        self.send(self.request(Method::POST, url).form(input), "create gcs endpoint").await
    }

    pub async fn delete_gcs(&self, service_id: &str, version: u32, name: &str) -> Result<(), ClientError> {
        check_service_version(service_id, version, "delete gcs endpoint")?;
        let v = version.to_string();
        let url = self.url(&["service", service_id, "version", &v, "logging", "gcs", name])?;
        self.send_empty(self.request(Method::DELETE, url), "delete gcs endpoint").await
    }

    // ── Plumbing ──────────────────────────────────────────────────────────────

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "fastly request");
        self.client
            .request(method, url)
            .header(AUTH_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, ClientError> {
        let body = self.send_raw(req, operation).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode { operation, source: e })
    }

    async fn send_empty(&self, req: RequestBuilder, operation: &'static str) -> Result<(), ClientError> {
        self.send_raw(req, operation).await.map(|_| ())
    }

    async fn send_raw(&self, req: RequestBuilder, operation: &'static str) -> Result<String, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Http { operation, source: e })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::Http { operation, source: e })?;

        if !status.is_success() {
            let message = extract_api_error(&body);
            warn!(operation, status = status.as_u16(), %message, "fastly API error");
            return Err(ClientError::Api {
                operation,
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

/// Turn an API error body into a one-line message: `"<msg>: <detail>"`.
/// Falls back to the raw body when it is not the usual JSON envelope.
fn extract_api_error(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let Some(v) = parsed else {
        let trimmed = body.trim();
        return if trimmed.is_empty() { "empty response body".into() } else { trimmed.to_string() };
    };
    let msg = v["msg"].as_str().or_else(|| v["message"].as_str());
    let detail = v["detail"].as_str().filter(|d| !d.is_empty());
    match (msg, detail) {
        (Some(m), Some(d)) => format!("{}: {}", m, d),
        (Some(m), None) => m.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => v.to_string(),
    }
}

fn check_service_id(service_id: &str, operation: &'static str) -> Result<(), ClientError> {
    if service_id.is_empty() {
        return Err(ClientError::InvalidInput {
            operation,
            message: "service id must not be empty".into(),
        });
    }
    Ok(())
}

fn check_service_version(service_id: &str, version: u32, operation: &'static str) -> Result<(), ClientError> {
    check_service_id(service_id, operation)?;
    if version == 0 {
        return Err(ClientError::InvalidInput {
            operation,
            message: "version must be greater than zero".into(),
        });
    }
    Ok(())
}
