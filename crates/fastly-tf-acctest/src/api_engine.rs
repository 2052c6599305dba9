use async_trait::async_trait;
use fastly_tf_client::FastlyClient;
use fastly_tf_domain::{expand_gcs, GcsEnv, ServiceConfig};
use tracing::{debug, info, warn};

use crate::engine::{AppliedService, Engine};
use crate::error::EngineError;

const SERVICE_COMMENT: &str = "Managed by Terraform";

/// Applies a [`ServiceConfig`] by calling the API directly.
///
/// Every apply creates a new service, populates its first version and
/// activates it. If population fails the half-built service is deleted
/// before the error is returned.
#[derive(Clone)]
pub struct ApiEngine {
    client: FastlyClient,
    gcs: GcsEnv,
}

impl ApiEngine {
    /// `gcs` is the credential fallback for blocks without `email`/`secret_key`.
    pub fn new(client: FastlyClient, gcs: GcsEnv) -> Self {
        Self { client, gcs }
    }

    async fn populate(&self, config: &ServiceConfig, service_id: &str, version: u32) -> Result<(), EngineError> {
        for domain in &config.domains {
            debug!(service_id, domain = %domain.name, "creating domain");
            self.client.create_domain(service_id, version, domain).await?;
        }
        for backend in &config.backends {
            debug!(service_id, backend = %backend.name, "creating backend");
            self.client.create_backend(service_id, version, backend).await?;
        }
        for block in &config.gcslogging {
            let input = expand_gcs(block, &self.gcs)?;
            debug!(service_id, gcs = %input.name, "creating gcs endpoint");
            self.client.create_gcs(service_id, version, &input).await?;
        }
        self.client.activate_version(service_id, version).await?;
        Ok(())
    }
}

#[async_trait]
impl Engine for ApiEngine {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn apply(&self, config: &ServiceConfig) -> Result<AppliedService, EngineError> {
        config.validate()?;
        // Resolve credentials up front so a missing fallback fails before
        // anything exists remotely.
        for block in &config.gcslogging {
            expand_gcs(block, &self.gcs)?;
        }

        info!(service = %config.name, "creating service");
        let service = self.client.create_service(&config.name, SERVICE_COMMENT).await?;
        let version = service.versions.first().map_or(1, |v| v.number);

        if let Err(e) = self.populate(config, &service.id, version).await {
            warn!(service_id = %service.id, error = %e, "apply failed; deleting partial service");
            if let Err(cleanup) = self.client.delete_service(&service.id).await {
                warn!(service_id = %service.id, error = %cleanup, "failed to delete partial service");
            }
            return Err(e);
        }

        info!(service_id = %service.id, version, "service active");
        Ok(AppliedService {
            id: service.id,
            name: config.name.clone(),
            version,
            force_destroy: config.force_destroy,
        })
    }

    async fn destroy(&self, applied: &AppliedService) -> Result<(), EngineError> {
        let detail = match self.client.get_service_details(&applied.id).await {
            Ok(detail) => detail,
            Err(e) if e.is_not_found() => {
                info!(service_id = %applied.id, "service already deleted");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let active = detail.active_version_number();
        if active > 0 {
            if !applied.force_destroy {
                return Err(EngineError::DestroyFailed(format!(
                    "service {} has active version {} and force_destroy is false",
                    applied.id, active
                )));
            }
            debug!(service_id = %applied.id, version = active, "deactivating");
            self.client.deactivate_version(&applied.id, active).await?;
        }
        info!(service_id = %applied.id, "deleting service");
        self.client.delete_service(&applied.id).await?;
        Ok(())
    }
}
