use async_trait::async_trait;
use fastly_tf_client::{FastlyClient, ListGcssInput};
use fastly_tf_domain::{Gcs, ServiceDetail};
use tracing::debug;

use crate::engine::AppliedService;
use crate::error::CheckError;

/// State shared by the checks of one step.
pub struct CheckContext<'a> {
    pub client: &'a FastlyClient,
    pub applied: &'a AppliedService,
    /// Filled in by [`ServiceExists`].
    pub service: Option<ServiceDetail>,
}

impl<'a> CheckContext<'a> {
    pub fn new(client: &'a FastlyClient, applied: &'a AppliedService) -> Self {
        Self { client, applied, service: None }
    }

    fn service(&self) -> Result<&ServiceDetail, CheckError> {
        self.service.as_ref().ok_or(CheckError::ServiceNotLoaded)
    }

    /// GCS endpoints on the active version of the loaded service.
    async fn active_gcss(&self) -> Result<Vec<Gcs>, CheckError> {
        let service = self.service()?;
        let version = service.active_version_number();
        self.client
            .list_gcss(&ListGcssInput { service: service.id.clone(), version })
            .await
            .map_err(|e| CheckError::GcsLookup {
                service: service.name.clone(),
                version,
                source: e,
            })
    }
}

/// One assertion about post-apply remote state.
#[async_trait]
pub trait StateCheck: Send + Sync {
    async fn check(&self, ctx: &mut CheckContext<'_>) -> Result<(), CheckError>;
}

/// Runs checks in order and stops at the first failure.
#[derive(Default)]
pub struct ComposeCheck {
    checks: Vec<Box<dyn StateCheck>>,
}

pub fn compose(checks: Vec<Box<dyn StateCheck>>) -> ComposeCheck {
    ComposeCheck { checks }
}

#[async_trait]
impl StateCheck for ComposeCheck {
    async fn check(&self, ctx: &mut CheckContext<'_>) -> Result<(), CheckError> {
        for check in &self.checks {
            check.check(ctx).await?;
        }
        Ok(())
    }
}

/// Loads the applied service's details into the context.
pub struct ServiceExists;

#[async_trait]
impl StateCheck for ServiceExists {
    async fn check(&self, ctx: &mut CheckContext<'_>) -> Result<(), CheckError> {
        let id = &ctx.applied.id;
        if id.is_empty() {
            return Err(CheckError::NoId);
        }
        let detail = ctx
            .client
            .get_service_details(id)
            .await
            .map_err(|e| CheckError::ServiceLookup { id: id.clone(), source: e })?;
        debug!(service_id = %id, active_version = detail.active_version_number(), "service exists");
        ctx.service = Some(detail);
        Ok(())
    }
}

/// Service name matches and the active version has exactly one GCS
/// endpoint, named `gcs_name`.
pub struct GcsAttributes {
    pub name: String,
    pub gcs_name: String,
}

impl GcsAttributes {
    pub fn new(name: impl Into<String>, gcs_name: impl Into<String>) -> Self {
        Self { name: name.into(), gcs_name: gcs_name.into() }
    }
}

#[async_trait]
impl StateCheck for GcsAttributes {
    async fn check(&self, ctx: &mut CheckContext<'_>) -> Result<(), CheckError> {
        let service = ctx.service()?;
        if service.name != self.name {
            return Err(CheckError::BadName {
                expected: self.name.clone(),
                got: service.name.clone(),
            });
        }

        let gcs_list = ctx.active_gcss().await?;
        if gcs_list.len() != 1 {
            return Err(CheckError::GcsCount { expected: 1, got: gcs_list.len() });
        }
        if gcs_list[0].name != self.gcs_name {
            return Err(CheckError::GcsNameMismatch {
                expected: self.gcs_name.clone(),
                got: gcs_list[0].name.clone(),
            });
        }
        Ok(())
    }
}

/// The endpoint named `gcs_name` reports `email` as its user.
pub struct GcsUser {
    pub gcs_name: String,
    pub email: String,
}

#[async_trait]
impl StateCheck for GcsUser {
    async fn check(&self, ctx: &mut CheckContext<'_>) -> Result<(), CheckError> {
        let gcs_list = ctx.active_gcss().await?;
        let gcs = gcs_list
            .iter()
            .find(|g| g.name == self.gcs_name)
            .ok_or_else(|| CheckError::GcsNotFound { name: self.gcs_name.clone() })?;
        if gcs.user != self.email {
            return Err(CheckError::GcsUserMismatch {
                name: self.gcs_name.clone(),
                expected: self.email.clone(),
                got: gcs.user.clone(),
            });
        }
        Ok(())
    }
}

/// Assertion run after every applied service has been destroyed.
#[async_trait]
pub trait DestroyCheck: Send + Sync {
    async fn check_destroyed(
        &self,
        client: &FastlyClient,
        destroyed: &[AppliedService],
    ) -> Result<(), CheckError>;
}

/// None of the destroyed service ids appear in the service listing.
pub struct ServiceDestroyed;

#[async_trait]
impl DestroyCheck for ServiceDestroyed {
    async fn check_destroyed(
        &self,
        client: &FastlyClient,
        destroyed: &[AppliedService],
    ) -> Result<(), CheckError> {
        let services = client.list_services().await.map_err(CheckError::ListServices)?;
        for applied in destroyed {
            if services.iter().any(|s| s.id == applied.id) {
                return Err(CheckError::ServiceNotDestroyed(applied.id.clone()));
            }
        }
        Ok(())
    }
}
