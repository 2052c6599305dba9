use fastly_tf_client::FastlyClient;
use fastly_tf_config::{ProviderConfig, FASTLY_API_KEY};
use fastly_tf_domain::ServiceConfig;
use tracing::{debug, info, warn};

use crate::check::{compose, CheckContext, ComposeCheck, DestroyCheck, GcsAttributes, ServiceDestroyed, ServiceExists, StateCheck};
use crate::engine::{AppliedService, Engine};
use crate::error::AccError;

/// Variable that must be non-empty for live acceptance tests to run.
pub const TF_ACC: &str = "TF_ACC";

pub type PreCheck = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

pub struct TestStep {
    pub config: ServiceConfig,
    pub check: ComposeCheck,
}

/// An apply → check → destroy → check-destroy lifecycle.
#[derive(Default)]
pub struct TestCase {
    pub pre_check: Option<PreCheck>,
    pub steps: Vec<TestStep>,
    pub check_destroy: Option<Box<dyn DestroyCheck>>,
}

impl TestCase {
    /// One step applying `config`, checked with [`ServiceExists`] then
    /// [`GcsAttributes`] (plus `extra`), destroyed and verified gone.
    pub fn gcs_logging(config: ServiceConfig, gcs_name: &str, extra: Vec<Box<dyn StateCheck>>) -> Self {
        let mut checks: Vec<Box<dyn StateCheck>> = vec![
            Box::new(ServiceExists),
            Box::new(GcsAttributes::new(config.name.clone(), gcs_name)),
        ];
        checks.extend(extra);
        Self {
            pre_check: None,
            steps: vec![TestStep { config, check: compose(checks) }],
            check_destroy: Some(Box::new(ServiceDestroyed)),
        }
    }

    pub fn with_pre_check(mut self, pre_check: PreCheck) -> Self {
        self.pre_check = Some(pre_check);
        self
    }
}

/// True when `TF_ACC` is set to a non-empty value.
pub fn acceptance_enabled() -> bool {
    std::env::var(TF_ACC).map(|v| !v.is_empty()).unwrap_or(false)
}

/// Pre-check that the provider has an API key to work with.
pub fn provider_pre_check(config: &ProviderConfig) -> PreCheck {
    let has_key = !config.api_key.trim().is_empty();
    Box::new(move || {
        if has_key {
            Ok(())
        } else {
            Err(format!("{} must be set for acceptance tests", FASTLY_API_KEY))
        }
    })
}

/// Run `case` to completion.
///
/// Everything applied is destroyed even when a step fails. The destroy check
/// only runs when something was applied and every destroy succeeded. The first
/// error wins; nothing is retried.
pub async fn run_case(case: TestCase, engine: &dyn Engine, client: &FastlyClient) -> Result<(), AccError> {
    if let Some(pre_check) = &case.pre_check {
        pre_check().map_err(AccError::PreCheck)?;
    }

    let mut applied: Vec<AppliedService> = Vec::new();
    let mut first_err: Option<AccError> = None;

    for (i, step) in case.steps.iter().enumerate() {
        let step_no = i + 1;
        debug!(step = step_no, engine = engine.name(), "config:\n{}", engine.render(&step.config));

        let service = match engine.apply(&step.config).await {
            Ok(s) => s,
            Err(e) => {
                first_err = Some(AccError::Apply { step: step_no, source: e });
                break;
            }
        };
        info!(step = step_no, service_id = %service.id, "applied");
        if !applied.iter().any(|a| a.id == service.id) {
            applied.push(service.clone());
        }

        let mut ctx = CheckContext::new(client, &service);
        if let Err(e) = step.check.check(&mut ctx).await {
            warn!(step = step_no, error = %e, "check failed");
            first_err = Some(AccError::Check { step: step_no, source: e });
            break;
        }
    }

    let mut destroy_failed = false;
    for service in applied.iter().rev() {
        if let Err(e) = engine.destroy(service).await {
            warn!(service_id = %service.id, error = %e, "destroy failed");
            destroy_failed = true;
            first_err.get_or_insert(AccError::Destroy(e));
        }
    }

    if !destroy_failed && !applied.is_empty() {
        if let Some(check_destroy) = &case.check_destroy {
            if let Err(e) = check_destroy.check_destroyed(client, &applied).await {
                first_err.get_or_insert(AccError::CheckDestroy(e));
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_check_requires_api_key() {
        let ok = provider_pre_check(&ProviderConfig::new("key", "http://localhost"));
        assert!(ok().is_ok());

        let missing = provider_pre_check(&ProviderConfig::new(" ", "http://localhost"));
        assert!(missing().unwrap_err().contains(FASTLY_API_KEY));
    }
}
