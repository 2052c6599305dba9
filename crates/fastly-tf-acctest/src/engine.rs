use async_trait::async_trait;
use fastly_tf_domain::ServiceConfig;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::template::RESOURCE_NAME;

/// What an engine reports back after a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedService {
    pub id: String,
    pub name: String,
    /// Version that was activated by the apply.
    pub version: u32,
    pub force_destroy: bool,
}

/// The orchestration capabilities an acceptance test needs.
///
/// Implementations own the apply/destroy lifecycle; the harness only renders,
/// applies, checks remote state through the API client, and destroys.
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    /// The configuration document this engine would apply for `config`.
    fn render(&self, config: &ServiceConfig) -> String {
        config.to_hcl(RESOURCE_NAME)
    }

    async fn apply(&self, config: &ServiceConfig) -> Result<AppliedService, EngineError>;

    async fn destroy(&self, applied: &AppliedService) -> Result<(), EngineError>;
}
