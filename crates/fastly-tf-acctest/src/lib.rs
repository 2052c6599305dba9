pub mod api_engine;
pub mod case;
pub mod check;
pub mod engine;
pub mod env;
pub mod error;
pub mod names;
pub mod template;
pub mod terraform;

pub use api_engine::ApiEngine;
pub use case::{acceptance_enabled, provider_pre_check, run_case, PreCheck, TestCase, TestStep};
pub use check::{
    compose, CheckContext, ComposeCheck, DestroyCheck, GcsAttributes, GcsUser, ServiceDestroyed,
    ServiceExists, StateCheck,
};
pub use engine::{AppliedService, Engine};
pub use env::{EnvGuard, GcsEnvGuard};
pub use error::{AccError, CheckError, EngineError, EnvError};
pub use terraform::{ApplyOperation, ApplyRun, ApplyRunStatus, TerraformEngine};
