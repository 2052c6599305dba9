use std::path::PathBuf;

use anyhow::{Context, Result};
use fastly_tf_acctest::template::{service_config_gcs, service_config_gcs_env, RESOURCE_NAME};
use fastly_tf_acctest::{
    names, provider_pre_check, run_case, ApiEngine, GcsUser, StateCheck, TerraformEngine, TestCase,
};
use fastly_tf_client::{FastlyClient, ListGcssInput};
use fastly_tf_config::{load_provider_config, ProviderConfig};
use fastly_tf_domain::{flatten_gcs, render_service, GcsEnv, ServiceConfig};
use tracing::info;

use crate::cli::{EngineArg, FlattenOutput, Scenario};
use crate::output;

// ── Flatten ───────────────────────────────────────────────────────────────────

pub async fn flatten(
    config: Option<PathBuf>,
    service: String,
    version: Option<u32>,
    format: FlattenOutput,
) -> Result<()> {
    let provider = load_provider(config)?;
    let client = FastlyClient::new(&provider).context("Failed to build API client")?;

    let version = match version {
        Some(v) => v,
        None => {
            let detail = client
                .get_service_details(&service)
                .await
                .with_context(|| format!("Failed to look up service {service}"))?;
            detail.active_version_number()
        }
    };
    if version == 0 {
        anyhow::bail!("service {service} has no active version; pass --version");
    }

    let gcss = client
        .list_gcss(&ListGcssInput { service: service.clone(), version })
        .await
        .with_context(|| format!("Failed to list GCS endpoints for {service} version {version}"))?;
    let flat = flatten_gcs(&gcss);

    match format {
        FlattenOutput::Json => println!("{}", serde_json::to_string_pretty(&flat)?),
        FlattenOutput::Text => print!("{}", output::render_flat(&flat)),
    }
    Ok(())
}

// ── Render ────────────────────────────────────────────────────────────────────

pub fn render(scenario: Scenario, name: Option<String>, gcs_name: Option<String>) -> Result<()> {
    let name = name.unwrap_or_else(names::service_name);
    let gcs_name = gcs_name.unwrap_or_else(names::gcs_name);
    let config = scenario_config(scenario, &name, &gcs_name);
    config.validate().context("Scenario configuration is invalid")?;
    print!("{}", render_service(RESOURCE_NAME, &config));
    Ok(())
}

// ── Test ──────────────────────────────────────────────────────────────────────

pub async fn test(
    config: Option<PathBuf>,
    scenario: Scenario,
    engine: EngineArg,
    terraform_bin: String,
    workspace: Option<PathBuf>,
    gcs_env: Option<String>,
) -> Result<()> {
    let provider = with_gcs_override(load_provider(config)?, gcs_env.as_deref());
    let client = FastlyClient::new(&provider).context("Failed to build API client")?;

    let name = names::service_name();
    let gcs_name = names::gcs_name();
    let mut extra: Vec<Box<dyn StateCheck>> = Vec::new();
    if let (Scenario::GcsEnv, Some(email)) = (scenario, provider.gcs.email.clone()) {
        extra.push(Box::new(GcsUser { gcs_name: gcs_name.clone(), email }));
    }
    let case = TestCase::gcs_logging(scenario_config(scenario, &name, &gcs_name), &gcs_name, extra)
        .with_pre_check(provider_pre_check(&provider));

    info!(scenario = scenario.as_str(), service = %name, "running scenario");
    match engine {
        EngineArg::Api => {
            let engine = ApiEngine::new(client.clone(), provider.gcs.clone());
            run_case(case, &engine, &client)
                .await
                .with_context(|| format!("Scenario {} failed", scenario.as_str()))?;
        }
        EngineArg::Terraform => {
            let root = workspace.unwrap_or_else(|| std::env::temp_dir().join("fastly-acc"));
            let engine = TerraformEngine::new(terraform_bin, root, provider.clone());
            let result = run_case(case, &engine, &client).await;
            print!("{}", output::render_runs(&engine.runs()));
            result.with_context(|| format!("Scenario {} failed", scenario.as_str()))?;
        }
    }

    println!("PASS {} ({})", scenario.as_str(), name);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_provider(config: Option<PathBuf>) -> Result<ProviderConfig> {
    match &config {
        Some(path) => load_provider_config(Some(path.as_path()))
            .with_context(|| format!("Failed to load provider config from {}", path.display())),
        None => load_provider_config(None).context("Failed to load provider config from environment"),
    }
}

/// Both fallback credentials set to `value`, leaving the process environment alone.
fn with_gcs_override(mut provider: ProviderConfig, value: Option<&str>) -> ProviderConfig {
    if let Some(value) = value {
        provider.gcs = GcsEnv::new(value, value);
    }
    provider
}

fn scenario_config(scenario: Scenario, name: &str, gcs_name: &str) -> ServiceConfig {
    match scenario {
        Scenario::Gcs => service_config_gcs(name, gcs_name),
        Scenario::GcsEnv => service_config_gcs_env(name, gcs_name),
    }
}
