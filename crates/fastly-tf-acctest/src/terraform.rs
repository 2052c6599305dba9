use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fastly_tf_config::{ProviderConfig, FASTLY_API_KEY, FASTLY_API_URL};
use fastly_tf_domain::{hcl::SERVICE_RESOURCE_TYPE, ServiceConfig};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{AppliedService, Engine};
use crate::error::EngineError;
use crate::template::RESOURCE_NAME;

/// Default hard limit for a single terraform sub-command.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Provider releases from 1.0 on no longer ship `fastly_service_v1`.
pub const DEFAULT_PROVIDER_VERSION: &str = "< 1.0.0";

// ── Run records ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOperation {
    Apply,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyRunStatus {
    Succeeded,
    Failed,
}

/// Combined output of one apply or destroy, kept for post-mortem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRun {
    pub id: Uuid,
    pub service: String,
    pub operation: ApplyOperation,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: ApplyRunStatus,
    pub exit_code: Option<i32>,
    pub log: String,
}

// ── TerraformEngine ───────────────────────────────────────────────────────────

/// Drives the `terraform` (or `tofu`) binary against a generated workspace.
///
/// - One workspace per service under `workspace_root/<service name>/`
/// - `main.tf` holds the provider requirements, the rendered resource and
///   the outputs the harness reads back
/// - API credentials and the GCS fallback reach the provider through the
///   subprocess environment, never through files
pub struct TerraformEngine {
    binary: String,
    workspace_root: PathBuf,
    provider: ProviderConfig,
    provider_version: String,
    timeout: Duration,
    runs: Mutex<Vec<ApplyRun>>,
}

impl TerraformEngine {
    pub fn new(binary: impl Into<String>, workspace_root: impl Into<PathBuf>, provider: ProviderConfig) -> Self {
        Self {
            binary: binary.into(),
            workspace_root: workspace_root.into(),
            provider,
            provider_version: DEFAULT_PROVIDER_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Per sub-command time limit; the child is killed when it expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Version constraint for the `fastly/fastly` provider in `main.tf`.
    pub fn with_provider_version(mut self, constraint: impl Into<String>) -> Self {
        self.provider_version = constraint.into();
        self
    }

    /// Every apply/destroy recorded so far, oldest first.
    pub fn runs(&self) -> Vec<ApplyRun> {
        self.runs.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn workspace_dir(&self, service_name: &str) -> PathBuf {
        self.workspace_root.join(workspace_name(service_name))
    }

    fn auth_env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            (FASTLY_API_KEY, self.provider.api_key.clone()),
            (FASTLY_API_URL, self.provider.base_url.clone()),
        ];
        env.extend(self.provider.gcs.vars());
        env
    }

    // ── Process execution ─────────────────────────────────────────────────────

    /// Run a terraform sub-command, capturing combined stdout+stderr.
    /// Returns (exit_code, combined_log).
    async fn run_tf(&self, workspace: &Path, args: &[&str]) -> Result<(i32, String), EngineError> {
        let binary = self.binary.as_str();
        info!(binary, ?args, workspace = %workspace.display(), "running terraform command");

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(workspace)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(self.auth_env())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::Internal(format!("spawn {}: {}", binary, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Internal("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Internal("stderr not captured".into()))?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

        let tx1 = tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx1.send(line);
            }
        });

        let tx2 = tx.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx2.send(line);
            }
        });

        drop(tx);

        let mut log = String::new();
        let collect = async {
            while let Some(line) = rx.recv().await {
                debug!(target: "fastly_tf::terraform", "{}", line);
                log.push_str(&line);
                log.push('\n');
            }
        };
        let timed_out = tokio::time::timeout(self.timeout, collect).await.is_err();

        if timed_out {
            // Grandchildren can keep the pipes open; never join the readers here.
            stdout_task.abort();
            stderr_task.abort();
            if let Err(e) = child.kill().await {
                warn!(binary, error = %e, "failed to kill timed out terraform");
            }
            return Err(EngineError::Internal(format!(
                "{} {} timed out after {}s",
                binary,
                args.first().copied().unwrap_or(""),
                self.timeout.as_secs(),
            )));
        }

        stdout_task.await.ok();
        stderr_task.await.ok();

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::Internal(format!("wait {}: {}", binary, e)))?;

        let code = status.code().unwrap_or(-1);
        if code != 0 {
            warn!(binary, code, "terraform exited non-zero");
        }
        Ok((code, log))
    }

    /// Run `terraform output -json` and pull out the service id and version.
    async fn read_outputs(&self, workspace: &Path) -> Result<(String, u32), EngineError> {
        let (exit, out_json) = self.run_tf(workspace, &["output", "-json", "-no-color"]).await?;
        if exit != 0 {
            return Err(EngineError::ApplyFailed(format!(
                "terraform output exited with code {}",
                exit
            )));
        }
        parse_outputs(&out_json)
    }

    /// Best-effort destroy after a failed apply; the harness never sees a
    /// service id for it.
    async fn destroy_partial(&self, workspace: &Path, service: &str) {
        let started_at = Utc::now();
        match self.run_tf(workspace, &["destroy", "-auto-approve", "-no-color"]).await {
            Ok((code, output)) => {
                if code != 0 {
                    warn!(service, code, "destroy after failed apply exited non-zero");
                }
                let log = format!("=== terraform destroy (partial) ===\n{}", output);
                self.record_run(service, ApplyOperation::Destroy, started_at, log, Some(code));
            }
            Err(e) => warn!(service, error = %e, "destroy after failed apply did not run"),
        }
    }

    fn record_run(
        &self,
        service: &str,
        operation: ApplyOperation,
        started_at: DateTime<Utc>,
        log: String,
        exit_code: Option<i32>,
    ) {
        let status = match exit_code {
            Some(0) => ApplyRunStatus::Succeeded,
            _ => ApplyRunStatus::Failed,
        };
        let run = ApplyRun {
            id: Uuid::new_v4(),
            service: service.to_string(),
            operation,
            started_at,
            finished_at: Utc::now(),
            status,
            exit_code,
            log,
        };
        match self.runs.lock() {
            Ok(mut runs) => runs.push(run),
            Err(_) => warn!("run log lock poisoned; dropping run record"),
        }
    }
}

#[async_trait]
impl Engine for TerraformEngine {
    fn name(&self) -> &'static str {
        "terraform"
    }

    async fn apply(&self, config: &ServiceConfig) -> Result<AppliedService, EngineError> {
        config.validate()?;
        let started_at = Utc::now();
        let workspace = self.workspace_dir(&config.name);

        tokio::fs::create_dir_all(&workspace)
            .await
            .map_err(|e| EngineError::Internal(format!("create workspace dir: {}", e)))?;
        tokio::fs::write(workspace.join("main.tf"), main_tf(&self.render(config), &self.provider_version))
            .await
            .map_err(|e| EngineError::Internal(format!("write main.tf: {}", e)))?;

        let mut log = String::new();

        let (init_exit, init_output) = match self.run_tf(&workspace, &["init", "-no-color"]).await {
            Ok(out) => out,
            Err(e) => {
                self.record_run(&config.name, ApplyOperation::Apply, started_at, e.to_string(), Some(1));
                return Err(e);
            }
        };
        log.push_str("=== terraform init ===\n");
        log.push_str(&init_output);
        if init_exit != 0 {
            self.record_run(&config.name, ApplyOperation::Apply, started_at, log, Some(init_exit));
            return Err(EngineError::ApplyFailed(format!(
                "terraform init exited with code {}",
                init_exit
            )));
        }

        let apply = self
            .run_tf(&workspace, &["apply", "-auto-approve", "-no-color"])
            .await;
        let (apply_exit, apply_output) = match apply {
            Ok(out) => out,
            Err(e) => {
                log.push_str("\n=== terraform apply ===\n");
                log.push_str(&e.to_string());
                self.record_run(&config.name, ApplyOperation::Apply, started_at, log, Some(1));
                return Err(e);
            }
        };
        log.push_str("\n=== terraform apply ===\n");
        log.push_str(&apply_output);
        if apply_exit != 0 {
            self.record_run(&config.name, ApplyOperation::Apply, started_at, log, Some(apply_exit));
            self.destroy_partial(&workspace, &config.name).await;
            return Err(EngineError::ApplyFailed(format!(
                "terraform apply exited with code {}",
                apply_exit
            )));
        }

        let (id, version) = self.read_outputs(&workspace).await?;
        self.record_run(&config.name, ApplyOperation::Apply, started_at, log, Some(0));

        Ok(AppliedService {
            id,
            name: config.name.clone(),
            version,
            force_destroy: config.force_destroy,
        })
    }

    async fn destroy(&self, applied: &AppliedService) -> Result<(), EngineError> {
        let workspace = self.workspace_dir(&applied.name);
        if !workspace.exists() {
            debug!(service = %applied.name, "no workspace found; nothing to destroy");
            return Ok(());
        }
        let started_at = Utc::now();

        let (exit_code, output) = match self
            .run_tf(&workspace, &["destroy", "-auto-approve", "-no-color"])
            .await
        {
            Ok(out) => out,
            Err(e) => {
                self.record_run(&applied.name, ApplyOperation::Destroy, started_at, e.to_string(), Some(1));
                return Err(EngineError::DestroyFailed(e.to_string()));
            }
        };

        let log = format!("=== terraform destroy ===\n{}", output);
        self.record_run(&applied.name, ApplyOperation::Destroy, started_at, log, Some(exit_code));
        if exit_code != 0 {
            return Err(EngineError::DestroyFailed(format!(
                "terraform destroy exited with code {}",
                exit_code
            )));
        }
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Directory-safe form of a service name.
fn workspace_name(service_name: &str) -> String {
    service_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Full `main.tf`: provider requirements, the resource, and harness outputs.
fn main_tf(resource: &str, provider_version: &str) -> String {
    let mut hcl = String::from("# Generated by fastly-tf acceptance harness; do not edit\n");
    hcl.push_str("terraform {\n");
    hcl.push_str("  required_providers {\n");
    hcl.push_str("    fastly = {\n      source  = \"fastly/fastly\"\n");
    hcl.push_str(&format!("      version = \"{}\"\n    }}\n", provider_version));
    hcl.push_str("  }\n}\n\n");
    hcl.push_str("provider \"fastly\" {}\n\n");
    hcl.push_str(resource);
    hcl.push('\n');
    hcl.push_str(&format!(
        "output \"service_id\" {{ value = {}.{}.id }}\n",
        SERVICE_RESOURCE_TYPE, RESOURCE_NAME
    ));
    hcl.push_str(&format!(
        "output \"active_version\" {{ value = {}.{}.active_version }}\n",
        SERVICE_RESOURCE_TYPE, RESOURCE_NAME
    ));
    hcl
}

fn parse_outputs(out_json: &str) -> Result<(String, u32), EngineError> {
    let map: serde_json::Value = serde_json::from_str(out_json.trim())
        .map_err(|e| EngineError::ApplyFailed(format!("parse terraform output: {}", e)))?;

    let id = map
        .get("service_id")
        .and_then(|v| v.get("value"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::ApplyFailed("output 'service_id' missing from terraform output".into()))?;

    let version = match map.get("active_version").and_then(|v| v.get("value")) {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    };
    let version = u32::try_from(version)
        .map_err(|_| EngineError::ApplyFailed(format!("active_version {} out of range", version)))?;

    Ok((id.to_string(), version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::service_config_gcs;
    use fastly_tf_domain::GcsEnv;

    fn provider() -> ProviderConfig {
        let mut cfg = ProviderConfig::new("fake-key", "http://127.0.0.1:1");
        cfg.gcs = GcsEnv::new("someEnv", "someEnv");
        cfg
    }

    #[test]
    fn workspace_name_replaces_unsafe_characters() {
        assert_eq!(workspace_name("tf-test-abc"), "tf-test-abc");
        assert_eq!(workspace_name("gcs a/b c"), "gcs_a_b_c");
    }

    #[test]
    fn main_tf_declares_provider_resource_and_outputs() {
        let tf = main_tf("resource \"fastly_service_v1\" \"foo\" {}\n", DEFAULT_PROVIDER_VERSION);
        assert!(tf.contains("source  = \"fastly/fastly\""));
        assert!(tf.contains("version = \"< 1.0.0\""));
        assert!(tf.contains("provider \"fastly\" {}"));
        assert!(tf.contains("output \"service_id\" { value = fastly_service_v1.foo.id }"));
        assert!(tf.contains("output \"active_version\" { value = fastly_service_v1.foo.active_version }"));
    }

    #[test]
    fn parse_outputs_reads_id_and_version() {
        let (id, v) = parse_outputs(
            r#"{"service_id":{"sensitive":false,"type":"string","value":"svc-1"},"active_version":{"value":3}}"#,
        )
        .unwrap();
        assert_eq!(id, "svc-1");
        assert_eq!(v, 3);
    }

    #[test]
    fn parse_outputs_requires_service_id() {
        let err = parse_outputs(r#"{"active_version":{"value":1}}"#).unwrap_err();
        assert!(err.to_string().contains("service_id"));
    }

    #[test]
    fn auth_env_carries_key_url_and_gcs_fallback() {
        let engine = TerraformEngine::new("terraform", "/tmp", provider());
        let env = engine.auth_env();
        assert!(env.contains(&(FASTLY_API_KEY, "fake-key".to_string())));
        assert!(env.contains(&(FASTLY_API_URL, "http://127.0.0.1:1".to_string())));
        assert!(env.contains(&("FASTLY_GCS_EMAIL", "someEnv".to_string())));
        assert!(env.contains(&("FASTLY_GCS_SECRET_KEY", "someEnv".to_string())));
    }

    #[tokio::test]
    async fn destroy_without_workspace_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let engine = TerraformEngine::new("terraform", root.path(), provider());
        let applied = AppliedService {
            id: "svc".into(),
            name: "tf-test-never-applied".into(),
            version: 1,
            force_destroy: true,
        };
        engine.destroy(&applied).await.unwrap();
        assert!(engine.runs().is_empty());
    }

    #[cfg(unix)]
    fn fake_terraform(dir: &Path, apply_exit: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\n\
             case \"$1\" in\n\
             output) echo '{{\"service_id\":{{\"value\":\"svc-123\"}},\"active_version\":{{\"value\":1}}}}' ;;\n\
             apply) echo \"key=$FASTLY_API_KEY email=$FASTLY_GCS_EMAIL\"; echo 'apply stderr' >&2; exit {} ;;\n\
             *) echo \"ran $1\" ;;\n\
             esac\n",
            apply_exit
        );
        let path = dir.join("fake-terraform");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_runs_binary_and_records_log() {
        let bin_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let binary = fake_terraform(bin_dir.path(), 0);
        let engine = TerraformEngine::new(binary.display().to_string(), root.path(), provider());

        let cfg = service_config_gcs("tf-test-fake", "gcs fake");
        let applied = engine.apply(&cfg).await.unwrap();
        assert_eq!(applied.id, "svc-123");
        assert_eq!(applied.version, 1);

        let main = std::fs::read_to_string(engine.workspace_dir("tf-test-fake").join("main.tf")).unwrap();
        assert!(main.contains("gcslogging {"));

        let runs = engine.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, ApplyRunStatus::Succeeded);
        assert!(runs[0].log.contains("=== terraform init ==="));
        assert!(runs[0].log.contains("key=fake-key email=someEnv"));
        assert!(runs[0].log.contains("apply stderr"));

        engine.destroy(&applied).await.unwrap();
        assert_eq!(engine.runs()[1].operation, ApplyOperation::Destroy);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_apply_is_reported_and_recorded() {
        let bin_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let binary = fake_terraform(bin_dir.path(), 1);
        let engine = TerraformEngine::new(binary.display().to_string(), root.path(), provider());

        let err = engine
            .apply(&service_config_gcs("tf-test-fail", "gcs fail"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ApplyFailed(_)));
        assert!(err.to_string().contains("exited with code 1"));

        let runs = engine.runs();
        assert_eq!(runs[0].status, ApplyRunStatus::Failed);
        assert_eq!(runs[0].exit_code, Some(1));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].operation, ApplyOperation::Destroy);
        assert!(runs[1].log.contains("ran destroy"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_command_is_killed_at_the_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let binary = bin_dir.path().join("hung-terraform");
        std::fs::write(&binary, "#!/bin/sh\necho start\nsleep 30\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = TerraformEngine::new(binary.display().to_string(), root.path(), provider())
            .with_timeout(Duration::from_secs(1));

        let started = std::time::Instant::now();
        let err = engine
            .apply(&service_config_gcs("tf-test-hung", "gcs hung"))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
        assert!(err.to_string().contains("init timed out after 1s"), "{}", err);
        assert_eq!(engine.runs()[0].status, ApplyRunStatus::Failed);
    }
}
