use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fastly-acc",
    about = "Acceptance tooling for the Fastly service gcslogging attribute",
    version
)]
pub struct Cli {
    /// YAML provider settings; environment variables override its values.
    #[arg(long, env = "FASTLY_TF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the GCS logging endpoints of a service version and flatten them.
    Flatten {
        /// Service id.
        #[arg(long)]
        service: String,

        /// Service version; defaults to the active version.
        #[arg(long)]
        version: Option<u32>,

        /// Output format.
        #[arg(long, default_value = "json")]
        output: FlattenOutput,
    },

    /// Print the configuration document for a scenario.
    Render {
        #[arg(long, default_value = "gcs")]
        scenario: Scenario,

        /// Service name; random `tf-test-…` when omitted.
        #[arg(long)]
        name: Option<String>,

        /// Logging endpoint name; random `gcs …` when omitted.
        #[arg(long)]
        gcs_name: Option<String>,
    },

    /// Run an acceptance scenario: apply, check, destroy, check destroy.
    Test {
        #[arg(long, default_value = "gcs")]
        scenario: Scenario,

        /// How the configuration is applied.
        #[arg(long, default_value = "api")]
        engine: EngineArg,

        /// Terraform (or OpenTofu) binary for `--engine terraform`.
        #[arg(long, env = "TF_ACC_TERRAFORM_PATH", default_value = "terraform")]
        terraform_bin: String,

        /// Root for per-service terraform workspaces.
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Use this value for both GCS fallback credentials instead of
        /// FASTLY_GCS_EMAIL and FASTLY_GCS_SECRET_KEY.
        #[arg(long)]
        gcs_env: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Credentials written into the block.
    Gcs,
    /// Credentials taken from the environment fallback.
    GcsEnv,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Gcs => "gcs",
            Scenario::GcsEnv => "gcs-env",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EngineArg {
    Api,
    Terraform,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlattenOutput {
    Json,
    Text,
}
