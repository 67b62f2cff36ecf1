use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::sandbox::STACK_NAME;

/// Region used when neither `CDK_DEFAULT_REGION` nor a config file names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings shared by the helper binaries
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// AWS region for STS and CloudFormation calls
    pub region: String,

    /// Name of the deployed sandbox stack
    pub stack_name: String,

    /// Exit with a non-zero status when the helper's operation fails.
    /// Off by default: existing scripts only inspect printed text.
    #[serde(default)]
    pub strict_exit: bool,

    /// AWS CLI program used by the subprocess session provider
    pub aws_cli: String,
}

impl Settings {
    /// Load settings from defaults, `playground.toml`, `PLAYGROUND_*` and `CDK_DEFAULT_REGION`
    ///
    /// The config file path can be changed with `PLAYGROUND_CONFIG`; the file is optional.
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = env::var("PLAYGROUND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("playground.toml"));

        Self::build(
            &config_file,
            Environment::with_prefix("PLAYGROUND"),
            env::var("CDK_DEFAULT_REGION").ok(),
        )
    }

    /// Assemble settings from explicit sources, later sources winning
    pub fn build(
        config_file: &Path,
        environment: Environment,
        region_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("region", DEFAULT_REGION)?
            .set_default("stack_name", STACK_NAME)?
            .set_default("strict_exit", false)?
            .set_default("aws_cli", "aws")?
            .add_source(File::from(config_file).required(false))
            .add_source(environment.try_parsing(true))
            // CDK's own variable takes precedence so the helpers follow the deployed region
            .set_override_option("region", region_override.filter(|r| !r.is_empty()))?
            .build()?
            .try_deserialize()
    }
}
