use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudformation::types::Output;
use aws_sdk_cloudformation::Client as CloudFormationClient;
use tracing::debug;

use super::{DeploymentOutput, StackDescriber};
use crate::aws::{format_service_error, load_sdk_config};

/// Stack describer backed by CloudFormation `DescribeStacks`
pub struct CloudFormationStackDescriber {
    client: CloudFormationClient,
}

impl CloudFormationStackDescriber {
    /// Create a describer using the default credential chain in the given region
    pub async fn new(region: &str) -> Self {
        let config = load_sdk_config(region).await;
        Self::from_client(CloudFormationClient::new(&config))
    }

    pub fn from_client(client: CloudFormationClient) -> Self {
        Self { client }
    }
}

/// Convert a CloudFormation output, which must carry both key and value
fn deployment_output(output: &Output) -> Result<DeploymentOutput> {
    let key = output
        .output_key()
        .context("Stack output is missing OutputKey")?;
    let value = output
        .output_value()
        .with_context(|| format!("Stack output '{}' is missing OutputValue", key))?;
    Ok(DeploymentOutput::new(key, value))
}

#[async_trait]
impl StackDescriber for CloudFormationStackDescriber {
    async fn describe_outputs(&self, stack_name: &str) -> Result<Vec<DeploymentOutput>> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|err| anyhow!("{}", format_service_error(&err)))?;

        let stack = response
            .stacks()
            .first()
            .with_context(|| format!("Stack '{}' not found", stack_name))?;

        debug!("Stack {} status: {:?}", stack_name, stack.stack_status());

        stack.outputs().iter().map(deployment_output).collect()
    }
}
