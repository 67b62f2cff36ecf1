use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::assume_role::{
    AssumeRoleError, RoleAssumptionRequest, SessionProvider, TemporaryCredentials,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleOutput {
    credentials: CredentialsOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsOutput {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

/// Session provider that shells out to `aws sts assume-role`
pub struct AwsCliSessionProvider {
    program: String,
    leading_args: Vec<String>,
}

impl AwsCliSessionProvider {
    /// Create a provider running the given AWS CLI program (usually `aws`)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before `sts assume-role`, for wrappers such as `aws-vault exec <profile> -- aws`
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments for `aws sts assume-role`
    pub fn command_args(request: &RoleAssumptionRequest) -> Vec<String> {
        let mut args = vec![
            "sts".to_string(),
            "assume-role".to_string(),
            "--role-arn".to_string(),
            request.role_arn().to_string(),
            "--role-session-name".to_string(),
            request.session_name().to_string(),
        ];

        if let Some(tags) = request.tags() {
            args.push("--tags".to_string());
            args.push(tags.to_cli_argument());
        }

        args
    }
}

/// Parse the JSON printed by `aws sts assume-role`
///
/// Output that is not JSON at all is unexpected; JSON without the
/// `Credentials` fields is a malformed response.
pub(crate) fn parse_response(stdout: &[u8]) -> Result<TemporaryCredentials, AssumeRoleError> {
    let value: serde_json::Value =
        serde_json::from_slice(stdout).context("Failed to parse AWS CLI output as JSON")?;

    let output: AssumeRoleOutput = serde_json::from_value(value).map_err(|e| {
        debug!("AWS CLI response is missing credentials: {}", e);
        AssumeRoleError::MalformedResponse
    })?;

    Ok(TemporaryCredentials::new(
        output.credentials.access_key_id,
        output.credentials.secret_access_key,
        output.credentials.session_token,
    ))
}

#[async_trait]
impl SessionProvider for AwsCliSessionProvider {
    async fn assume_role(
        &self,
        request: &RoleAssumptionRequest,
    ) -> Result<TemporaryCredentials, AssumeRoleError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).args(Self::command_args(request));

        debug!("Executing command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{} exited with status: {}", self.program, output.status);
            return Err(AssumeRoleError::CallFailed(stderr.trim_end().to_string()));
        }

        parse_response(&output.stdout)
    }

    fn provider_name(&self) -> &str {
        "aws-cli"
    }
}
