use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_sts::types::Tag;
use aws_sdk_sts::Client as StsClient;
use tracing::debug;

use crate::assume_role::{
    AssumeRoleError, RoleAssumptionRequest, SessionProvider, SessionTags, TemporaryCredentials,
};
use crate::aws::{format_service_error, load_sdk_config};

/// Session provider calling STS `AssumeRole` through the AWS SDK
pub struct StsSessionProvider {
    client: StsClient,
}

impl StsSessionProvider {
    /// Create a provider using the default credential chain in the given region
    pub async fn new(region: &str) -> Self {
        let config = load_sdk_config(region).await;
        Self::from_client(StsClient::new(&config))
    }

    pub fn from_client(client: StsClient) -> Self {
        Self { client }
    }
}

/// Convert session tags into STS `Tag` values
fn sts_tags(tags: &SessionTags) -> anyhow::Result<Vec<Tag>> {
    tags.iter()
        .map(|(key, value)| {
            Tag::builder()
                .key(key)
                .value(value)
                .build()
                .with_context(|| format!("Invalid session tag '{}'", key))
        })
        .collect()
}

#[async_trait]
impl SessionProvider for StsSessionProvider {
    async fn assume_role(
        &self,
        request: &RoleAssumptionRequest,
    ) -> Result<TemporaryCredentials, AssumeRoleError> {
        let tags = match request.tags() {
            Some(tags) => Some(sts_tags(tags)?),
            None => None,
        };

        debug!("Calling STS AssumeRole for {}", request.role_arn());

        let response = self
            .client
            .assume_role()
            .role_arn(request.role_arn())
            .role_session_name(request.session_name())
            .set_tags(tags)
            .send()
            .await
            .map_err(|err| AssumeRoleError::CallFailed(format_service_error(&err)))?;

        let credentials = response
            .credentials()
            .ok_or(AssumeRoleError::MalformedResponse)?;

        Ok(TemporaryCredentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token(),
        ))
    }

    fn provider_name(&self) -> &str {
        "aws-sdk-sts"
    }
}
