pub mod providers;

use std::fmt;
use std::io::{self, Write};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use config::ConfigError;
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::Settings;

/// Errors reported by a [`SessionProvider`]
///
/// The `Display` text is exactly what the helper prints to stderr.
#[derive(Debug, Error)]
pub enum AssumeRoleError {
    /// The identity service rejected the call (bad role ARN, missing permissions, ...)
    #[error("Error assuming role: {0}")]
    CallFailed(String),

    /// The call succeeded but the credentials were not in the response
    #[error("Error: Malformed response from AWS CLI. Check your AWS CLI configuration and permissions.")]
    MalformedResponse,

    #[error("An unexpected error occurred: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

/// Session tags in insertion order
///
/// Inserting a key that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTags {
    entries: Vec<(String, String)>,
}

impl SessionTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as the single `--tags` argument of `aws sts assume-role`
    ///
    /// # Example
    /// `{project: demo, env: testing}` becomes `Key=project,Value=demo,Key=env,Value=testing`
    pub fn to_cli_argument(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("Key={},Value={}", key, value))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<(String, String)> for SessionTags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut tags = SessionTags::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }
        tags
    }
}

/// Generate a session name from a wall-clock timestamp: `session_YYYYMMDDHHMMSS`
pub fn session_name_at(now: NaiveDateTime) -> String {
    format!("session_{}", now.format("%Y%m%d%H%M%S"))
}

/// A request to exchange a role ARN for temporary credentials
#[derive(Debug, Clone)]
pub struct RoleAssumptionRequest {
    role_arn: String,
    session_name: String,
    tags: Option<SessionTags>,
}

impl RoleAssumptionRequest {
    /// Build a request, generating the session name from the local clock if none is given
    pub fn new(
        role_arn: String,
        session_name: Option<String>,
        tags: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self::with_clock(role_arn, session_name, tags, Local::now().naive_local())
    }

    /// Same as [`RoleAssumptionRequest::new`] with an explicit clock reading
    pub fn with_clock(
        role_arn: String,
        session_name: Option<String>,
        tags: impl IntoIterator<Item = (String, String)>,
        now: NaiveDateTime,
    ) -> Self {
        // An empty name counts as absent
        let session_name = session_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| session_name_at(now));

        let tags: SessionTags = tags.into_iter().collect();

        Self {
            role_arn,
            session_name,
            tags: if tags.is_empty() { None } else { Some(tags) },
        }
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Session tags, `None` when no tag was supplied
    pub fn tags(&self) -> Option<&SessionTags> {
        self.tags.as_ref()
    }
}

/// Short-lived credentials returned by the identity service
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl TemporaryCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }

    /// Write the credentials as shell `export` statements, one per line
    pub fn write_exports<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "export AWS_ACCESS_KEY_ID={}", self.access_key_id)?;
        writeln!(out, "export AWS_SECRET_ACCESS_KEY={}", self.secret_access_key)?;
        writeln!(out, "export AWS_SESSION_TOKEN={}", self.session_token)?;
        Ok(())
    }
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Capability to assume an IAM role
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Exchange the request's role ARN for temporary credentials
    async fn assume_role(
        &self,
        request: &RoleAssumptionRequest,
    ) -> Result<TemporaryCredentials, AssumeRoleError>;

    /// Get provider name for logging
    fn provider_name(&self) -> &str;
}

/// Assume the role and print the result
///
/// Credentials go to `out` as three `export` lines; any failure is printed to `err`
/// and reported through the returned flag rather than as an `Err`. Only I/O errors
/// on the writers themselves propagate.
pub async fn run<W: Write, E: Write>(
    provider: &dyn SessionProvider,
    request: &RoleAssumptionRequest,
    out: &mut W,
    err: &mut E,
) -> io::Result<bool> {
    info!(
        provider = provider.provider_name(),
        role_arn = request.role_arn(),
        session_name = request.session_name(),
        "Assuming role"
    );
    if let Some(tags) = request.tags() {
        debug!("Session tags: {}", tags.to_cli_argument());
    }

    match provider.assume_role(request).await {
        Ok(credentials) => {
            credentials.write_exports(out)?;
            out.flush()?;
            Ok(true)
        }
        Err(e) => {
            writeln!(err, "{}", e)?;
            err.flush()?;
            Ok(false)
        }
    }
}

/// Unwrap loaded settings, printing a load failure as an unexpected error
///
/// Returns `None` after the failure has been written to `err`.
pub fn settings_or_report<E: Write>(
    settings: Result<Settings, ConfigError>,
    err: &mut E,
) -> io::Result<Option<Settings>> {
    match settings.context("Failed to load settings") {
        Ok(settings) => Ok(Some(settings)),
        Err(e) => {
            debug!("{:?}", e);
            writeln!(err, "{}", AssumeRoleError::Unexpected(e))?;
            err.flush()?;
            Ok(None)
        }
    }
}
