pub mod cloudformation;

use std::io::{self, Write};

use anyhow::Result;
use async_trait::async_trait;
use config::ConfigError;
use tracing::{debug, info};

use crate::settings::Settings;

pub use cloudformation::CloudFormationStackDescriber;

/// Output holding the public IP of the sandbox instance
pub const INSTANCE_PUBLIC_IP: &str = "InstancePublicIP";
/// Output holding the tokenized notebook URL
pub const JUPYTER_URL: &str = "JupyterURL";
/// Output holding the name of the sandbox bucket
pub const BUCKET_NAME: &str = "BucketName";

/// A named value exposed by a deployed stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutput {
    pub key: String,
    pub value: String,
}

impl DeploymentOutput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Capability to look up a deployed stack's outputs
#[async_trait]
pub trait StackDescriber: Send + Sync {
    /// Outputs of the named stack in service order (empty if it declares none)
    async fn describe_outputs(&self, stack_name: &str) -> Result<Vec<DeploymentOutput>>;
}

/// Render outputs as connection instructions
///
/// `InstancePublicIP` and `JupyterURL` get a hint and their own paragraph;
/// every other output is printed as `<key>: <value>`.
pub fn render_outputs<W: Write>(outputs: &[DeploymentOutput], out: &mut W) -> io::Result<()> {
    for output in outputs {
        match output.key.as_str() {
            INSTANCE_PUBLIC_IP => {
                writeln!(out, "To connect to the instance, run:")?;
                writeln!(out)?;
                writeln!(out, "ssh ec2-user@{}", output.value)?;
                writeln!(out)?;
            }
            JUPYTER_URL => {
                writeln!(
                    out,
                    "To access Jupyter Notebook, open the following URL in your browser:"
                )?;
                writeln!(out)?;
                writeln!(out, "{}", output.value)?;
                writeln!(out)?;
            }
            _ => writeln!(out, "{}: {}", output.key, output.value)?,
        }
    }
    Ok(())
}

/// Fetch the stack's outputs and print them
///
/// Failures are printed to `out` as well; the returned flag tells whether the
/// lookup succeeded.
pub async fn run<W: Write>(
    describer: &dyn StackDescriber,
    stack_name: &str,
    out: &mut W,
) -> io::Result<bool> {
    info!("Describing stack {}", stack_name);

    let succeeded = match describer.describe_outputs(stack_name).await {
        Ok(outputs) => {
            info!("Stack {} has {} outputs", stack_name, outputs.len());
            render_outputs(&outputs, out)?;
            true
        }
        Err(e) => {
            debug!("Failed to describe stack {}: {:?}", stack_name, e);
            write_failure(&e, out)?;
            false
        }
    };

    out.flush()?;
    Ok(succeeded)
}

/// Unwrap loaded settings, printing a load failure like a failed lookup
///
/// Returns `None` after the failure has been written to `out`.
pub fn settings_or_report<W: Write>(
    settings: Result<Settings, ConfigError>,
    out: &mut W,
) -> io::Result<Option<Settings>> {
    match settings {
        Ok(settings) => Ok(Some(settings)),
        Err(e) => {
            debug!("Failed to load settings: {:?}", e);
            write_failure(&anyhow::Error::new(e).context("Failed to load settings"), out)?;
            out.flush()?;
            Ok(None)
        }
    }
}

fn write_failure<W: Write>(e: &anyhow::Error, out: &mut W) -> io::Result<()> {
    writeln!(out, "Error retrieving stack outputs: {:#}", e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use config::Environment;
    use std::sync::{Arc, Mutex};

    struct FakeDescriber {
        outputs: Option<Vec<DeploymentOutput>>,
    }

    #[async_trait]
    impl StackDescriber for FakeDescriber {
        async fn describe_outputs(&self, stack_name: &str) -> Result<Vec<DeploymentOutput>> {
            match &self.outputs {
                Some(outputs) => Ok(outputs.clone()),
                None => bail!("Stack with id {} does not exist", stack_name),
            }
        }
    }

    fn sandbox_outputs() -> Vec<DeploymentOutput> {
        vec![
            DeploymentOutput::new(INSTANCE_PUBLIC_IP, "1.2.3.4"),
            DeploymentOutput::new(JUPYTER_URL, "http://1.2.3.4:3000/?token=abc"),
            DeploymentOutput::new(BUCKET_NAME, "my-bucket"),
        ]
    }

    fn rendered(outputs: &[DeploymentOutput]) -> String {
        let mut out = Vec::new();
        render_outputs(outputs, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_sandbox_outputs() {
        let text = rendered(&sandbox_outputs());

        assert_eq!(
            text,
            "To connect to the instance, run:\n\
             \n\
             ssh ec2-user@1.2.3.4\n\
             \n\
             To access Jupyter Notebook, open the following URL in your browser:\n\
             \n\
             http://1.2.3.4:3000/?token=abc\n\
             \n\
             BucketName: my-bucket\n"
        );
        assert!(!text.contains("InstancePublicIP:"));
        assert!(!text.contains("JupyterURL:"));
    }

    #[test]
    fn test_render_keeps_service_order_and_duplicates() {
        let text = rendered(&[
            DeploymentOutput::new("TableName", "Playground1Stack-MyTable"),
            DeploymentOutput::new(BUCKET_NAME, "my-bucket"),
            DeploymentOutput::new(BUCKET_NAME, "my-bucket"),
        ]);

        assert_eq!(
            text,
            "TableName: Playground1Stack-MyTable\nBucketName: my-bucket\nBucketName: my-bucket\n"
        );
    }

    #[test]
    fn test_render_empty_outputs_prints_nothing() {
        assert_eq!(rendered(&[]), "");
    }

    #[tokio::test]
    async fn test_run_success() {
        let describer = FakeDescriber {
            outputs: Some(sandbox_outputs()),
        };
        let mut out = Vec::new();

        let succeeded = run(&describer, "Playground1Stack", &mut out).await.unwrap();

        assert!(succeeded);
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|line| line == "ssh ec2-user@1.2.3.4"));
        assert!(text.lines().any(|line| line == "BucketName: my-bucket"));
    }

    #[tokio::test]
    async fn test_run_empty_stack_prints_nothing() {
        let describer = FakeDescriber {
            outputs: Some(Vec::new()),
        };
        let mut out = Vec::new();

        let succeeded = run(&describer, "Playground1Stack", &mut out).await.unwrap();

        assert!(succeeded);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_run_failure_is_printed_to_stdout() {
        let describer = FakeDescriber { outputs: None };
        let mut out = Vec::new();

        let succeeded = run(&describer, "Playground1Stack", &mut out).await.unwrap();

        assert!(!succeeded);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Error retrieving stack outputs: Stack with id Playground1Stack does not exist\n"
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_failure_logs_nothing_at_default_level() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let describer = FakeDescriber { outputs: None };
        let mut out = Vec::new();
        let succeeded = run(&describer, "Playground1Stack", &mut out).await.unwrap();

        assert!(!succeeded);
        assert!(!out.is_empty());
        assert!(logs.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_or_report_passes_settings_through() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::build(
            &temp_dir.path().join("playground.toml"),
            Environment::with_prefix("PLAYGROUND").source(Some(config::Map::new())),
            None,
        );
        let mut out = Vec::new();

        let settings = settings_or_report(settings, &mut out).unwrap().unwrap();

        assert_eq!(settings.stack_name, "Playground1Stack");
        assert!(out.is_empty());
    }

    #[test]
    fn test_settings_or_report_prints_unreadable_config_to_stdout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("playground.toml");
        std::fs::write(&path, "region = [\n").unwrap();
        let settings = Settings::build(
            &path,
            Environment::with_prefix("PLAYGROUND").source(Some(config::Map::new())),
            None,
        );
        assert!(settings.is_err());
        let mut out = Vec::new();

        let settings = settings_or_report(settings, &mut out).unwrap();

        assert!(settings.is_none());
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Error retrieving stack outputs: Failed to load settings: "));
    }
}
