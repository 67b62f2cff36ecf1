use clap::{builder::NonEmptyStringValueParser, Parser, ValueEnum};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

/// Identity service client used to assume the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Run `aws sts assume-role`
    Cli,
    /// Call STS through the AWS SDK
    Sdk,
}

#[derive(Parser, Debug)]
#[command(
    name = "assume-role",
    version,
    about = "Assume an AWS IAM role and print environment variables for sourcing."
)]
pub struct AssumeRoleArgs {
    /// The ARN of the role to assume.
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub role_arn: String,
    /// A unique name for the session. If not provided, a name based on the current timestamp will be used.
    #[arg(long = "session_name")]
    pub session_name: Option<String>,
    /// Optional session tags as key=value pairs (e.g., --tags project=demo env=testing).
    #[arg(long, num_args = 0.., value_parser = parse_key_val::<String, String>)]
    pub tags: Vec<(String, String)>,
    /// Identity service client
    #[arg(long, value_enum, default_value_t = ProviderKind::Cli)]
    pub provider: ProviderKind,
}

#[derive(Parser, Debug)]
#[command(
    name = "fetch-outputs",
    version,
    about = "Print connection instructions for the deployed sandbox stack."
)]
pub struct FetchOutputsArgs {
    /// Stack to describe (defaults to the configured stack name)
    #[arg(long)]
    pub stack_name: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "sandbox-plan",
    version,
    about = "Show the operator-specific inputs of the sandbox stack."
)]
pub struct SandboxPlanArgs {
    /// Public IPv4 address to allow (detected via api.ipify.org if omitted)
    #[arg(long)]
    pub public_ip: Option<Ipv4Addr>,
    /// SSH public key to install (defaults to ~/.ssh/id_rsa.pub)
    #[arg(long)]
    pub public_key: Option<PathBuf>,
    /// Print only the bootstrap script
    #[arg(long)]
    pub script_only: bool,
}

/// Parse a single key-value pair, splitting on the first `=`
pub fn parse_key_val<T, U>(
    s: &str,
) -> Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

/// Process exit status for a helper run
///
/// Failed operations exit with 0 unless strict exit is enabled, since existing
/// callers detect failure from the printed text only.
pub fn exit_status(succeeded: bool, strict_exit: bool) -> ExitCode {
    ExitCode::from(exit_code(succeeded, strict_exit))
}

fn exit_code(succeeded: bool, strict_exit: bool) -> u8 {
    if succeeded || !strict_exit {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val_splits_on_first_equals() {
        let (k, v): (String, String) = parse_key_val("query=a=b").unwrap();
        assert_eq!(k, "query");
        assert_eq!(v, "a=b");

        let (k, v): (String, String) = parse_key_val("empty=").unwrap();
        assert_eq!(k, "empty");
        assert_eq!(v, "");

        assert!(parse_key_val::<String, String>("no-equals").is_err());
    }

    #[test]
    fn test_assume_role_args_full() {
        let args = AssumeRoleArgs::try_parse_from([
            "assume-role",
            "arn:aws:iam::123456789012:role/Playground",
            "--session_name",
            "ci-run",
            "--tags",
            "project=demo",
            "env=testing",
        ])
        .unwrap();

        assert_eq!(args.role_arn, "arn:aws:iam::123456789012:role/Playground");
        assert_eq!(args.session_name.as_deref(), Some("ci-run"));
        assert_eq!(
            args.tags,
            vec![
                ("project".to_string(), "demo".to_string()),
                ("env".to_string(), "testing".to_string()),
            ]
        );
        assert_eq!(args.provider, ProviderKind::Cli);
    }

    #[test]
    fn test_assume_role_args_minimal() {
        let args = AssumeRoleArgs::try_parse_from(["assume-role", "arn:aws:iam::1:role/R"]).unwrap();
        assert!(args.session_name.is_none());
        assert!(args.tags.is_empty());
    }

    #[test]
    fn test_assume_role_args_empty_tags_flag() {
        let args =
            AssumeRoleArgs::try_parse_from(["assume-role", "arn:aws:iam::1:role/R", "--tags"])
                .unwrap();
        assert!(args.tags.is_empty());
    }

    #[test]
    fn test_assume_role_args_rejects_bad_input() {
        assert!(AssumeRoleArgs::try_parse_from(["assume-role"]).is_err());
        assert!(AssumeRoleArgs::try_parse_from(["assume-role", ""]).is_err());
        assert!(AssumeRoleArgs::try_parse_from([
            "assume-role",
            "arn:aws:iam::1:role/R",
            "--tags",
            "project"
        ])
        .is_err());
    }

    #[test]
    fn test_assume_role_args_sdk_provider() {
        let args = AssumeRoleArgs::try_parse_from([
            "assume-role",
            "arn:aws:iam::1:role/R",
            "--provider",
            "sdk",
        ])
        .unwrap();
        assert_eq!(args.provider, ProviderKind::Sdk);
    }

    #[test]
    fn test_sandbox_plan_args() {
        let args = SandboxPlanArgs::try_parse_from([
            "sandbox-plan",
            "--public-ip",
            "203.0.113.7",
            "--script-only",
        ])
        .unwrap();
        assert_eq!(args.public_ip, Some(Ipv4Addr::new(203, 0, 113, 7)));
        assert!(args.public_key.is_none());
        assert!(args.script_only);

        assert!(SandboxPlanArgs::try_parse_from(["sandbox-plan", "--public-ip", "nope"]).is_err());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(true, false), 0);
        // Compatible default: failures still exit 0
        assert_eq!(exit_code(false, false), 0);
        assert_eq!(exit_code(true, true), 0);
        assert_eq!(exit_code(false, true), 1);
    }
}
