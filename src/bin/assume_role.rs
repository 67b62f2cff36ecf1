use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;

use playground::assume_role::providers::{AwsCliSessionProvider, StsSessionProvider};
use playground::assume_role::{self, RoleAssumptionRequest, SessionProvider};
use playground::cli::{self, AssumeRoleArgs, ProviderKind};
use playground::logging;
use playground::settings::Settings;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init();

    let args = AssumeRoleArgs::parse();

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let Some(settings) = assume_role::settings_or_report(Settings::load(), &mut stderr)? else {
        return Ok(cli::exit_status(false, false));
    };

    let request = RoleAssumptionRequest::new(args.role_arn, args.session_name, args.tags);

    let provider: Box<dyn SessionProvider> = match args.provider {
        ProviderKind::Cli => Box::new(AwsCliSessionProvider::new(settings.aws_cli.clone())),
        ProviderKind::Sdk => Box::new(StsSessionProvider::new(&settings.region).await),
    };

    let succeeded =
        assume_role::run(provider.as_ref(), &request, &mut stdout, &mut stderr).await?;

    Ok(cli::exit_status(succeeded, settings.strict_exit))
}
