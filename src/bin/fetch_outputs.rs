use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;

use playground::cli::{self, FetchOutputsArgs};
use playground::logging;
use playground::settings::Settings;
use playground::stack_outputs::{self, CloudFormationStackDescriber};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init();

    let args = FetchOutputsArgs::parse();

    let mut stdout = io::stdout().lock();
    let Some(settings) = stack_outputs::settings_or_report(Settings::load(), &mut stdout)? else {
        return Ok(cli::exit_status(false, false));
    };
    let stack_name = args.stack_name.unwrap_or(settings.stack_name);

    let describer = CloudFormationStackDescriber::new(&settings.region).await;

    let succeeded = stack_outputs::run(&describer, &stack_name, &mut stdout).await?;

    Ok(cli::exit_status(succeeded, settings.strict_exit))
}
