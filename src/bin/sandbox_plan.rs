use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;

use playground::cli::SandboxPlanArgs;
use playground::logging;
use playground::sandbox::{operator, SandboxPlan};
use playground::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = SandboxPlanArgs::parse();
    let settings = Settings::load()?;

    let public_ip = match args.public_ip {
        Some(ip) => ip,
        None => operator::detect_public_ip(&Client::new(), operator::PUBLIC_IP_ENDPOINT).await?,
    };

    let key_path = match args.public_key {
        Some(path) => path,
        None => operator::default_public_key_path()
            .context("Could not determine home directory for ~/.ssh/id_rsa.pub")?,
    };
    let public_key = operator::read_public_key(&key_path)?;

    let plan = SandboxPlan {
        stack_name: settings.stack_name,
        region: settings.region,
        public_ip,
        public_key,
        token: operator::generate_token(),
    };

    if args.script_only {
        print!("{}", plan.bootstrap_script().render());
    } else {
        println!("{}", plan.render());
    }

    Ok(())
}
