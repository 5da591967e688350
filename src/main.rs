mod command_line;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use command_line::{Cli, Command};
use tabsflow_infra::config::AppConfig;
use tabsflow_infra::env::{self, Env, EnvResolver};
use tabsflow_infra::{app, preflight};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.log_level())?;

    let mut resolver = EnvResolver::from_process();
    if let Some(stage) = cli.stage {
        resolver.set(env::DEPLOY_STAGE, stage.as_str());
    }
    let config = AppConfig::new(Env::resolve(&resolver)?);
    info!(
        "Stage {} in {} ({})",
        config.stage(),
        config.env.region,
        config.env.account_id
    );

    match cli.command() {
        Command::Synth { out } => {
            let assembly = app::synthesize(&config)?;
            let written = assembly.write(&out)?;
            info!("Wrote {} files to {}", written.len(), out.display());
        }
        Command::Preflight => preflight::run(&config).await?,
    }

    Ok(())
}
