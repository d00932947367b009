use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    opac_harvester::logging::init().context("init logging")?;

    let cli = opac_harvester::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        opac_harvester::cli::Command::Harvest(args) => {
            opac_harvester::harvest::run(args).await.context("harvest")?;
        }
        opac_harvester::cli::Command::Criteria(args) => {
            opac_harvester::criteria::run(args).context("criteria")?;
        }
    }

    Ok(())
}
