use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use board_explorer::cli::{Cli, Command, TrackedCommand};
use board_explorer::{commands, logging};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Run(args) => commands::run(args).await.context("run")?,
        Command::Serve(args) => commands::serve(args).await.context("serve")?,
        Command::Tracked {
            command: TrackedCommand::List(args),
        } => commands::tracked_list(args).await.context("tracked list")?,
        Command::Tracked {
            command: TrackedCommand::Add(args),
        } => commands::tracked_add(args).await.context("tracked add")?,
    }

    Ok(())
}
