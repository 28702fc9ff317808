mod cli;
mod commands;
pub mod core;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::core::error::{ErrorKind, StageResult};
use crate::core::pipeline::StagingPipeline;

/// Parse the command line, run it, and map the outcome to a process exit code.
pub async fn run() -> ExitCode {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nativestage_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => exit_code(ErrorKind::IntegrityMismatch),
        Err(err) => {
            tracing::error!("{}", err);
            exit_code(err.kind())
        }
    }
}

async fn dispatch(cli: Cli) -> StageResult<bool> {
    let pipeline = || -> StageResult<StagingPipeline> {
        let pipeline = StagingPipeline::from_settings(cli.settings()?)?;
        tracing::debug!("Cache at {:?}", pipeline.settings().cache_dir);
        Ok(pipeline)
    };

    match &cli.command {
        Commands::Platform => commands::platform(cli.json)?,
        Commands::Resolve(args) => {
            let targets = args.targets()?;
            commands::resolve(&pipeline()?, &args.manifest.manifest, &targets, cli.json).await?
        }
        Commands::Fetch(args) => {
            let targets = args.targets()?;
            commands::fetch(&pipeline()?, &args.manifest.manifest, &targets, cli.json).await?
        }
        Commands::Stage {
            manifest, platform, ..
        } => commands::stage(&pipeline()?, &manifest.manifest, *platform, cli.json).await?,
        Commands::Verify(args) => {
            let targets = args.targets()?;
            return commands::verify(&pipeline()?, &args.manifest.manifest, &targets, cli.json)
                .await;
        }
    }
    Ok(true)
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::Fatal => ExitCode::from(1),
        ErrorKind::UnresolvedDependency => ExitCode::from(2),
        ErrorKind::IntegrityMismatch => ExitCode::from(3),
        ErrorKind::NetworkUnavailable => ExitCode::from(4),
        ErrorKind::StagingIo => ExitCode::from(5),
    }
}
