mod cli;
mod commands;
mod input;
mod observability;
mod output;
mod processors;

use anyhow::Result;
use clap::Parser;
use fhirmig_config::RunConfig;
use fhirmig_engine::Mode;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Optional .env for local development; a missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut cfg = RunConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Run(args) => {
            // CLI flags win over file/env configuration.
            if let Some(chunk_size) = args.chunk_size {
                cfg.chunk_size = chunk_size;
            }
            if let Some(max_workers) = args.max_workers {
                cfg.worker_count = max_workers;
            }
            if args.update {
                cfg.mode = Mode::Update;
            }
            if args.quiet {
                cfg.quiet = true;
            }
            cfg.validate()?;

            observability::init_tracing(if cfg.quiet { "warn" } else { "info" });
            commands::run::run(&cfg, args).await?;
        }
        Commands::Report(args) => {
            observability::init_tracing("warn");
            commands::report::run(&cfg, args).await?;
        }
    }

    Ok(())
}
