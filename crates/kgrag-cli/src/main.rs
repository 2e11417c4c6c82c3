//! kgrag - build a knowledge graph from text and query it.

mod cli;
mod commands;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for results
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Build(args) => commands::build(&config, args, cli.json).await,
        Commands::Ask(args) => commands::ask(&config, args, cli.json).await,
        Commands::Embed(args) => commands::embed(&config, args, cli.json).await,
        Commands::Setup(args) => commands::setup(&config, args, cli.json).await,
        Commands::Reset { drop_index, yes } => commands::reset(&config, drop_index, yes).await,
        Commands::Status => commands::status(&config, cli.json).await,
    };

    if let Err(ref e) = result {
        if let Some(suggestion) = e
            .downcast_ref::<kgrag_core::KgError>()
            .and_then(|k| k.suggestion())
        {
            error!(suggestion, "{:#}", e);
        }
    }
    result
}
