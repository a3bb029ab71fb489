use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use warden_core::{config::Config, migration, server, telemetry};

#[derive(Parser)]
#[command(name = "warden-core", version, about = "Domain lifecycle and OAuth2 grant store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate, bootstrap the master domain and run the grant reaper (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Purge expired grants once and exit
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting Warden Core");
            server::run(config).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::Purge => {
            let stats = server::purge(config).await?;
            info!(purged = stats.total(), "Purge complete");
            Ok(())
        }
    }
}
