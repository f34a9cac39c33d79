mod config;
mod http;

use std::net::IpAddr;

use anyhow::{Context, Result};
use api::AppState;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_obs::{ObsConfig, init_tracing};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::{config::AppConfig, http::ServeConfig};

#[derive(Parser, Debug)]
#[command(name = "crm-server", version, about = "CRM REST backend")]
struct Cli {
    /// Postgres or SQLite connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations, then start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Load demo users, companies, contacts, deals and tasks.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// Roll everything back and apply again.
    Reset,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(&cli.database_url, cmd).await,
        Command::Migrate(action) => {
            let db = connect(&cli.database_url).await?;
            match action {
                MigrateCommand::Up => {
                    Migrator::up(&db, None).await?;
                    info!("database migrations applied");
                }
                MigrateCommand::Down => {
                    Migrator::down(&db, Some(1)).await?;
                    info!("most recent migration rolled back");
                }
                MigrateCommand::Reset => {
                    Migrator::refresh(&db).await?;
                    info!("database schema rebuilt");
                }
            }
            Ok(())
        }
        Command::Seed => run_seed(&cli.database_url).await,
    }
}

async fn connect(url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.sqlx_logging(false);
    Database::connect(options)
        .await
        .context("failed to connect to DATABASE_URL")
}

async fn run_server(database_url: &str, cmd: ServeCommand) -> Result<()> {
    let config = AppConfig::load()?;
    let db = connect(database_url).await?;
    Migrator::up(&db, None).await?;
    let state = AppState::new(db, config.auth());
    http::serve(
        ServeConfig::new(cmd.host, cmd.port, config.cors_allowed_origins),
        state,
    )
    .await
}

async fn run_seed(database_url: &str) -> Result<()> {
    let db = connect(database_url).await?;
    Migrator::up(&db, None).await?;
    match api::seed::seed_demo(&db).await? {
        Some(summary) => info!(?summary, "seed complete; log in as {}", api::seed::ADMIN_EMAIL),
        None => info!("seed skipped, demo data already present"),
    }
    Ok(())
}
