use anyhow::Context;
use clap::Parser;
use quarry_app::users::UserRepository;
use quarry_kernel::settings::{RunMode, SessionSource, Settings};

/// Bootstrap Apache Cassandra and the users keyspace.
#[derive(Debug, Parser)]
#[command(name = "quarry", version, about)]
struct Cli {
    /// default or manual (verify seeded users after startup)
    #[arg(long)]
    mode: Option<RunMode>,

    /// bootstrap (start a container) or attach (use database.hostname/port)
    #[arg(long)]
    source: Option<SessionSource>,

    /// Skip the seed-data script
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load quarry settings")?;
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    if let Some(source) = cli.source {
        settings.database.source = source;
    }
    if cli.no_seed {
        settings.database.seed_data = false;
    }

    quarry_telemetry::init(&settings.telemetry).context("failed to initialize telemetry")?;

    let app = quarry_app::run(&settings).await?;

    let users = app.users().count().await?;
    tracing::info!(users, "quarry bootstrap complete");
    Ok(())
}
