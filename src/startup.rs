//! Startup sequence: database, schema, seed data, repository, verification.

use anyhow::{ensure, Context};
use quarry_db::{Database, KeyspacePopulator};
use quarry_kernel::settings::{DatabaseSettings, RunMode, Settings};

use crate::modules::users::{self, CassandraUserRepository};

/// Everything brought up by [`run`]. Dropping it closes the session and, for
/// bootstrapped databases, removes the container.
pub struct Application {
    users: CassandraUserRepository,
    database: Database,
}

impl Application {
    pub fn users(&self) -> &CassandraUserRepository {
        &self.users
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

/// Bring the database up and prepare it for repository calls.
///
/// Each step completes before the next starts; the first failure aborts
/// startup.
pub async fn run(settings: &Settings) -> anyhow::Result<Application> {
    let db_settings = &settings.database;
    ensure!(
        settings.mode != RunMode::Manual || db_settings.seed_data,
        "manual mode verifies seeded data; database.seed_data must be enabled"
    );

    tracing::info!(
        env = ?settings.environment,
        mode = ?settings.mode,
        source = ?db_settings.source,
        "quarry bootstrap starting"
    );

    let database = Database::connect(db_settings)
        .await
        .context("failed to bring up Apache Cassandra")?;

    let schema = populator(db_settings).with_script(users::schema_script(db_settings));
    let report = database
        .populate(&schema)
        .await
        .context("failed to apply schema script")?;
    tracing::info!(executed = report.executed, failed = report.failed, "schema applied");

    if db_settings.seed_data {
        let data = populator(db_settings).with_script(users::data_script(db_settings));
        let report = database
            .populate(&data)
            .await
            .context("failed to apply data script")?;
        tracing::info!(executed = report.executed, failed = report.failed, "seed data applied");
    } else {
        tracing::info!("seed data skipped");
    }

    let users = CassandraUserRepository::prepare(database.session(), &db_settings.keyspace)
        .await
        .context("failed to prepare user repository")?;

    if settings.mode == RunMode::Manual {
        users::verify_seeded_users(&users)
            .await
            .context("manual mode verification failed")?;
    }

    tracing::info!(
        contact_points = %database.contact_point(),
        keyspace = %db_settings.keyspace,
        "quarry application initialized!"
    );

    Ok(Application { users, database })
}

fn populator(settings: &DatabaseSettings) -> KeyspacePopulator {
    KeyspacePopulator::new()
        .continue_on_error(settings.continue_on_error)
        .ignore_failed_drops(settings.ignore_failed_drops)
}
