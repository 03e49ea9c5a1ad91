//! The `users` table: model, repository, schema and seed scripts.

pub mod models;
pub mod repository;
pub mod verify;

use quarry_db::ScriptResource;
use quarry_kernel::settings::DatabaseSettings;

pub use models::User;
pub use repository::{CassandraUserRepository, UserRepository};
pub use verify::verify_seeded_users;

pub const SCHEMA_SCRIPT_NAME: &str = "cassandra-schema.cql";
pub const DATA_SCRIPT_NAME: &str = "cassandra-data.cql";

/// Name of the row inserted by the bundled data script.
pub const SEEDED_USER_NAME: &str = "Jon Doe";

const SCHEMA_CQL: &str = include_str!("../../../resources/cassandra-schema.cql");
const DATA_CQL: &str = include_str!("../../../resources/cassandra-data.cql");

/// Keyspace and table definitions, from `database.schema_script` if set.
pub fn schema_script(settings: &DatabaseSettings) -> ScriptResource {
    match &settings.schema_script {
        Some(path) => ScriptResource::from_path(path),
        None => ScriptResource::embedded(SCHEMA_SCRIPT_NAME, SCHEMA_CQL),
    }
}

/// Seed rows, from `database.data_script` if set.
pub fn data_script(settings: &DatabaseSettings) -> ScriptResource {
    match &settings.data_script {
        Some(path) => ScriptResource::from_path(path),
        None => ScriptResource::embedded(DATA_SCRIPT_NAME, DATA_CQL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn bundled_schema_creates_keyspace_table_and_index() {
        let statements = schema_script(&DatabaseSettings::default())
            .statements()
            .unwrap();

        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE KEYSPACE test"));
        assert!(statements[1].starts_with("CREATE TABLE test.users"));
        assert!(statements[2].starts_with("CREATE INDEX"));
    }

    #[test]
    fn bundled_data_seeds_jon_doe() {
        let script = data_script(&DatabaseSettings::default());
        assert_eq!(script.name(), DATA_SCRIPT_NAME);

        let statements = script.statements().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains(SEEDED_USER_NAME));
    }

    #[test]
    fn configured_script_paths_take_precedence() {
        let settings = DatabaseSettings {
            schema_script: Some(PathBuf::from("/etc/quarry/schema.cql")),
            ..DatabaseSettings::default()
        };
        assert_eq!(schema_script(&settings).name(), "/etc/quarry/schema.cql");
        assert_eq!(data_script(&settings).name(), DATA_SCRIPT_NAME);
    }
}
