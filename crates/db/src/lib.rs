//! Cassandra bootstrap for quarry: contact point resolution, the container
//! initializer, session construction and CQL script population.

use std::sync::Arc;

use quarry_kernel::settings::{DatabaseSettings, SessionSource};
use scylla::client::session::Session;

pub mod container;
pub mod error;
pub mod populator;
pub mod resolver;
pub mod script;
pub mod session;

pub use container::{CassandraImage, CassandraInitializer, RunningCassandra};
pub use error::DbError;
pub use populator::{CqlExecutor, KeyspacePopulator, PopulationReport};
pub use resolver::{ContactPoint, EnvironmentResolver, PortMapping};
pub use script::ScriptResource;

/// Open session plus, when bootstrapped, the container backing it.
pub struct Database {
    session: Arc<Session>,
    contact_point: ContactPoint,
    // Declared after `session` so the session closes before the container goes away.
    node: Option<RunningCassandra>,
}

impl Database {
    /// Bring up (or attach to) the database and open a session against it.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let (contact_point, node) = match settings.source {
            SessionSource::Bootstrap => {
                let node = CassandraInitializer::new(settings).start().await?;
                (node.contact_point().clone(), Some(node))
            }
            SessionSource::Attach => {
                tracing::info!(
                    target: "quarry-db",
                    hostname = %settings.hostname,
                    port = settings.port,
                    "attaching to external Apache Cassandra database"
                );
                let contact_point =
                    EnvironmentResolver::configured(settings.hostname.as_str(), settings.port)
                        .socket_address()
                        .await;
                (contact_point, None)
            }
        };

        let session = session::open_session(&contact_point, &settings.local_datacenter).await?;

        Ok(Self {
            session: Arc::new(session),
            contact_point,
            node,
        })
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    pub fn contact_point(&self) -> &ContactPoint {
        &self.contact_point
    }

    /// Container handle, present only for bootstrapped databases.
    pub fn node(&self) -> Option<&RunningCassandra> {
        self.node.as_ref()
    }

    pub async fn populate(
        &self,
        populator: &KeyspacePopulator,
    ) -> Result<PopulationReport, DbError> {
        populator.populate(self.session.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn attach_to_closed_port_is_a_connect_error() {
        let port = unused_port();
        let settings = DatabaseSettings {
            source: SessionSource::Attach,
            hostname: "127.0.0.1".to_string(),
            port,
            ..DatabaseSettings::default()
        };

        match Database::connect(&settings).await {
            Err(DbError::Connect { contact_point, .. }) => {
                assert_eq!(contact_point.to_string(), format!("127.0.0.1[{}]", port));
            }
            Err(other) => panic!("Expected Connect error, got {:?}", other),
            Ok(_) => panic!("Expected Connect error, got a session"),
        }
    }
}
