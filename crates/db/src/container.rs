//! Containerized Cassandra node lifecycle.

use std::borrow::Cow;

use async_trait::async_trait;
use quarry_kernel::settings::DatabaseSettings;
use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, Image,
};

use crate::error::DbError;
use crate::resolver::{ContactPoint, EnvironmentResolver, PortMapping, CASSANDRA_DEFAULT_PORT};

const READY_MESSAGE: &str = "Starting listening for CQL clients";

const EXPOSED_PORTS: &[ContainerPort] = &[ContainerPort::Tcp(CASSANDRA_DEFAULT_PORT)];

/// Single-node Cassandra image tuned for fast local startup.
#[derive(Debug, Clone)]
pub struct CassandraImage {
    name: String,
    tag: String,
    datacenter: String,
}

impl CassandraImage {
    pub fn new(
        name: impl Into<String>,
        tag: impl Into<String>,
        datacenter: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            datacenter: datacenter.into(),
        }
    }

    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        Self::new(
            settings.image.as_str(),
            settings.image_tag.as_str(),
            settings.local_datacenter.as_str(),
        )
    }

    /// `name:tag` reference used in logs and errors.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

impl Default for CassandraImage {
    fn default() -> Self {
        Self::from_settings(&DatabaseSettings::default())
    }
}

impl Image for CassandraImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout(READY_MESSAGE)]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        [
            ("CASSANDRA_DC", self.datacenter.as_str()),
            ("CASSANDRA_ENDPOINT_SNITCH", "GossipingPropertyFileSnitch"),
            ("CASSANDRA_SNITCH", "GossipingPropertyFileSnitch"),
            ("HEAP_NEWSIZE", "128M"),
            ("MAX_HEAP_SIZE", "1024M"),
            (
                "JVM_OPTS",
                "-Dcassandra.skip_wait_for_gossip_to_settle=0 -Dcassandra.initial_token=0",
            ),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        EXPOSED_PORTS
    }
}

/// Configured but not yet running Cassandra node.
pub struct CassandraInitializer {
    image: CassandraImage,
}

impl CassandraInitializer {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self::with_image(CassandraImage::from_settings(settings))
    }

    pub fn with_image(image: CassandraImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &CassandraImage {
        &self.image
    }

    /// Start the container, wait for it to accept CQL clients and resolve its
    /// contact point.
    pub async fn start(self) -> Result<RunningCassandra, DbError> {
        let reference = self.image.reference();
        tracing::info!(target: "quarry-db", image = %reference, "Bootstrapping Apache Cassandra database...");

        let container = self
            .image
            .start()
            .await
            .map_err(|source| DbError::ContainerStart {
                image: reference,
                source,
            })?;

        let contact_point = EnvironmentResolver::new()
            .with_port_mapping(&container)
            .socket_address()
            .await;

        tracing::info!(
            target: "quarry-db",
            contact_points = %contact_point,
            "Apache Cassandra database initialized!"
        );

        Ok(RunningCassandra {
            container,
            contact_point,
        })
    }
}

/// Running Cassandra container. Dropping it removes the container.
pub struct RunningCassandra {
    container: ContainerAsync<CassandraImage>,
    contact_point: ContactPoint,
}

impl RunningCassandra {
    /// Contact point resolved when the container became ready.
    pub fn contact_point(&self) -> &ContactPoint {
        &self.contact_point
    }

    pub fn container_id(&self) -> &str {
        self.container.id()
    }
}

#[async_trait]
impl PortMapping for RunningCassandra {
    async fn mapped_port(&self, container_port: u16) -> Option<u16> {
        self.container.mapped_port(container_port).await
    }
}

#[async_trait]
impl PortMapping for ContainerAsync<CassandraImage> {
    async fn mapped_port(&self, container_port: u16) -> Option<u16> {
        match self
            .get_host_port_ipv4(ContainerPort::Tcp(container_port))
            .await
        {
            Ok(port) => Some(port),
            Err(err) => {
                tracing::debug!(
                    target: "quarry-db",
                    container_port,
                    error = %err,
                    "no host port mapped"
                );
                None
            }
        }
    }
}
