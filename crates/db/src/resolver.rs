//! Contact point discovery for the Cassandra node.
//!
//! Both lookups degrade to fixed defaults instead of failing, so a live
//! container with a dynamic port and a fixed external node share one path.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use async_trait::async_trait;

/// Hostname used when the local hostname cannot be determined.
pub const CASSANDRA_DEFAULT_HOSTNAME: &str = "localhost";

/// Well-known CQL native transport port.
pub const CASSANDRA_DEFAULT_PORT: u16 = 9042;

/// Network address of a Cassandra node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContactPoint {
    pub host: String,
    pub port: u16,
}

impl ContactPoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, the form the driver expects for a known node.
    pub fn known_node(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Renders the contact-points form `host[port]`.
impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.host, self.port)
    }
}

/// Source of host ports bound for container ports.
#[async_trait]
pub trait PortMapping: Send + Sync {
    async fn mapped_port(&self, container_port: u16) -> Option<u16>;
}

type HostnameLookup = fn() -> io::Result<OsString>;

type HostnameResolution = fn(&str) -> io::Result<Vec<SocketAddr>>;

/// Where the candidate hostname comes from.
enum HostnameSource {
    Lookup(HostnameLookup),
    Configured(String),
}

/// Resolves where the database can be reached.
pub struct EnvironmentResolver<'a> {
    hostname: HostnameSource,
    resolve_name: HostnameResolution,
    fallback_port: u16,
    ports: Option<&'a dyn PortMapping>,
}

impl<'a> EnvironmentResolver<'a> {
    /// Resolver backed by the OS hostname and no port mapping.
    pub fn new() -> Self {
        Self {
            hostname: HostnameSource::Lookup(hostname::get),
            resolve_name: resolve_addresses,
            fallback_port: CASSANDRA_DEFAULT_PORT,
            ports: None,
        }
    }

    /// Resolver for an externally managed node: the configured host replaces
    /// the OS hostname and the configured port applies when nothing is mapped.
    pub fn configured(host: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: HostnameSource::Configured(host.into()),
            fallback_port: port,
            ..Self::new()
        }
    }

    pub fn with_port_mapping(mut self, ports: &'a dyn PortMapping) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn with_hostname_lookup(mut self, lookup: HostnameLookup) -> Self {
        self.hostname = HostnameSource::Lookup(lookup);
        self
    }

    pub fn with_hostname_resolution(mut self, resolve: HostnameResolution) -> Self {
        self.resolve_name = resolve;
        self
    }

    /// Canonical hostname, or [`CASSANDRA_DEFAULT_HOSTNAME`] on any failure.
    ///
    /// The name must be non-empty UTF-8 and resolve to at least one address.
    pub fn resolve_hostname(&self) -> String {
        let name = match &self.hostname {
            HostnameSource::Configured(name) => name.clone(),
            HostnameSource::Lookup(lookup) => match lookup() {
                Ok(name) => match name.into_string() {
                    Ok(name) => name,
                    Err(_) => return CASSANDRA_DEFAULT_HOSTNAME.to_string(),
                },
                Err(err) => {
                    tracing::debug!(
                        target: "quarry-db",
                        error = %err,
                        "hostname lookup failed; using default"
                    );
                    return CASSANDRA_DEFAULT_HOSTNAME.to_string();
                }
            },
        };

        let name = name.trim();
        if name.is_empty() {
            return CASSANDRA_DEFAULT_HOSTNAME.to_string();
        }

        match (self.resolve_name)(name) {
            Ok(addresses) if !addresses.is_empty() => name.to_string(),
            Ok(_) => {
                tracing::debug!(
                    target: "quarry-db",
                    hostname = name,
                    "hostname has no addresses; using default"
                );
                CASSANDRA_DEFAULT_HOSTNAME.to_string()
            }
            Err(err) => {
                tracing::debug!(
                    target: "quarry-db",
                    hostname = name,
                    error = %err,
                    "hostname does not resolve; using default"
                );
                CASSANDRA_DEFAULT_HOSTNAME.to_string()
            }
        }
    }

    /// Host port mapped to the CQL port, or the fallback port
    /// ([`CASSANDRA_DEFAULT_PORT`] unless configured).
    pub async fn resolve_port(&self) -> u16 {
        let Some(ports) = self.ports else {
            return self.fallback_port;
        };

        ports
            .mapped_port(CASSANDRA_DEFAULT_PORT)
            .await
            .unwrap_or(self.fallback_port)
    }

    pub async fn socket_address(&self) -> ContactPoint {
        let hostname = self.resolve_hostname();
        let port = self.resolve_port().await;

        tracing::info!(
            target: "quarry-db",
            "Connecting to Apache Cassandra database on host [{}] listening on port [{}]",
            hostname,
            port
        );

        ContactPoint::new(hostname, port)
    }
}

impl Default for EnvironmentResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_addresses(name: &str) -> io::Result<Vec<SocketAddr>> {
    Ok((name, 0).to_socket_addrs()?.collect())
}
