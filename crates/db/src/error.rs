//! Error type for database bootstrap and population.

use thiserror::Error;

use crate::resolver::ContactPoint;

/// Boxed driver error, so population can run against any executor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to start Cassandra container from image '{image}'")]
    ContainerStart {
        image: String,
        #[source]
        source: testcontainers::TestcontainersError,
    },

    #[error("failed to open CQL session against {contact_point}")]
    Connect {
        contact_point: ContactPoint,
        #[source]
        source: scylla::errors::NewSessionError,
    },

    #[error("failed to read CQL script '{script}'")]
    ScriptRead {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CQL script '{script}': {message}")]
    ScriptSyntax { script: String, message: String },

    #[error("statement #{index} of CQL script '{script}' failed: {statement}")]
    Statement {
        script: String,
        index: usize,
        statement: String,
        #[source]
        source: BoxError,
    },
}
