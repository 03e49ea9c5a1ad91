//! CQL session factory.

use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::load_balancing::DefaultPolicy;

use crate::error::DbError;
use crate::resolver::ContactPoint;

/// Open a session against a single known node, preferring `local_datacenter`.
///
/// The session is not bound to a keyspace; statements qualify their tables.
pub async fn open_session(
    contact_point: &ContactPoint,
    local_datacenter: &str,
) -> Result<Session, DbError> {
    let policy = DefaultPolicy::builder()
        .prefer_datacenter(local_datacenter.to_string())
        .build();
    let profile = ExecutionProfile::builder()
        .load_balancing_policy(policy)
        .build();

    tracing::debug!(
        target: "quarry-db",
        node = %contact_point.known_node(),
        datacenter = local_datacenter,
        "opening CQL session"
    );

    SessionBuilder::new()
        .known_node(contact_point.known_node())
        .default_execution_profile_handle(profile.into_handle())
        .build()
        .await
        .map_err(|source| DbError::Connect {
            contact_point: contact_point.clone(),
            source,
        })
}
