//! Quarry application library
//!
//! Brings up Apache Cassandra, applies the bundled schema and seed data, and
//! exposes the user repository.

pub mod modules;
pub mod startup;

pub use modules::users;
pub use startup::{run, Application};
