use std::sync::Arc;

use anyhow::{bail, ensure, Context};
use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::statement::prepared::PreparedStatement;

use super::models::User;

/// CRUD and lookup operations on stored users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>>;

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<User>>;

    /// Insert or overwrite the row keyed by the user's id.
    /// Fails when no id has been assigned.
    async fn save(&self, user: &User) -> anyhow::Result<User>;

    async fn count(&self) -> anyhow::Result<i64>;

    async fn delete_by_id(&self, id: i32) -> anyhow::Result<()>;
}

/// [`UserRepository`] over the `users` table of a keyspace.
pub struct CassandraUserRepository {
    session: Arc<Session>,
    find_by_id: PreparedStatement,
    find_by_name: PreparedStatement,
    insert: PreparedStatement,
    count: PreparedStatement,
    delete_by_id: PreparedStatement,
}

impl CassandraUserRepository {
    /// Prepare the repository statements against `{keyspace}.users`.
    pub async fn prepare(session: Arc<Session>, keyspace: &str) -> anyhow::Result<Self> {
        ensure!(
            is_plain_identifier(keyspace),
            "keyspace name '{}' must be alphanumeric or underscore",
            keyspace
        );
        let table = format!("{}.users", keyspace);

        let find_by_id = prepare(
            &session,
            format!("SELECT id, name FROM {} WHERE id = ?", table),
        )
        .await?;
        let find_by_name = prepare(
            &session,
            format!("SELECT id, name FROM {} WHERE name = ?", table),
        )
        .await?;
        let insert = prepare(
            &session,
            format!("INSERT INTO {} (id, name) VALUES (?, ?)", table),
        )
        .await?;
        let count = prepare(&session, format!("SELECT COUNT(*) FROM {}", table)).await?;
        let delete_by_id = prepare(&session, format!("DELETE FROM {} WHERE id = ?", table)).await?;

        tracing::debug!(target: "quarry-app", %table, "user repository statements prepared");

        Ok(Self {
            session,
            find_by_id,
            find_by_name,
            insert,
            count,
            delete_by_id,
        })
    }

    async fn first_user(
        &self,
        statement: &PreparedStatement,
        key: impl scylla::serialize::row::SerializeRow,
    ) -> anyhow::Result<Option<User>> {
        let row = self
            .session
            .execute_unpaged(statement, key)
            .await
            .context("user query failed")?
            .into_rows_result()
            .context("user query returned no rows result")?
            .maybe_first_row::<(i32, String)>()
            .context("failed to decode user row")?;

        Ok(row.map(|(id, name)| User::named(name).identified_by(id)))
    }
}

async fn prepare(session: &Session, cql: String) -> anyhow::Result<PreparedStatement> {
    session
        .prepare(cql.as_str())
        .await
        .with_context(|| format!("failed to prepare '{}'", cql))
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl UserRepository for CassandraUserRepository {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
        self.first_user(&self.find_by_id, (id,)).await
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<User>> {
        self.first_user(&self.find_by_name, (name,)).await
    }

    async fn save(&self, user: &User) -> anyhow::Result<User> {
        let Some(id) = user.id() else {
            bail!("cannot save user [{}] without an id", user);
        };

        self.session
            .execute_unpaged(&self.insert, (id, user.name()))
            .await
            .with_context(|| format!("failed to save user [{}]", user))?;

        Ok(user.clone())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (count,) = self
            .session
            .execute_unpaged(&self.count, ())
            .await
            .context("user count failed")?
            .into_rows_result()
            .context("user count returned no rows result")?
            .single_row::<(i64,)>()
            .context("failed to decode user count")?;

        Ok(count)
    }

    async fn delete_by_id(&self, id: i32) -> anyhow::Result<()> {
        self.session
            .execute_unpaged(&self.delete_by_id, (id,))
            .await
            .with_context(|| format!("failed to delete user {}", id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyspace_names_are_plain_identifiers() {
        assert!(is_plain_identifier("test"));
        assert!(is_plain_identifier("app_2"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("test; DROP KEYSPACE test"));
        assert!(!is_plain_identifier("other.users"));
    }
}
