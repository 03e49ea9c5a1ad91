//! Applies CQL scripts against an open session.

use async_trait::async_trait;
use scylla::client::session::Session;

use crate::error::{BoxError, DbError};
use crate::script::ScriptResource;

/// Something that can run a single CQL statement.
#[async_trait]
pub trait CqlExecutor: Send + Sync {
    async fn execute_statement(&self, statement: &str) -> Result<(), BoxError>;
}

#[async_trait]
impl CqlExecutor for Session {
    async fn execute_statement(&self, statement: &str) -> Result<(), BoxError> {
        self.query_unpaged(statement, ())
            .await
            .map(|_| ())
            .map_err(|err| Box::new(err) as BoxError)
    }
}

/// Outcome of a population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationReport {
    /// Statements that ran successfully.
    pub executed: usize,
    /// Statements that failed but were tolerated by the policy.
    pub failed: usize,
}

/// Ordered list of scripts plus the failure policy used to apply them.
///
/// The default policy is strict: the first failing statement aborts the pass.
/// Populating an already populated keyspace therefore fails on
/// "already exists" unless the scripts guard against it themselves.
#[derive(Debug, Clone, Default)]
pub struct KeyspacePopulator {
    scripts: Vec<ScriptResource>,
    continue_on_error: bool,
    ignore_failed_drops: bool,
}

impl KeyspacePopulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: ScriptResource) -> Self {
        self.scripts.push(script);
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn ignore_failed_drops(mut self, ignore_failed_drops: bool) -> Self {
        self.ignore_failed_drops = ignore_failed_drops;
        self
    }

    pub fn scripts(&self) -> &[ScriptResource] {
        &self.scripts
    }

    /// Execute every statement of every script, in order.
    pub async fn populate<E>(&self, executor: &E) -> Result<PopulationReport, DbError>
    where
        E: CqlExecutor + ?Sized,
    {
        let mut report = PopulationReport::default();

        for script in &self.scripts {
            let statements = script.statements()?;
            tracing::info!(
                target: "quarry-db",
                script = script.name(),
                statements = statements.len(),
                "applying CQL script"
            );

            for (index, statement) in statements.into_iter().enumerate() {
                let index = index + 1;
                match executor.execute_statement(&statement).await {
                    Ok(()) => report.executed += 1,
                    Err(err) if self.ignore_failed_drops && is_drop(&statement) => {
                        tracing::debug!(
                            target: "quarry-db",
                            script = script.name(),
                            index,
                            error = %err,
                            "ignoring failed DROP statement"
                        );
                        report.failed += 1;
                    }
                    Err(err) if self.continue_on_error => {
                        tracing::warn!(
                            target: "quarry-db",
                            script = script.name(),
                            index,
                            statement = %statement,
                            error = %err,
                            "CQL statement failed; continuing"
                        );
                        report.failed += 1;
                    }
                    Err(source) => {
                        return Err(DbError::Statement {
                            script: script.name().to_string(),
                            index,
                            statement,
                            source,
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}

fn is_drop(statement: &str) -> bool {
    statement
        .split_whitespace()
        .next()
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("drop"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records statements and fails those containing any of `failing`.
    #[derive(Default)]
    struct RecordingExecutor {
        failing: Vec<&'static str>,
        executed: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn failing(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                ..Self::default()
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CqlExecutor for RecordingExecutor {
        async fn execute_statement(&self, statement: &str) -> Result<(), BoxError> {
            self.executed.lock().unwrap().push(statement.to_string());
            if self.failing.iter().any(|needle| statement.contains(needle)) {
                return Err(format!("{} already exists", statement).into());
            }
            Ok(())
        }
    }

    fn schema() -> ScriptResource {
        ScriptResource::embedded(
            "schema.cql",
            "DROP TABLE IF EXISTS test.users;\n\
             CREATE TABLE test.users (id int PRIMARY KEY, name text);\n\
             CREATE INDEX ON test.users (name);",
        )
    }

    fn data() -> ScriptResource {
        ScriptResource::embedded("data.cql", "INSERT INTO test.users (id, name) VALUES (1, 'Jon Doe');")
    }

    #[tokio::test]
    async fn scripts_run_in_order() {
        let executor = RecordingExecutor::default();
        let report = KeyspacePopulator::new()
            .with_script(schema())
            .with_script(data())
            .populate(&executor)
            .await
            .unwrap();

        assert_eq!(report, PopulationReport { executed: 4, failed: 0 });
        let executed = executor.executed();
        assert!(executed[0].starts_with("DROP TABLE"));
        assert!(executed[3].starts_with("INSERT INTO"));
    }

    #[tokio::test]
    async fn strict_policy_aborts_on_first_failure() {
        let executor = RecordingExecutor::failing(vec!["CREATE TABLE"]);
        let err = KeyspacePopulator::new()
            .with_script(schema())
            .with_script(data())
            .populate(&executor)
            .await
            .unwrap_err();

        match err {
            DbError::Statement { script, index, .. } => {
                assert_eq!(script, "schema.cql");
                assert_eq!(index, 2);
            }
            other => panic!("Expected Statement error, got {:?}", other),
        }
        assert_eq!(executor.executed().len(), 2);
    }

    #[tokio::test]
    async fn strict_policy_does_not_ignore_failed_drops() {
        let executor = RecordingExecutor::failing(vec!["DROP TABLE"]);
        let result = KeyspacePopulator::new()
            .with_script(schema())
            .populate(&executor)
            .await;

        assert!(matches!(result, Err(DbError::Statement { index: 1, .. })));
    }

    #[tokio::test]
    async fn failed_drops_can_be_ignored() {
        let executor = RecordingExecutor::failing(vec!["DROP TABLE"]);
        let report = KeyspacePopulator::new()
            .with_script(schema())
            .ignore_failed_drops(true)
            .populate(&executor)
            .await
            .unwrap();

        assert_eq!(report, PopulationReport { executed: 2, failed: 1 });
    }

    #[tokio::test]
    async fn ignoring_drops_still_fails_other_statements() {
        let executor = RecordingExecutor::failing(vec!["CREATE INDEX"]);
        let result = KeyspacePopulator::new()
            .with_script(schema())
            .ignore_failed_drops(true)
            .populate(&executor)
            .await;

        assert!(matches!(result, Err(DbError::Statement { index: 3, .. })));
    }

    #[tokio::test]
    async fn continue_on_error_runs_everything() {
        let executor = RecordingExecutor::failing(vec!["CREATE"]);
        let report = KeyspacePopulator::new()
            .with_script(schema())
            .with_script(data())
            .continue_on_error(true)
            .populate(&executor)
            .await
            .unwrap();

        assert_eq!(report, PopulationReport { executed: 2, failed: 2 });
        assert_eq!(executor.executed().len(), 4);
    }

    #[tokio::test]
    async fn reapplying_schema_fails_under_strict_policy() {
        let executor = RecordingExecutor::failing(vec!["CREATE TABLE", "CREATE INDEX"]);
        let populator = KeyspacePopulator::new().with_script(ScriptResource::embedded(
            "schema.cql",
            "CREATE TABLE test.users (id int PRIMARY KEY, name text);",
        ));

        let err = populator.populate(&executor).await.unwrap_err();
        assert!(err.to_string().contains("schema.cql"));
    }

    #[test]
    fn drop_detection_is_case_insensitive() {
        assert!(is_drop("drop index users_name_idx"));
        assert!(is_drop("DROP KEYSPACE test"));
        assert!(!is_drop("CREATE TABLE dropped (id int PRIMARY KEY)"));
    }
}
