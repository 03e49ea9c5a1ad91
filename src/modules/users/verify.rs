use anyhow::{ensure, Context};

use super::repository::UserRepository;
use super::SEEDED_USER_NAME;

/// Check that the seed script left exactly one user, retrievable by name.
///
/// Run in manual mode after startup; any failure aborts startup.
pub async fn verify_seeded_users(repository: &dyn UserRepository) -> anyhow::Result<()> {
    let count = repository
        .count()
        .await
        .context("failed to count seeded users")?;
    ensure!(count == 1, "expected exactly one seeded user, found {}", count);

    let seeded = repository
        .find_by_name(SEEDED_USER_NAME)
        .await
        .with_context(|| format!("failed to look up seeded user [{}]", SEEDED_USER_NAME))?;

    tracing::info!(target: "quarry-app", user = ?seeded, "seeded user lookup");

    let seeded = seeded.with_context(|| format!("seeded user [{}] not found", SEEDED_USER_NAME))?;
    ensure!(
        seeded.name() == SEEDED_USER_NAME,
        "seeded user name mismatch: expected [{}], found [{}]",
        SEEDED_USER_NAME,
        seeded.name()
    );

    tracing::info!(target: "quarry-app", "seeded users verified");
    Ok(())
}
