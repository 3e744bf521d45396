use std::{fmt::Display, future::Future, time::Duration};

/// Polls `check` until it succeeds and returns the number of attempts.
///
/// There is no upper bound; the surrounding orchestration decides how long a
/// start-up may take.
pub async fn wait_for_db<F, Fut, E>(mut check: F, delay: Duration) -> u32
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    log::info!("Waiting for database...");

    let mut attempts = 1;
    while let Err(e) = check().await {
        log::debug!("Database check failed: {e}");
        log::info!("Database unavailable, waiting 1 second...");
        tokio::time::sleep(delay).await;
        attempts += 1;
    }

    log::info!("Database available!");
    attempts
}
