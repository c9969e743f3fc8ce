//! Semaphore helpers for bounded stage concurrency

use npmirror_errors::Error;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Acquire a permit, naming `operation` if the semaphore was closed
///
/// # Errors
///
/// Returns an error if the semaphore is closed.
pub async fn acquire_semaphore_permit(
    semaphore: Arc<Semaphore>,
    operation: &str,
) -> Result<OwnedSemaphorePermit, Error> {
    semaphore
        .acquire_owned()
        .await
        .map_err(|_| Error::internal(format!("failed to acquire semaphore for {operation}")))
}

/// Create a semaphore with at least one permit
#[must_use]
pub fn create_semaphore(permits: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(permits.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_permits_still_makes_progress() {
        let semaphore = create_semaphore(0);
        let permit = acquire_semaphore_permit(semaphore.clone(), "test")
            .await
            .unwrap();
        assert_eq!(semaphore.available_permits(), 0);
        drop(permit);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_closed_semaphore_errors() {
        let semaphore = create_semaphore(2);
        semaphore.close();
        let err = acquire_semaphore_permit(semaphore, "lookups").await.unwrap_err();
        assert!(err.to_string().contains("lookups"));
    }
}
