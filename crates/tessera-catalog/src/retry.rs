//! Bounded re-read-and-retry for conflicting updates.
//!
//! The core reports a stale version as `ConcurrencyConflict` and never
//! retries by itself. Callers that want to apply a change regardless use
//! [`submit_with_retry`], which re-reads the entity, re-applies the change
//! and resubmits with the fresh version. [`submit_with_configured_retry`]
//! does the same with the repository's configured `conflict_retry` policy.

use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use uuid::Uuid;

use tessera_core::{Entity, EntityRepository, RetryPolicy, SubmitResult, TesseraResult};

/// Exponential backoff described by a retry policy.
pub fn backoff(policy: &RetryPolicy) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_max_times(policy.max_retries as usize)
        .with_min_delay(Duration::from_millis(policy.initial_delay_ms))
        .with_max_delay(Duration::from_millis(policy.max_delay_ms))
        .with_factor(policy.multiplier)
}

/// Apply `mutate` to the latest snapshot of an entity and submit it.
///
/// Only conflicts are retried; any other error, including one returned by
/// `mutate`, is returned at once.
pub async fn submit_with_retry<F>(
    repo: &EntityRepository,
    entity_type: &str,
    id: Uuid,
    policy: &RetryPolicy,
    mutate: F,
) -> TesseraResult<SubmitResult>
where
    F: Fn(&mut Entity) -> TesseraResult<()>,
{
    let attempt = || async {
        let mut entity = repo.fetch(entity_type, id).await?;
        let observed = entity.version;
        mutate(&mut entity)?;
        repo.submit(entity_type, entity, Some(observed)).await
    };

    attempt
        .retry(backoff(policy))
        .when(|e| e.is_retryable())
        .notify(|err, dur| {
            tracing::warn!(
                entity_type,
                %id,
                error = %err,
                "Update conflicted, retrying in {:?}",
                dur
            );
        })
        .await
}

/// [`submit_with_retry`] using the repository's conflict retry policy.
pub async fn submit_with_configured_retry<F>(
    repo: &EntityRepository,
    entity_type: &str,
    id: Uuid,
    mutate: F,
) -> TesseraResult<SubmitResult>
where
    F: Fn(&mut Entity) -> TesseraResult<()>,
{
    submit_with_retry(repo, entity_type, id, repo.conflict_retry(), mutate).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_follows_policy() {
        use backon::BackoffBuilder;

        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay_ms: 5,
            max_delay_ms: 50,
            multiplier: 2.0,
        };
        let delays: Vec<Duration> = backoff(&policy).build().collect();
        assert_eq!(delays.len(), 2);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(50)));
    }
}
