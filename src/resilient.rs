//! Timeout and bounded-retry wrapper around any [`DrawRepo`].
//!
//! Every call is bounded by `timeout_ms`. Retryable failures are retried with
//! exponential backoff and jitter. A timed-out call may still complete in the
//! background. Draw transitions are conditional and retry safely; a bare
//! statistics increment is not, so it is only retried on errors that rolled
//! back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{DrawRepo, InsertOutcome, RepoError};
use crate::types::{
    CountQuery, DrawFilter, DrawId, DrawRecord, GameType, NumberStatistic, Page, StatDrift,
    StatScope,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 0.0-1.0, spread applied around each delay.
    pub jitter_factor: f64,
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            jitter_factor: 0.2,
            timeout_ms: 5000,
        }
    }
}

pub struct ResilientDrawRepo {
    inner: Arc<dyn DrawRepo>,
    config: RetryConfig,
}

impl ResilientDrawRepo {
    pub fn new(inner: Arc<dyn DrawRepo>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }

    async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        idempotent: bool,
        call: F,
    ) -> Result<T, RepoError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RepoError::timeout(operation, self.config.timeout_ms)),
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt = attempt + 1,
                            operation,
                            "storage call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let retryable = error.is_retryable() && (idempotent || !error.is_timeout());
            if !retryable {
                return Err(error);
            }
            if attempt >= self.config.max_retries {
                tracing::error!(
                    attempts = attempt + 1,
                    error = %error,
                    operation,
                    "storage call failed after all retry attempts"
                );
                return Err(error);
            }

            attempt += 1;
            let delay = self.calculate_delay(attempt);
            tracing::warn!(
                attempt,
                max_retries = self.config.max_retries,
                delay_ms = delay,
                error = %error,
                operation,
                "storage call failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl DrawRepo for ResilientDrawRepo {
    async fn insert_draw(&self, record: &DrawRecord) -> Result<InsertOutcome, RepoError> {
        self.execute("insert_draw", true, || self.inner.insert_draw(record))
            .await
    }

    async fn get_draw(&self, id: DrawId) -> Result<Option<DrawRecord>, RepoError> {
        self.execute("get_draw", true, || self.inner.get_draw(id)).await
    }

    async fn set_deleted(
        &self,
        id: DrawId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        self.execute("set_deleted", true, || self.inner.set_deleted(id, deleted_at))
            .await
    }

    async fn delete_all_for_owner(
        &self,
        owner_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        self.execute("delete_all_for_owner", true, || {
            self.inner.delete_all_for_owner(owner_id, deleted_at)
        })
        .await
    }

    async fn list_draws(&self, filter: &DrawFilter) -> Result<Page<DrawRecord>, RepoError> {
        self.execute("list_draws", true, || self.inner.list_draws(filter))
            .await
    }

    async fn count_draws(&self, query: &CountQuery) -> Result<u64, RepoError> {
        self.execute("count_draws", true, || self.inner.count_draws(query))
            .await
    }

    async fn active_draws_for_game(&self, game: GameType) -> Result<Vec<DrawRecord>, RepoError> {
        self.execute("active_draws_for_game", true, || {
            self.inner.active_draws_for_game(game)
        })
        .await
    }

    async fn increment_statistics(
        &self,
        scope: StatScope,
        numbers: &[u8],
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        self.execute("increment_statistics", false, || {
            self.inner.increment_statistics(scope, numbers, at)
        })
        .await
    }

    async fn statistics(&self, scope: StatScope) -> Result<Vec<NumberStatistic>, RepoError> {
        self.execute("statistics", true, || self.inner.statistics(scope))
            .await
    }

    async fn rebuild_statistics(&self, game: GameType) -> Result<Vec<StatDrift>, RepoError> {
        self.execute("rebuild_statistics", true, || {
            self.inner.rebuild_statistics(game)
        })
        .await
    }
}
