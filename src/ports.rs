//! Port traits for storage, time and randomness.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{
    CountQuery, DrawFilter, DrawId, DrawRecord, GameType, NumberStatistic, Page, StatDrift,
    StatScope,
};

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl RepoError {
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn timeout(operation: &'static str, after_ms: u64) -> Self {
        Self::Timeout {
            operation,
            after_ms,
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn constraint(message: impl ToString) -> Self {
        Self::Constraint(message.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Timeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform integer in `[min, max]`.
    fn gen_range(&self, min: u8, max: u8) -> u8;
    fn gen_uuid(&self) -> Uuid;
}

/// Result of [`DrawRepo::insert_draw`]. The record is stored even when
/// `statistics_error` is set.
#[derive(Debug, Default)]
pub struct InsertOutcome {
    pub statistics_error: Option<RepoError>,
}

/// Persistence of draw records and number statistics.
///
/// Counters track active draws. Every call that changes whether a draw is
/// active updates the counters in the same transaction, so concurrent saves,
/// deletes, restores and rebuilds never lose or double an adjustment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DrawRepo: Send + Sync {
    /// Stores the record and counts its numbers. Inserting an id that already
    /// exists changes nothing, so a retry never counts twice.
    ///
    /// A counter failure does not roll back the record; it comes back in
    /// [`InsertOutcome`]. A call that times out may still commit afterwards:
    /// callers that need certainty look the id up with `get_draw`.
    async fn insert_draw(&self, record: &DrawRecord) -> Result<InsertOutcome, RepoError>;
    async fn get_draw(&self, id: DrawId) -> Result<Option<DrawRecord>, RepoError>;

    /// `Some(at)` moves an active record to deleted, `None` moves a deleted
    /// record back to active, adjusting its counters. Returns whether this
    /// call made the transition; false when the record was already in the
    /// target state or does not exist.
    async fn set_deleted(
        &self,
        id: DrawId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError>;
    /// Deletes every active record of the owner and uncounts them. Returns
    /// how many records changed.
    async fn delete_all_for_owner(
        &self,
        owner_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepoError>;

    /// Ordered by `generated_at` descending, then id descending.
    async fn list_draws(&self, filter: &DrawFilter) -> Result<Page<DrawRecord>, RepoError>;
    async fn count_draws(&self, query: &CountQuery) -> Result<u64, RepoError>;
    async fn active_draws_for_game(&self, game: GameType) -> Result<Vec<DrawRecord>, RepoError>;

    /// Counts numbers that belong to no stored record. Concurrent increments
    /// of the same key are never lost.
    async fn increment_statistics(
        &self,
        scope: StatScope,
        numbers: &[u8],
        at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
    async fn statistics(&self, scope: StatScope) -> Result<Vec<NumberStatistic>, RepoError>;
    /// Replaces every counter of `game` with a tally of its active draws,
    /// atomically with respect to all other calls, and returns the counters
    /// that disagreed.
    async fn rebuild_statistics(&self, game: GameType) -> Result<Vec<StatDrift>, RepoError>;
}
