//! Draw persistence, soft-delete bookkeeping and number statistics.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::RequestContext;
use crate::catalog::{self, NumberRange};
use crate::error::LottoError;
use crate::generator::{DrawGenerator, MAX_DEMO_QUANTITY, MAX_QUANTITY, validate_draw};
use crate::ports::{ClockPort, DrawRepo, InsertOutcome, RandomPort, RepoError};
use crate::stats::{draw_scopes, tally};
use crate::types::{
    AdminOverview, CountQuery, DEFAULT_PAGE_SIZE, Draw, DrawFilter, DrawId, DrawQuery,
    DrawRecord, DriftReport, GameType, GenerateOptions, HotColdNumbers, MAX_PAGE_SIZE,
    NumberFrequency, NumberStatistic, Page, ProbabilityAnalysis, StatScope, UserStats,
};
use crate::utils::activity_bucket;

/// Size of the hot and cold lists in a probability analysis.
pub const ANALYSIS_HOT_COLD_SIZE: usize = 10;

/// Result of saving one draw. The record is persisted even when
/// `statistics_error` is set.
#[derive(Debug)]
pub struct CreatedDraw {
    pub record: DrawRecord,
    pub statistics_error: Option<LottoError>,
}

pub struct RecordManager {
    repo: Arc<dyn DrawRepo>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    generator: DrawGenerator,
}

impl RecordManager {
    pub fn new(
        repo: Arc<dyn DrawRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let generator = DrawGenerator::new(Arc::clone(&random));
        Self {
            repo,
            clock,
            random,
            generator,
        }
    }

    pub fn generator(&self) -> &DrawGenerator {
        &self.generator
    }

    // Storage keeps microseconds; trim here so returned records equal stored ones.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    /// Generation without an account and without persistence.
    pub fn generate_demo(
        &self,
        game: GameType,
        options: GenerateOptions,
        quantity: u32,
    ) -> Result<Vec<Draw>, LottoError> {
        self.generator
            .generate_many(game, options, quantity, MAX_DEMO_QUANTITY)
    }

    /// The user-facing "generate and save" action. Each draw is saved as an
    /// independent record.
    pub async fn generate_and_save(
        &self,
        ctx: &RequestContext,
        game: GameType,
        options: GenerateOptions,
        quantity: u32,
    ) -> Result<Vec<CreatedDraw>, LottoError> {
        ctx.require_owner()?;
        let draws = self
            .generator
            .generate_many(game, options, quantity, MAX_QUANTITY)?;

        let mut created = Vec::with_capacity(draws.len());
        for draw in draws {
            created.push(self.create_draw(ctx, game, draw).await?);
        }
        Ok(created)
    }

    pub async fn create_draw(
        &self,
        ctx: &RequestContext,
        game: GameType,
        draw: Draw,
    ) -> Result<CreatedDraw, LottoError> {
        let owner_id = ctx.require_owner()?;
        validate_draw(game, &draw)?;

        let now = self.now();
        let record = DrawRecord {
            id: self.random.gen_uuid(),
            owner_id: owner_id.to_string(),
            game_type: game,
            main_numbers: draw.main_numbers,
            secondary_number: draw.secondary_number,
            generated_at: now,
            is_deleted: false,
            deleted_at: None,
        };

        let outcome = match self.repo.insert_draw(&record).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_timeout() => self.confirm_timed_out_insert(&record, e).await?,
            Err(e) => {
                error!(owner_id, game = %game, error = %e, "failed to save draw");
                return Err(e.into());
            }
        };
        info!(draw_id = %record.id, owner_id, game = %game, "draw saved");

        let statistics_error = outcome.statistics_error.map(|e| {
            warn!(draw_id = %record.id, game = %game, error = %e, "number statistics update failed");
            LottoError::StatisticsUpdateFailed(e.to_string())
        });
        Ok(CreatedDraw {
            record,
            statistics_error,
        })
    }

    /// A timed-out insert may still commit in the background. One lookup
    /// decides whether the caller sees a saved draw or the timeout.
    async fn confirm_timed_out_insert(
        &self,
        record: &DrawRecord,
        timeout: RepoError,
    ) -> Result<InsertOutcome, LottoError> {
        match self.repo.get_draw(record.id).await {
            Ok(Some(_)) => {
                warn!(draw_id = %record.id, error = %timeout, "insert timed out after committing");
                Ok(InsertOutcome::default())
            }
            _ => {
                error!(
                    owner_id = %record.owner_id,
                    game = %record.game_type,
                    error = %timeout,
                    "failed to save draw"
                );
                Err(timeout.into())
            }
        }
    }

    /// Counts an unsaved (demo) draw in the number statistics. These counts
    /// belong to no record, so a statistics rebuild discards them.
    pub async fn record_demo_statistics(
        &self,
        ctx: &RequestContext,
        game: GameType,
        draw: &Draw,
    ) -> Result<(), LottoError> {
        ctx.require_owner()?;
        validate_draw(game, draw)?;

        let at = self.now();
        let mut failures = Vec::new();
        for (scope, numbers) in draw_scopes(game, draw) {
            if let Err(e) = self.repo.increment_statistics(scope, &numbers, at).await {
                failures.push(format!("{}: {}", scope, e));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        let message = failures.join("; ");
        warn!(game = %game, error = %message, "number statistics update failed");
        Err(LottoError::StatisticsUpdateFailed(message))
    }

    pub async fn list_draws(
        &self,
        ctx: &RequestContext,
        query: DrawQuery,
    ) -> Result<Page<DrawRecord>, LottoError> {
        let caller = ctx.require_owner()?;
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(LottoError::invalid_options(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let owner_id = if ctx.is_admin() {
            query.owner_id
        } else {
            if query.include_deleted {
                return Err(LottoError::NotAdmin);
            }
            match query.owner_id {
                Some(owner) if owner != caller => {
                    return Err(LottoError::NotAuthorized(format!(
                        "cannot list draws of {}",
                        owner
                    )));
                }
                _ => Some(caller.to_string()),
            }
        };

        let filter = DrawFilter {
            owner_id,
            game_type: query.game_type,
            include_deleted: query.include_deleted,
            limit,
            offset: query.offset.unwrap_or(0),
        };
        Ok(self.repo.list_draws(&filter).await?)
    }

    async fn fetch_draw(&self, id: DrawId) -> Result<DrawRecord, LottoError> {
        self.repo
            .get_draw(id)
            .await?
            .ok_or_else(|| LottoError::NotFound {
                entity: "Draw",
                id: id.to_string(),
            })
    }

    /// Soft-deletes a record owned by the caller (any record for admins).
    /// Deleting an already deleted record succeeds without changes.
    pub async fn soft_delete(&self, ctx: &RequestContext, id: DrawId) -> Result<(), LottoError> {
        let caller = ctx.require_owner()?;
        let record = self.fetch_draw(id).await?;
        if !ctx.can_access(&record.owner_id) {
            return Err(LottoError::NotAuthorized(format!(
                "draw {} belongs to another account",
                id
            )));
        }
        if record.is_deleted {
            debug!(draw_id = %id, "draw already deleted");
            return Ok(());
        }

        if self.repo.set_deleted(id, Some(self.now())).await? {
            info!(draw_id = %id, caller, "draw soft-deleted");
        } else {
            debug!(draw_id = %id, "draw deleted by a concurrent request");
        }
        Ok(())
    }

    /// Soft-deletes every active record of the caller.
    pub async fn soft_delete_all(&self, ctx: &RequestContext) -> Result<u64, LottoError> {
        let owner_id = ctx.require_owner()?;
        let affected = self
            .repo
            .delete_all_for_owner(owner_id, self.now())
            .await?;
        info!(owner_id, affected, "all draws soft-deleted");
        Ok(affected)
    }

    pub async fn restore(&self, ctx: &RequestContext, id: DrawId) -> Result<(), LottoError> {
        let admin = ctx.require_admin()?;
        let record = self.fetch_draw(id).await?;
        if !record.is_deleted {
            return Ok(());
        }
        if self.repo.set_deleted(id, None).await? {
            info!(draw_id = %id, admin, "draw restored");
        }
        Ok(())
    }

    pub async fn compute_user_stats(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
    ) -> Result<UserStats, LottoError> {
        ctx.require_owner()?;
        if !ctx.can_access(owner_id) {
            return Err(LottoError::NotAuthorized(format!(
                "cannot read statistics of {}",
                owner_id
            )));
        }

        let latest = self
            .repo
            .list_draws(&DrawFilter {
                owner_id: Some(owner_id.to_string()),
                limit: 1,
                ..DrawFilter::default()
            })
            .await?;

        let mut per_game_counts = BTreeMap::new();
        for game in GameType::ALL {
            let count = self
                .repo
                .count_draws(&CountQuery {
                    owner_id: Some(owner_id.to_string()),
                    game_type: Some(game),
                    deleted: Some(false),
                    generated_since: None,
                })
                .await?;
            per_game_counts.insert(game, count);
        }

        Ok(UserStats {
            total_generations: latest.total,
            per_game_counts,
            most_recent_activity: activity_bucket(
                self.clock.now(),
                latest.items.first().map(|r| r.generated_at),
            ),
        })
    }

    pub async fn get_hot_cold_numbers(
        &self,
        game: GameType,
        limit: usize,
    ) -> Result<HotColdNumbers, LottoError> {
        self.hot_cold(StatScope::Main(game), limit).await
    }

    /// Hot and cold "Más" numbers.
    pub async fn get_hot_cold_secondary(
        &self,
        game: GameType,
        limit: usize,
    ) -> Result<HotColdNumbers, LottoError> {
        if !catalog::definition(game).has_secondary() {
            return Err(LottoError::invalid_options(format!("{} has no Más number", game)));
        }
        self.hot_cold(StatScope::Secondary(game), limit).await
    }

    async fn hot_cold(&self, scope: StatScope, limit: usize) -> Result<HotColdNumbers, LottoError> {
        if limit == 0 {
            return Err(LottoError::invalid_options("limit must be at least 1"));
        }
        let stats = self.scope_statistics(scope).await?;

        let mut hot: Vec<NumberStatistic> =
            stats.iter().filter(|s| s.frequency > 0).cloned().collect();
        hot.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| recency_then_number(a, b)));
        hot.truncate(limit);

        let mut cold = stats;
        cold.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| recency_then_number(a, b)));
        cold.truncate(limit);

        Ok(HotColdNumbers { hot, cold })
    }

    /// Stored counters for every number of the scope's range, zero-filled.
    async fn scope_statistics(&self, scope: StatScope) -> Result<Vec<NumberStatistic>, LottoError> {
        let Some(range) = scope_range(scope) else {
            return Ok(Vec::new());
        };
        let mut stored: BTreeMap<u8, NumberStatistic> = self
            .repo
            .statistics(scope)
            .await?
            .into_iter()
            .map(|s| (s.number, s))
            .collect();

        Ok(range
            .iter()
            .map(|n| stored.remove(&n).unwrap_or_else(|| NumberStatistic::unseen(n, scope)))
            .collect())
    }

    pub async fn probability_analysis(
        &self,
        game: GameType,
    ) -> Result<ProbabilityAnalysis, LottoError> {
        let total_generations = self
            .repo
            .count_draws(&CountQuery {
                game_type: Some(game),
                deleted: Some(false),
                ..CountQuery::default()
            })
            .await?;
        let stats = self.scope_statistics(StatScope::Main(game)).await?;

        let number_frequencies = stats
            .iter()
            .map(|s| NumberFrequency {
                number: s.number,
                frequency: s.frequency,
                percentage: percentage(s.frequency, total_generations),
            })
            .collect();
        let hot_cold = self
            .hot_cold(StatScope::Main(game), ANALYSIS_HOT_COLD_SIZE)
            .await?;

        Ok(ProbabilityAnalysis {
            game_type: game,
            total_generations,
            number_frequencies,
            hot_numbers: hot_cold.hot.iter().map(|s| s.number).collect(),
            cold_numbers: hot_cold.cold.iter().map(|s| s.number).collect(),
            last_updated: self.now(),
        })
    }

    /// Frequency of `number` computed from active draws, ignoring the stored
    /// counters.
    pub async fn frequency_from_draws(
        &self,
        scope: StatScope,
        number: u8,
    ) -> Result<u64, LottoError> {
        let draws = self.repo.active_draws_for_game(scope.game_type()).await?;
        Ok(tally(scope, &draws)
            .get(&number)
            .map(|s| s.frequency)
            .unwrap_or(0))
    }

    /// Rebuilds the stored counters of `game` from its active draws and
    /// reports every counter that disagreed.
    pub async fn recompute_statistics(
        &self,
        ctx: &RequestContext,
        game: GameType,
    ) -> Result<DriftReport, LottoError> {
        let admin = ctx.require_admin()?;
        let drift = self.repo.rebuild_statistics(game).await?;

        if drift.is_empty() {
            info!(game = %game, admin, "statistics consistent with active draws");
        } else {
            warn!(game = %game, admin, corrected = drift.len(), "statistics drift corrected");
        }
        Ok(DriftReport {
            game_type: game,
            drift,
        })
    }

    pub async fn admin_overview(&self, ctx: &RequestContext) -> Result<AdminOverview, LottoError> {
        ctx.require_admin()?;
        let now = self.now();

        let total_records = self.repo.count_draws(&CountQuery::default()).await?;
        let deleted_records = self
            .repo
            .count_draws(&CountQuery {
                deleted: Some(true),
                ..CountQuery::default()
            })
            .await?;
        let new_last_7_days = self
            .repo
            .count_draws(&CountQuery {
                generated_since: Some(now - Duration::days(7)),
                ..CountQuery::default()
            })
            .await?;
        let new_last_30_days = self
            .repo
            .count_draws(&CountQuery {
                generated_since: Some(now - Duration::days(30)),
                ..CountQuery::default()
            })
            .await?;

        let mut per_game_counts = BTreeMap::new();
        for game in GameType::ALL {
            let count = self
                .repo
                .count_draws(&CountQuery {
                    game_type: Some(game),
                    deleted: Some(false),
                    ..CountQuery::default()
                })
                .await?;
            per_game_counts.insert(game, count);
        }

        Ok(AdminOverview {
            total_records,
            active_records: total_records.saturating_sub(deleted_records),
            deleted_records,
            new_last_7_days,
            new_last_30_days,
            per_game_counts,
        })
    }
}

fn scope_range(scope: StatScope) -> Option<NumberRange> {
    let def = catalog::definition(scope.game_type());
    match scope {
        StatScope::Main(_) => Some(def.domain),
        StatScope::Secondary(_) => def.secondary,
    }
}

/// Most recent appearance first, then lowest number.
fn recency_then_number(a: &NumberStatistic, b: &NumberStatistic) -> std::cmp::Ordering {
    b.last_appearance
        .cmp(&a.last_appearance)
        .then_with(|| a.number.cmp(&b.number))
}

fn percentage(frequency: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = frequency as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SeededRandom};
    use crate::memory::InMemoryDrawRepo;
    use crate::ports::{MockDrawRepo, RepoError};
    use chrono::TimeZone;

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn manager_with(repo: Arc<dyn DrawRepo>) -> RecordManager {
        RecordManager::new(repo, fixed_clock(), Arc::new(SeededRandom::new(11)))
    }

    fn kino_draw() -> Draw {
        Draw {
            main_numbers: vec![1, 7, 12, 20, 33, 41, 50, 62, 70, 80],
            secondary_number: None,
        }
    }

    #[tokio::test]
    async fn statistics_failure_keeps_the_saved_draw() {
        let mut repo = MockDrawRepo::new();
        repo.expect_insert_draw().times(1).returning(|_| {
            Ok(InsertOutcome {
                statistics_error: Some(RepoError::database("insert_draw", "disk full")),
            })
        });

        let manager = manager_with(Arc::new(repo));
        let created = manager
            .create_draw(&RequestContext::user("u1"), GameType::Kino, kino_draw())
            .await
            .unwrap();

        assert_eq!(created.record.owner_id, "u1");
        assert!(!created.record.is_deleted);
        assert!(matches!(
            created.statistics_error,
            Some(LottoError::StatisticsUpdateFailed(_))
        ));
    }

    #[tokio::test]
    async fn failed_insert_is_reported() {
        let mut repo = MockDrawRepo::new();
        repo.expect_insert_draw()
            .times(1)
            .returning(|_| Err(RepoError::timeout("insert_draw", 5000)));
        repo.expect_get_draw().times(1).returning(|_| Ok(None));

        let manager = manager_with(Arc::new(repo));
        let err = manager
            .create_draw(&RequestContext::user("u1"), GameType::Kino, kino_draw())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn timed_out_insert_that_committed_is_a_save() {
        let mut repo = MockDrawRepo::new();
        repo.expect_insert_draw()
            .times(1)
            .returning(|_| Err(RepoError::timeout("insert_draw", 5000)));
        repo.expect_get_draw().times(1).returning(|id| {
            Ok(Some(DrawRecord {
                id,
                owner_id: "u1".into(),
                game_type: GameType::Kino,
                main_numbers: kino_draw().main_numbers,
                secondary_number: None,
                generated_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
                is_deleted: false,
                deleted_at: None,
            }))
        });

        let manager = manager_with(Arc::new(repo));
        let created = manager
            .create_draw(&RequestContext::user("u1"), GameType::Kino, kino_draw())
            .await
            .unwrap();
        assert_eq!(created.record.main_numbers, kino_draw().main_numbers);
        assert!(created.statistics_error.is_none());
    }

    #[tokio::test]
    async fn other_insert_errors_skip_the_lookup() {
        let mut repo = MockDrawRepo::new();
        repo.expect_insert_draw()
            .times(1)
            .returning(|_| Err(RepoError::constraint("CHECK failed")));
        repo.expect_get_draw().never();

        let manager = manager_with(Arc::new(repo));
        let err = manager
            .create_draw(&RequestContext::user("u1"), GameType::Kino, kino_draw())
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn secondary_number_counts_in_mas_scope() {
        let repo = Arc::new(InMemoryDrawRepo::new());
        let manager = manager_with(repo.clone());
        let draw = Draw {
            main_numbers: vec![2, 4, 6, 8, 10, 12],
            secondary_number: Some(5),
        };
        manager
            .create_draw(&RequestContext::user("u1"), GameType::Leidsa, draw)
            .await
            .unwrap();

        let mas = repo
            .statistics(StatScope::Secondary(GameType::Leidsa))
            .await
            .unwrap();
        assert_eq!(mas.len(), 1);
        assert_eq!((mas[0].number, mas[0].frequency), (5, 1));
        let main = repo
            .statistics(StatScope::Main(GameType::Leidsa))
            .await
            .unwrap();
        assert_eq!(main.len(), 6);
    }

    #[tokio::test]
    async fn anonymous_callers_cannot_save() {
        let manager = manager_with(Arc::new(InMemoryDrawRepo::new()));
        let err = manager
            .generate_and_save(
                &RequestContext::anonymous(),
                GameType::Pale,
                GenerateOptions::default(),
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LottoError::NotAuthenticated));

        let demo = manager
            .generate_demo(GameType::Pale, GenerateOptions::default(), 5)
            .unwrap();
        assert_eq!(demo.len(), 5);
    }

    #[tokio::test]
    async fn hot_and_cold_tie_breaks() {
        let repo = Arc::new(InMemoryDrawRepo::new());
        let clock = fixed_clock();
        let manager = RecordManager::new(repo.clone(), clock.clone(), Arc::new(SeededRandom::new(3)));
        let ctx = RequestContext::user("u1");

        manager
            .create_draw(&ctx, GameType::Pale, Draw { main_numbers: vec![10, 20], secondary_number: None })
            .await
            .unwrap();
        clock.advance(Duration::minutes(1));
        manager
            .create_draw(&ctx, GameType::Pale, Draw { main_numbers: vec![20, 30], secondary_number: None })
            .await
            .unwrap();

        let result = manager.get_hot_cold_numbers(GameType::Pale, 3).await.unwrap();
        let hot: Vec<(u8, u64)> = result.hot.iter().map(|s| (s.number, s.frequency)).collect();
        // 20 twice; 30 appeared more recently than 10
        assert_eq!(hot, vec![(20, 2), (30, 1), (10, 1)]);

        let cold: Vec<(u8, u64)> = result.cold.iter().map(|s| (s.number, s.frequency)).collect();
        assert_eq!(cold, vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[tokio::test]
    async fn hot_cold_secondary_requires_mas_game() {
        let manager = manager_with(Arc::new(InMemoryDrawRepo::new()));
        assert!(manager.get_hot_cold_secondary(GameType::Kino, 5).await.is_err());
        let result = manager
            .get_hot_cold_secondary(GameType::Leidsa, 20)
            .await
            .unwrap();
        assert!(result.hot.is_empty());
        assert_eq!(result.cold.len(), 12);
    }

    #[test]
    fn percentages_are_rounded() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 2), 100.0);
    }
}
