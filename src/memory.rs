//! In-memory [`DrawRepo`] used by tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::ports::{DrawRepo, InsertOutcome, RepoError};
use crate::stats::{draw_scopes, drift, scopes_of, tally};
use crate::types::{
    CountQuery, DrawFilter, DrawId, DrawRecord, GameType, NumberStatistic, Page, StatDrift,
    StatScope,
};

#[derive(Default)]
struct State {
    draws: HashMap<DrawId, DrawRecord>,
    stats: HashMap<(StatScope, u8), NumberStatistic>,
}

#[derive(Default)]
pub struct InMemoryDrawRepo {
    state: Mutex<State>,
}

impl State {
    fn count(&mut self, scope: StatScope, numbers: &[u8], at: DateTime<Utc>) {
        for &number in numbers {
            let stat = self
                .stats
                .entry((scope, number))
                .or_insert_with(|| NumberStatistic::unseen(number, scope));
            stat.frequency += 1;
            stat.last_appearance = stat.last_appearance.max(Some(at));
        }
    }

    fn uncount(&mut self, scope: StatScope, numbers: &[u8]) {
        for &number in numbers {
            if let Some(stat) = self.stats.get_mut(&(scope, number)) {
                stat.frequency = stat.frequency.saturating_sub(1);
                if stat.frequency == 0 {
                    self.stats.remove(&(scope, number));
                }
            }
        }
    }

    fn count_draw(&mut self, record: &DrawRecord) {
        for (scope, numbers) in draw_scopes(record.game_type, &record.draw()) {
            self.count(scope, &numbers, record.generated_at);
        }
    }

    fn uncount_draw(&mut self, record: &DrawRecord) {
        for (scope, numbers) in draw_scopes(record.game_type, &record.draw()) {
            self.uncount(scope, &numbers);
        }
    }

    fn scope_statistics(&self, scope: StatScope) -> Vec<NumberStatistic> {
        let mut stats: Vec<NumberStatistic> = self
            .stats
            .values()
            .filter(|s| s.scope == scope)
            .cloned()
            .collect();
        stats.sort_by_key(|s| s.number);
        stats
    }
}

impl InMemoryDrawRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, RepoError> {
        self.state
            .lock()
            .map_err(|_| RepoError::database(operation, "state lock poisoned"))
    }
}

fn matches_filter(record: &DrawRecord, filter: &DrawFilter) -> bool {
    filter.owner_id.as_deref().is_none_or(|o| record.owner_id == o)
        && filter.game_type.is_none_or(|g| record.game_type == g)
        && (filter.include_deleted || !record.is_deleted)
}

fn matches_count(record: &DrawRecord, query: &CountQuery) -> bool {
    query.owner_id.as_deref().is_none_or(|o| record.owner_id == o)
        && query.game_type.is_none_or(|g| record.game_type == g)
        && query.deleted.is_none_or(|d| record.is_deleted == d)
        && query.generated_since.is_none_or(|t| record.generated_at >= t)
}

#[async_trait]
impl DrawRepo for InMemoryDrawRepo {
    async fn insert_draw(&self, record: &DrawRecord) -> Result<InsertOutcome, RepoError> {
        let mut state = self.lock("insert_draw")?;
        if state.draws.contains_key(&record.id) {
            return Ok(InsertOutcome::default());
        }
        state.draws.insert(record.id, record.clone());
        if !record.is_deleted {
            state.count_draw(record);
        }
        Ok(InsertOutcome::default())
    }

    async fn get_draw(&self, id: DrawId) -> Result<Option<DrawRecord>, RepoError> {
        Ok(self.lock("get_draw")?.draws.get(&id).cloned())
    }

    async fn set_deleted(
        &self,
        id: DrawId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        let mut state = self.lock("set_deleted")?;
        let Some(record) = state.draws.get_mut(&id) else {
            return Ok(false);
        };
        if record.is_deleted == deleted_at.is_some() {
            return Ok(false);
        }
        record.is_deleted = deleted_at.is_some();
        record.deleted_at = deleted_at;

        let record = record.clone();
        if record.is_deleted {
            state.uncount_draw(&record);
        } else {
            state.count_draw(&record);
        }
        Ok(true)
    }

    async fn delete_all_for_owner(
        &self,
        owner_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let mut state = self.lock("delete_all_for_owner")?;
        let mut affected = Vec::new();
        for record in state.draws.values_mut() {
            if record.owner_id == owner_id && !record.is_deleted {
                record.is_deleted = true;
                record.deleted_at = Some(deleted_at);
                affected.push(record.clone());
            }
        }
        for record in &affected {
            state.uncount_draw(record);
        }
        Ok(affected.len() as u64)
    }

    async fn list_draws(&self, filter: &DrawFilter) -> Result<Page<DrawRecord>, RepoError> {
        let state = self.lock("list_draws")?;
        let mut matching: Vec<&DrawRecord> = state
            .draws
            .values()
            .filter(|r| matches_filter(r, filter))
            .collect();
        matching.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn count_draws(&self, query: &CountQuery) -> Result<u64, RepoError> {
        let state = self.lock("count_draws")?;
        Ok(state.draws.values().filter(|r| matches_count(r, query)).count() as u64)
    }

    async fn active_draws_for_game(&self, game: GameType) -> Result<Vec<DrawRecord>, RepoError> {
        let state = self.lock("active_draws_for_game")?;
        Ok(state
            .draws
            .values()
            .filter(|r| r.game_type == game && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn increment_statistics(
        &self,
        scope: StatScope,
        numbers: &[u8],
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        self.lock("increment_statistics")?.count(scope, numbers, at);
        Ok(())
    }

    async fn statistics(&self, scope: StatScope) -> Result<Vec<NumberStatistic>, RepoError> {
        Ok(self.lock("statistics")?.scope_statistics(scope))
    }

    async fn rebuild_statistics(&self, game: GameType) -> Result<Vec<StatDrift>, RepoError> {
        let mut state = self.lock("rebuild_statistics")?;
        let draws: Vec<DrawRecord> = state
            .draws
            .values()
            .filter(|r| r.game_type == game && !r.is_deleted)
            .cloned()
            .collect();

        let mut report = Vec::new();
        for scope in scopes_of(game) {
            let actual = tally(scope, &draws);
            report.extend(drift(scope, &state.scope_statistics(scope), &actual));
            state.stats.retain(|(s, _), _| *s != scope);
            for (number, stat) in actual {
                state.stats.insert((scope, number), stat);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn pale(numbers: [u8; 2]) -> DrawRecord {
        DrawRecord {
            id: Uuid::new_v4(),
            owner_id: "u1".into(),
            game_type: GameType::Pale,
            main_numbers: numbers.to_vec(),
            secondary_number: None,
            generated_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_counts_once() {
        let repo = InMemoryDrawRepo::new();
        let draw = pale([7, 8]);
        repo.insert_draw(&draw).await.unwrap();
        repo.insert_draw(&draw).await.unwrap();

        let stats = repo.statistics(StatScope::Main(GameType::Pale)).await.unwrap();
        assert_eq!(stats.iter().map(|s| s.frequency).collect::<Vec<_>>(), vec![1, 1]);
    }

    #[tokio::test]
    async fn second_delete_keeps_first_timestamp_and_counters() {
        let repo = InMemoryDrawRepo::new();
        let scope = StatScope::Main(GameType::Pale);
        let (a, b) = (pale([7, 8]), pale([7, 9]));
        repo.insert_draw(&a).await.unwrap();
        repo.insert_draw(&b).await.unwrap();

        let first = a.generated_at + chrono::Duration::hours(1);
        assert!(repo.set_deleted(a.id, Some(first)).await.unwrap());
        assert!(!repo
            .set_deleted(a.id, Some(first + chrono::Duration::hours(1)))
            .await
            .unwrap());

        assert_eq!(repo.get_draw(a.id).await.unwrap().unwrap().deleted_at, Some(first));
        let counts: Vec<(u8, u64)> = repo
            .statistics(scope)
            .await
            .unwrap()
            .iter()
            .map(|s| (s.number, s.frequency))
            .collect();
        assert_eq!(counts, vec![(7, 1), (9, 1)]);
    }
}
