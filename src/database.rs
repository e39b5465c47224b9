use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::ports::{DrawRepo, InsertOutcome, RepoError};
use crate::stats::{draw_scopes, drift, scopes_of, tally};
use crate::types::{
    CountQuery, DrawFilter, DrawId, DrawRecord, GameType, NumberStatistic, Page, StatDrift,
    StatScope,
};

const DRAW_COLUMNS: &str =
    "id, owner_id, game_type, numbers, mas_number, generated_at, is_deleted, deleted_at";

/// SQLite-backed repository. One connection, used from blocking tasks.
#[derive(Clone)]
pub struct SqliteDrawRepo {
    conn: Arc<Mutex<Connection>>,
}

pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS draws (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            game_type TEXT NOT NULL,
            numbers TEXT NOT NULL,
            mas_number INTEGER,
            generated_at TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_draws_owner_generated
            ON draws (owner_id, generated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_draws_game
            ON draws (game_type, is_deleted);

        CREATE TABLE IF NOT EXISTS number_statistics (
            number INTEGER NOT NULL,
            scope TEXT NOT NULL,
            frequency INTEGER NOT NULL DEFAULT 0,
            last_appearance TEXT,
            PRIMARY KEY (number, scope)
        );",
    )
}

impl SqliteDrawRepo {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        ensure_parent_dir(path).map_err(|e| RepoError::database("open", e))?;
        let conn = Connection::open(path).map_err(|e| sql_error("open", e))?;
        conn.busy_timeout(std::time::Duration::from_secs(2))
            .map_err(|e| sql_error("open", e))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, RepoError> {
        let conn = Connection::open_in_memory().map_err(|e| sql_error("open", e))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, RepoError> {
        create_tables(&conn).map_err(|e| sql_error("create_tables", e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepoError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| RepoError::database(operation, "connection lock poisoned"))?;
            f(&mut guard).map_err(|e| sql_error(operation, e))
        })
        .await
        .map_err(|e| RepoError::database(operation, e))?
    }
}

fn sql_error(operation: &'static str, error: rusqlite::Error) -> RepoError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            RepoError::constraint(&error)
        }
        rusqlite::Error::FromSqlConversionFailure(..) => RepoError::serialization(&error),
        _ => RepoError::database(operation, &error),
    }
}

fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure<E>(idx: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => time_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DrawRecord> {
    let id: String = row.get(0)?;
    let game_type: String = row.get(2)?;
    let numbers: String = row.get(3)?;

    Ok(DrawRecord {
        id: id.parse().map_err(|e| conversion_failure(0, e))?,
        owner_id: row.get(1)?,
        game_type: game_type.parse().map_err(|e| conversion_failure(2, e))?,
        main_numbers: serde_json::from_str(&numbers).map_err(|e| conversion_failure(3, e))?,
        secondary_number: row.get(4)?,
        generated_at: time_column(row, 5)?,
        is_deleted: row.get(6)?,
        deleted_at: optional_time_column(row, 7)?,
    })
}

fn row_to_statistic(row: &Row<'_>) -> rusqlite::Result<NumberStatistic> {
    let scope: String = row.get(1)?;
    let frequency: i64 = row.get(2)?;
    Ok(NumberStatistic {
        number: row.get(0)?,
        scope: scope.parse().map_err(|e| conversion_failure(1, e))?,
        frequency: frequency.max(0) as u64,
        last_appearance: optional_time_column(row, 3)?,
    })
}

fn filter_clause(filter: &DrawFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(owner_id) = &filter.owner_id {
        conditions.push("owner_id = ?");
        values.push(Value::Text(owner_id.clone()));
    }
    if let Some(game) = filter.game_type {
        conditions.push("game_type = ?");
        values.push(Value::Text(game.as_str().to_string()));
    }
    if !filter.include_deleted {
        conditions.push("is_deleted = 0");
    }
    (where_sql(&conditions), values)
}

fn count_clause(query: &CountQuery) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(owner_id) = &query.owner_id {
        conditions.push("owner_id = ?");
        values.push(Value::Text(owner_id.clone()));
    }
    if let Some(game) = query.game_type {
        conditions.push("game_type = ?");
        values.push(Value::Text(game.as_str().to_string()));
    }
    if let Some(deleted) = query.deleted {
        conditions.push("is_deleted = ?");
        values.push(Value::Integer(deleted as i64));
    }
    if let Some(since) = query.generated_since {
        conditions.push("generated_at >= ?");
        values.push(Value::Text(to_db_time(since)));
    }
    (where_sql(&conditions), values)
}

fn where_sql(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn select_active_draws(conn: &Connection, game: GameType) -> rusqlite::Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM draws WHERE game_type = ?1 AND is_deleted = 0",
        DRAW_COLUMNS
    ))?;
    stmt.query_map([game.as_str()], row_to_record)?
        .collect()
}

fn select_statistics(conn: &Connection, scope: StatScope) -> rusqlite::Result<Vec<NumberStatistic>> {
    let mut stmt = conn.prepare_cached(
        "SELECT number, scope, frequency, last_appearance
         FROM number_statistics WHERE scope = ?1 ORDER BY number",
    )?;
    stmt.query_map([scope.key()], row_to_statistic)?
        .collect()
}

fn count_numbers(
    conn: &Connection,
    scope: StatScope,
    numbers: &[u8],
    at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO number_statistics (number, scope, frequency, last_appearance)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(number, scope) DO UPDATE SET
            frequency = frequency + 1,
            last_appearance = CASE
                WHEN last_appearance IS NULL OR last_appearance < excluded.last_appearance
                THEN excluded.last_appearance
                ELSE last_appearance
            END",
    )?;
    let scope_key = scope.key();
    let at = to_db_time(at);
    for number in numbers {
        stmt.execute(params![number, scope_key, at])?;
    }
    Ok(())
}

// last_appearance is left as is; a rebuild recomputes it exactly.
fn uncount_numbers(conn: &Connection, scope: StatScope, numbers: &[u8]) -> rusqlite::Result<()> {
    let mut decrement = conn.prepare_cached(
        "UPDATE number_statistics SET frequency = MAX(frequency - 1, 0)
         WHERE number = ?1 AND scope = ?2",
    )?;
    let mut prune = conn.prepare_cached(
        "DELETE FROM number_statistics WHERE number = ?1 AND scope = ?2 AND frequency = 0",
    )?;
    let scope_key = scope.key();
    for number in numbers {
        decrement.execute(params![number, scope_key])?;
        prune.execute(params![number, scope_key])?;
    }
    Ok(())
}

fn count_draw(conn: &Connection, record: &DrawRecord) -> rusqlite::Result<()> {
    for (scope, numbers) in draw_scopes(record.game_type, &record.draw()) {
        count_numbers(conn, scope, &numbers, record.generated_at)?;
    }
    Ok(())
}

fn uncount_draw(conn: &Connection, record: &DrawRecord) -> rusqlite::Result<()> {
    for (scope, numbers) in draw_scopes(record.game_type, &record.draw()) {
        uncount_numbers(conn, scope, &numbers)?;
    }
    Ok(())
}

#[async_trait]
impl DrawRepo for SqliteDrawRepo {
    async fn insert_draw(&self, record: &DrawRecord) -> Result<InsertOutcome, RepoError> {
        let numbers = serde_json::to_string(&record.main_numbers).map_err(RepoError::serialization)?;
        let record = record.clone();
        self.with_conn("insert_draw", move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO draws (
                    id, owner_id, game_type, numbers, mas_number, generated_at, is_deleted, deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO NOTHING",
                params![
                    record.id.to_string(),
                    record.owner_id,
                    record.game_type.as_str(),
                    numbers,
                    record.secondary_number,
                    to_db_time(record.generated_at),
                    record.is_deleted,
                    record.deleted_at.map(to_db_time),
                ],
            )?;

            let mut outcome = InsertOutcome::default();
            if inserted > 0 && !record.is_deleted {
                tx.execute_batch("SAVEPOINT draw_statistics")?;
                match count_draw(&tx, &record) {
                    Ok(()) => tx.execute_batch("RELEASE draw_statistics")?,
                    Err(e) => {
                        tx.execute_batch(
                            "ROLLBACK TO draw_statistics; RELEASE draw_statistics",
                        )?;
                        outcome.statistics_error = Some(sql_error("insert_draw", e));
                    }
                }
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn get_draw(&self, id: DrawId) -> Result<Option<DrawRecord>, RepoError> {
        self.with_conn("get_draw", move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM draws WHERE id = ?1", DRAW_COLUMNS),
                [id.to_string()],
                row_to_record,
            )
            .optional()
        })
        .await
    }

    async fn set_deleted(
        &self,
        id: DrawId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        self.with_conn("set_deleted", move |conn| {
            let tx = conn.transaction()?;
            let changed = match deleted_at {
                Some(at) => tx.execute(
                    "UPDATE draws SET is_deleted = 1, deleted_at = ?1
                     WHERE id = ?2 AND is_deleted = 0",
                    params![to_db_time(at), id.to_string()],
                )?,
                None => tx.execute(
                    "UPDATE draws SET is_deleted = 0, deleted_at = NULL
                     WHERE id = ?1 AND is_deleted = 1",
                    [id.to_string()],
                )?,
            };
            if changed == 0 {
                return Ok(false);
            }

            let record = tx.query_row(
                &format!("SELECT {} FROM draws WHERE id = ?1", DRAW_COLUMNS),
                [id.to_string()],
                row_to_record,
            )?;
            if deleted_at.is_some() {
                uncount_draw(&tx, &record)?;
            } else {
                count_draw(&tx, &record)?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn delete_all_for_owner(
        &self,
        owner_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        let owner_id = owner_id.to_string();
        self.with_conn("delete_all_for_owner", move |conn| {
            let tx = conn.transaction()?;
            let records = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM draws WHERE owner_id = ?1 AND is_deleted = 0",
                    DRAW_COLUMNS
                ))?;
                stmt.query_map([&owner_id], row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.execute(
                "UPDATE draws SET is_deleted = 1, deleted_at = ?1
                 WHERE owner_id = ?2 AND is_deleted = 0",
                params![to_db_time(deleted_at), owner_id],
            )?;
            for record in &records {
                uncount_draw(&tx, record)?;
            }
            tx.commit()?;
            Ok(records.len() as u64)
        })
        .await
    }

    async fn list_draws(&self, filter: &DrawFilter) -> Result<Page<DrawRecord>, RepoError> {
        let filter = filter.clone();
        self.with_conn("list_draws", move |conn| {
            let (clause, mut values) = filter_clause(&filter);

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM draws{}", clause),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;

            values.push(Value::Integer(filter.limit as i64));
            values.push(Value::Integer(filter.offset as i64));
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM draws{} ORDER BY generated_at DESC, id DESC LIMIT ? OFFSET ?",
                DRAW_COLUMNS, clause
            ))?;
            let items = stmt
                .query_map(params_from_iter(values.iter()), row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Page {
                items,
                total: total.max(0) as u64,
                limit: filter.limit,
                offset: filter.offset,
            })
        })
        .await
    }

    async fn count_draws(&self, query: &CountQuery) -> Result<u64, RepoError> {
        let query = query.clone();
        self.with_conn("count_draws", move |conn| {
            let (clause, values) = count_clause(&query);
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM draws{}", clause),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn active_draws_for_game(&self, game: GameType) -> Result<Vec<DrawRecord>, RepoError> {
        self.with_conn("active_draws_for_game", move |conn| {
            select_active_draws(conn, game)
        })
        .await
    }

    async fn increment_statistics(
        &self,
        scope: StatScope,
        numbers: &[u8],
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let numbers = numbers.to_vec();
        self.with_conn("increment_statistics", move |conn| {
            let tx = conn.transaction()?;
            count_numbers(&tx, scope, &numbers, at)?;
            tx.commit()
        })
        .await
    }

    async fn statistics(&self, scope: StatScope) -> Result<Vec<NumberStatistic>, RepoError> {
        self.with_conn("statistics", move |conn| select_statistics(conn, scope))
            .await
    }

    async fn rebuild_statistics(&self, game: GameType) -> Result<Vec<StatDrift>, RepoError> {
        self.with_conn("rebuild_statistics", move |conn| {
            let tx = conn.transaction()?;
            let draws = select_active_draws(&tx, game)?;

            let mut report = Vec::new();
            for scope in scopes_of(game) {
                let actual = tally(scope, &draws);
                let stored = select_statistics(&tx, scope)?;
                report.extend(drift(scope, &stored, &actual));

                let scope_key = scope.key();
                tx.execute(
                    "DELETE FROM number_statistics WHERE scope = ?1",
                    [&scope_key],
                )?;
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO number_statistics (number, scope, frequency, last_appearance)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for stat in actual.values() {
                    stmt.execute(params![
                        stat.number,
                        scope_key,
                        stat.frequency as i64,
                        stat.last_appearance.map(to_db_time),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(report)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};
    use uuid::Uuid;

    fn record(owner: &str, game: GameType, numbers: Vec<u8>, at: DateTime<Utc>) -> DrawRecord {
        DrawRecord {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            game_type: game,
            main_numbers: numbers,
            secondary_number: None,
            generated_at: at,
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn record_round_trips_through_sqlite() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let now = Utc::now().trunc_subsecs(6);
        let mut draw = record("u1", GameType::Leidsa, vec![1, 5, 9, 20, 33, 40], now);
        draw.secondary_number = Some(12);
        repo.insert_draw(&draw).await.unwrap();

        let loaded = repo.get_draw(draw.id).await.unwrap().unwrap();
        assert_eq!(loaded, draw);
        assert!(repo.get_draw(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_ignored() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let draw = record("u1", GameType::Pale, vec![0, 99], Utc::now());
        repo.insert_draw(&draw).await.unwrap();
        repo.insert_draw(&draw).await.unwrap();
        assert_eq!(repo.count_draws(&CountQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_accumulates_frequency() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let scope = StatScope::Main(GameType::Kino);
        let t0 = Utc::now();
        repo.increment_statistics(scope, &[7, 8], t0).await.unwrap();
        repo.increment_statistics(scope, &[7], t0 + Duration::seconds(5))
            .await
            .unwrap();

        let stats = repo.statistics(scope).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].number, 7);
        assert_eq!(stats[0].frequency, 2);
        assert_eq!(
            stats[0].last_appearance.map(to_db_time),
            Some(to_db_time(t0 + Duration::seconds(5)))
        );
        assert_eq!(stats[1].frequency, 1);
        assert!(repo
            .statistics(StatScope::Secondary(GameType::Kino))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let scope = StatScope::Main(GameType::Pale);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.increment_statistics(scope, &[42], Utc::now()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let stats = repo.statistics(scope).await.unwrap();
        assert_eq!(stats[0].frequency, 20);
    }

    #[tokio::test]
    async fn transitions_happen_once_and_move_counters() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let scope = StatScope::Main(GameType::Pale);
        let t0 = Utc::now().trunc_subsecs(6);
        let draw = record("u1", GameType::Pale, vec![7, 8], t0);
        repo.insert_draw(&draw).await.unwrap();
        assert_eq!(repo.statistics(scope).await.unwrap().len(), 2);

        let first = t0 + Duration::minutes(1);
        assert!(repo.set_deleted(draw.id, Some(first)).await.unwrap());
        assert!(!repo
            .set_deleted(draw.id, Some(first + Duration::minutes(1)))
            .await
            .unwrap());
        let stored = repo.get_draw(draw.id).await.unwrap().unwrap();
        assert_eq!(stored.deleted_at, Some(first));
        assert!(repo.statistics(scope).await.unwrap().is_empty());

        assert!(repo.set_deleted(draw.id, None).await.unwrap());
        assert!(!repo.set_deleted(draw.id, None).await.unwrap());
        let stats = repo.statistics(scope).await.unwrap();
        assert_eq!(stats.iter().map(|s| s.frequency).sum::<u64>(), 2);
        assert!(!repo.set_deleted(Uuid::new_v4(), Some(first)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_all_uncounts_only_active_records() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let scope = StatScope::Main(GameType::Pale);
        let now = Utc::now();
        let kept = record("u2", GameType::Pale, vec![7, 9], now);
        let first = record("u1", GameType::Pale, vec![7, 8], now);
        let second = record("u1", GameType::Pale, vec![7, 10], now);
        for draw in [&kept, &first, &second] {
            repo.insert_draw(draw).await.unwrap();
        }
        repo.set_deleted(second.id, Some(now)).await.unwrap();

        assert_eq!(repo.delete_all_for_owner("u1", now).await.unwrap(), 1);
        let stats = repo.statistics(scope).await.unwrap();
        let counts: Vec<(u8, u64)> = stats.iter().map(|s| (s.number, s.frequency)).collect();
        assert_eq!(counts, vec![(7, 1), (9, 1)]);
    }

    #[tokio::test]
    async fn counter_failure_keeps_the_inserted_record() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER statistics_offline BEFORE INSERT ON number_statistics
             BEGIN SELECT RAISE(ABORT, 'statistics offline'); END;",
        )
        .unwrap();
        let repo = SqliteDrawRepo::from_connection(conn).unwrap();

        let draw = record("u1", GameType::Pale, vec![1, 2], Utc::now().trunc_subsecs(6));
        let outcome = repo.insert_draw(&draw).await.unwrap();
        assert!(outcome.statistics_error.is_some());
        assert_eq!(repo.get_draw(draw.id).await.unwrap(), Some(draw));
    }

    #[tokio::test]
    async fn rebuild_reports_and_repairs_drift() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let scope = StatScope::Main(GameType::Pale);
        let now = Utc::now().trunc_subsecs(6);
        repo.insert_draw(&record("u1", GameType::Pale, vec![3, 4], now))
            .await
            .unwrap();
        repo.increment_statistics(scope, &[4, 50], now).await.unwrap();

        let drift = repo.rebuild_statistics(GameType::Pale).await.unwrap();
        let found: Vec<(u8, u64, u64)> = drift.iter().map(|d| (d.number, d.stored, d.actual)).collect();
        assert_eq!(found, vec![(4, 2, 1), (50, 1, 0)]);

        let stats = repo.statistics(scope).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].last_appearance, Some(now));
        assert!(repo.rebuild_statistics(GameType::Pale).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rebuilds_interleaved_with_inserts_lose_nothing() {
        let repo = SqliteDrawRepo::in_memory().unwrap();
        let mut handles = Vec::new();
        for i in 0..20u8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let draw = record("u1", GameType::Pale, vec![42, i], Utc::now());
                repo.insert_draw(&draw).await?;
                repo.rebuild_statistics(GameType::Pale).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = repo.statistics(StatScope::Main(GameType::Pale)).await.unwrap();
        let forty_two = stats.iter().find(|s| s.number == 42).unwrap();
        assert_eq!(forty_two.frequency, 20);
        assert!(repo.rebuild_statistics(GameType::Pale).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lotto.db");
        let draw = record("u1", GameType::Tripleta, vec![3, 4, 5], Utc::now().trunc_subsecs(6));
        {
            let repo = SqliteDrawRepo::open(&path).unwrap();
            repo.insert_draw(&draw).await.unwrap();
        }
        let repo = SqliteDrawRepo::open(&path).unwrap();
        assert_eq!(repo.get_draw(draw.id).await.unwrap(), Some(draw));
    }
}
