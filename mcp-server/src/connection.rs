use anyhow::{Context, Result};
use std::sync::Arc;

use lotto_rd::clock::{SystemClock, SystemRandom};
use lotto_rd::config::Config;
use lotto_rd::database::SqliteDrawRepo;
use lotto_rd::resilient::ResilientDrawRepo;
use lotto_rd::{DrawRepo, RecordManager};

/// Opens the SQLite store (creating tables on first use) behind the retrying
/// decorator.
pub fn open_repository(config: &Config) -> Result<Arc<dyn DrawRepo>> {
    let sqlite = SqliteDrawRepo::open(&config.database_path).with_context(|| {
        format!("cannot open database {}", config.database_path.display())
    })?;
    Ok(Arc::new(ResilientDrawRepo::new(
        Arc::new(sqlite),
        config.retry_config(),
    )))
}

pub fn manager(repo: Arc<dyn DrawRepo>) -> RecordManager {
    RecordManager::new(repo, Arc::new(SystemClock), Arc::new(SystemRandom))
}
