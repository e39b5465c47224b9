#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use lotto_rd::clock::{FixedClock, SeededRandom};
use lotto_rd::database::SqliteDrawRepo;
use lotto_rd::memory::InMemoryDrawRepo;
use lotto_rd::{Draw, DrawRepo, RecordManager};

pub struct Harness {
    pub adapter: &'static str,
    pub manager: RecordManager,
    pub clock: Arc<FixedClock>,
    pub repo: Arc<dyn DrawRepo>,
}

fn harness(adapter: &'static str, repo: Arc<dyn DrawRepo>, seed: u64) -> Harness {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 4, 10, 8, 30, 0).unwrap(),
    ));
    let manager = RecordManager::new(
        Arc::clone(&repo),
        clock.clone(),
        Arc::new(SeededRandom::new(seed)),
    );
    Harness {
        adapter,
        manager,
        clock,
        repo,
    }
}

/// The same engine over each storage adapter.
pub fn harnesses() -> Vec<Harness> {
    vec![
        harness("memory", Arc::new(InMemoryDrawRepo::new()), 7),
        harness("sqlite", Arc::new(SqliteDrawRepo::in_memory().unwrap()), 7),
    ]
}

pub fn kino_with_seven(variant: u8) -> Draw {
    Draw {
        main_numbers: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10 + variant],
        secondary_number: None,
    }
}

pub fn pale(a: u8, b: u8) -> Draw {
    Draw {
        main_numbers: vec![a, b],
        secondary_number: None,
    }
}
