//! Counting rules shared by the storage adapters.
//!
//! Stored counters describe active draws only. Adapters apply these rules
//! inside the same transaction as the draw change that caused them.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog;
use crate::types::{Draw, DrawRecord, GameType, NumberStatistic, StatDrift, StatScope};

/// Scopes a game keeps counters in: its main numbers, plus "Más" where the
/// game has one.
pub fn scopes_of(game: GameType) -> Vec<StatScope> {
    let mut scopes = vec![StatScope::Main(game)];
    if catalog::definition(game).has_secondary() {
        scopes.push(StatScope::Secondary(game));
    }
    scopes
}

/// Numbers of one draw grouped by the scope they count in. Empty groups are
/// left out.
pub fn draw_scopes(game: GameType, draw: &Draw) -> Vec<(StatScope, Vec<u8>)> {
    let mut groups = Vec::with_capacity(2);
    if !draw.main_numbers.is_empty() {
        groups.push((StatScope::Main(game), draw.main_numbers.clone()));
    }
    if let Some(mas) = draw.secondary_number {
        groups.push((StatScope::Secondary(game), vec![mas]));
    }
    groups
}

/// Counters of `scope` computed from `draws`, ignoring deleted ones.
pub fn tally(scope: StatScope, draws: &[DrawRecord]) -> BTreeMap<u8, NumberStatistic> {
    let mut counts: BTreeMap<u8, NumberStatistic> = BTreeMap::new();
    let active = draws
        .iter()
        .filter(|d| d.game_type == scope.game_type() && !d.is_deleted);
    for draw in active {
        let numbers: &[u8] = match scope {
            StatScope::Main(_) => &draw.main_numbers,
            StatScope::Secondary(_) => draw.secondary_number.as_slice(),
        };
        for &number in numbers {
            let stat = counts
                .entry(number)
                .or_insert_with(|| NumberStatistic::unseen(number, scope));
            stat.frequency += 1;
            stat.last_appearance = stat.last_appearance.max(Some(draw.generated_at));
        }
    }
    counts
}

/// Every number whose stored frequency differs from `actual`.
pub fn drift(
    scope: StatScope,
    stored: &[NumberStatistic],
    actual: &BTreeMap<u8, NumberStatistic>,
) -> Vec<StatDrift> {
    let stored: BTreeMap<u8, u64> = stored.iter().map(|s| (s.number, s.frequency)).collect();
    let numbers: BTreeSet<u8> = stored.keys().chain(actual.keys()).copied().collect();

    numbers
        .into_iter()
        .filter_map(|number| {
            let stored = stored.get(&number).copied().unwrap_or(0);
            let actual = actual.get(&number).map(|s| s.frequency).unwrap_or(0);
            (stored != actual).then_some(StatDrift {
                scope,
                number,
                stored,
                actual,
            })
        })
        .collect()
}
