use chrono::{DateTime, Utc};

use crate::catalog;
use crate::types::{ActivityBucket, Draw, GameType};

pub fn activity_bucket(now: DateTime<Utc>, latest: Option<DateTime<Utc>>) -> ActivityBucket {
    let Some(latest) = latest else {
        return ActivityBucket::Never;
    };
    // Clock skew can put the latest record slightly in the future.
    let hours = (now - latest).num_hours().max(0);
    if hours < 1 {
        ActivityBucket::UnderOneHour
    } else if hours < 24 {
        ActivityBucket::Hours(hours as u32)
    } else {
        ActivityBucket::Days((hours / 24).min(u32::MAX as i64) as u32)
    }
}

/// "03 - 17 - 45 + Más 7" style rendering used by the demo output and reports.
pub fn format_draw(game: GameType, draw: &Draw) -> String {
    let def = catalog::definition(game);
    let main = draw
        .main_numbers
        .iter()
        .map(|n| def.format_number(*n))
        .collect::<Vec<_>>()
        .join(" - ");

    match (main.is_empty(), draw.secondary_number) {
        (true, Some(mas)) => format!("Más {}", mas),
        (false, Some(mas)) => format!("{} + Más {}", main, mas),
        (_, None) => main,
    }
}
