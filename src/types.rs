use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LottoError;

pub type DrawId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Leidsa,
    Kino,
    Pale,
    Tripleta,
}

impl GameType {
    pub const ALL: [GameType; 4] = [
        GameType::Leidsa,
        GameType::Kino,
        GameType::Pale,
        GameType::Tripleta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Leidsa => "leidsa",
            GameType::Kino => "kino",
            GameType::Pale => "pale",
            GameType::Tripleta => "tripleta",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leidsa" => Ok(GameType::Leidsa),
            "kino" => Ok(GameType::Kino),
            "pale" => Ok(GameType::Pale),
            "tripleta" => Ok(GameType::Tripleta),
            _ => Err(LottoError::InvalidGameType(s.to_string())),
        }
    }
}

/// Key space of the number statistics: main numbers of a game, or its
/// secondary ("Más") number, stored as `<game>_mas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StatScope {
    Main(GameType),
    Secondary(GameType),
}

impl StatScope {
    pub fn game_type(&self) -> GameType {
        match self {
            StatScope::Main(game) | StatScope::Secondary(game) => *game,
        }
    }

    pub fn key(&self) -> String {
        match self {
            StatScope::Main(game) => game.as_str().to_string(),
            StatScope::Secondary(game) => format!("{}_mas", game.as_str()),
        }
    }
}

impl fmt::Display for StatScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for StatScope {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix("_mas") {
            Some(game) => Ok(StatScope::Secondary(game.parse()?)),
            None => Ok(StatScope::Main(s.parse()?)),
        }
    }
}

impl From<StatScope> for String {
    fn from(scope: StatScope) -> Self {
        scope.key()
    }
}

impl TryFrom<String> for StatScope {
    type Error = LottoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateOptions {
    #[serde(default, alias = "include_mas")]
    pub include_secondary: bool,
    #[serde(default, alias = "generate_mas_only")]
    pub secondary_only: bool,
}

impl GenerateOptions {
    pub fn with_secondary() -> Self {
        Self {
            include_secondary: true,
            secondary_only: false,
        }
    }

    pub fn secondary_only() -> Self {
        Self {
            include_secondary: false,
            secondary_only: true,
        }
    }
}

/// One generated combination, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    #[serde(default)]
    pub main_numbers: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_number: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: DrawId,
    pub owner_id: String,
    pub game_type: GameType,
    pub main_numbers: Vec<u8>,
    pub secondary_number: Option<u8>,
    pub generated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DrawRecord {
    pub fn draw(&self) -> Draw {
        Draw {
            main_numbers: self.main_numbers.clone(),
            secondary_number: self.secondary_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberStatistic {
    pub number: u8,
    pub scope: StatScope,
    pub frequency: u64,
    /// `None` for numbers that never appeared.
    pub last_appearance: Option<DateTime<Utc>>,
}

impl NumberStatistic {
    pub fn unseen(number: u8, scope: StatScope) -> Self {
        Self {
            number,
            scope,
            frequency: 0,
            last_appearance: None,
        }
    }
}

/// Storage-level listing filter. Authorization has already been applied by
/// the time one of these reaches a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawFilter {
    pub owner_id: Option<String>,
    pub game_type: Option<GameType>,
    pub include_deleted: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DrawFilter {
    fn default() -> Self {
        Self {
            owner_id: None,
            game_type: None,
            include_deleted: false,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Caller-facing listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DrawQuery {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub game_type: Option<GameType>,
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Counting query used by the statistics screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountQuery {
    pub owner_id: Option<String>,
    pub game_type: Option<GameType>,
    pub deleted: Option<bool>,
    pub generated_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as u64)
    }

    pub fn current_page(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        (self.offset / self.limit) as u64 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "bucket", content = "value")]
pub enum ActivityBucket {
    Never,
    UnderOneHour,
    /// Whole hours elapsed, 1..=23.
    Hours(u32),
    /// Whole days elapsed, at least 1.
    Days(u32),
}

impl ActivityBucket {
    /// Label in the wording the web client shows.
    pub fn label_es(&self) -> String {
        match self {
            ActivityBucket::Never => "Nunca".to_string(),
            ActivityBucket::UnderOneHour => "Hace menos de 1 hora".to_string(),
            ActivityBucket::Hours(h) => format!("Hace {} horas", h),
            ActivityBucket::Days(d) => format!("Hace {} días", d),
        }
    }
}

impl fmt::Display for ActivityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityBucket::Never => f.write_str("never"),
            ActivityBucket::UnderOneHour => f.write_str("<1 hour"),
            ActivityBucket::Hours(h) => write!(f, "<{} hours", h + 1),
            ActivityBucket::Days(d) => write!(f, "<{} days", d + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_generations: u64,
    pub per_game_counts: BTreeMap<GameType, u64>,
    pub most_recent_activity: ActivityBucket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotColdNumbers {
    pub hot: Vec<NumberStatistic>,
    pub cold: Vec<NumberStatistic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberFrequency {
    pub number: u8,
    pub frequency: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityAnalysis {
    pub game_type: GameType,
    pub total_generations: u64,
    pub number_frequencies: Vec<NumberFrequency>,
    pub hot_numbers: Vec<u8>,
    pub cold_numbers: Vec<u8>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOverview {
    pub total_records: u64,
    pub active_records: u64,
    pub deleted_records: u64,
    pub new_last_7_days: u64,
    pub new_last_30_days: u64,
    pub per_game_counts: BTreeMap<GameType, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatDrift {
    pub scope: StatScope,
    pub number: u8,
    pub stored: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub game_type: GameType,
    pub drift: Vec<StatDrift>,
}

impl DriftReport {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty()
    }
}
