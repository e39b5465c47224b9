//! Number generation and statistics engine for Dominican lottery games
//! (Leidsa, Kino, Pale, Tripleta).

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod generator;
pub mod manager;
pub mod memory;
pub mod ports;
pub mod reports;
pub mod resilient;
pub mod stats;
pub mod types;
pub mod utils;

pub use auth::{Claims, RequestContext};
pub use catalog::{GameDefinition, NumberRange};
pub use error::LottoError;
pub use generator::DrawGenerator;
pub use manager::{CreatedDraw, RecordManager};
pub use ports::{ClockPort, DrawRepo, InsertOutcome, RandomPort, RepoError};
pub use types::*;
