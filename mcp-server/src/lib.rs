//! MCP tool server over the lotto-rd engine.
pub mod connection;
pub mod mcp_handler;
pub mod use_cases;

pub use mcp_handler::{MCPHandler, stdio};
pub use use_cases::{AdminUseCase, LotteryUseCase, ReportUseCase};
