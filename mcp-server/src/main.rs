use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto_rd::config;
use lotto_rd_mcp::connection::{manager, open_repository};
use lotto_rd_mcp::{AdminUseCase, LotteryUseCase, MCPHandler, ReportUseCase, stdio};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's roll your lottery numbers.");

    let repo = open_repository(&config)?;
    let manager = Arc::new(manager(repo));

    let lottery_use_case = LotteryUseCase::new(Arc::clone(&manager));
    let admin_use_case = AdminUseCase::new(Arc::clone(&manager));
    let report_use_case = ReportUseCase::new(Arc::clone(&manager), config.report_dir.clone());

    let handler = MCPHandler::new(
        Arc::new(lottery_use_case),
        Arc::new(admin_use_case),
        Arc::new(report_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
