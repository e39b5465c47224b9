mod demo;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto_rd::clock::{SystemClock, SystemRandom};
use lotto_rd::database::SqliteDrawRepo;
use lotto_rd::reports::generate_and_save_report;
use lotto_rd::resilient::ResilientDrawRepo;
use lotto_rd::{GameType, RecordManager, RequestContext, config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let sqlite = SqliteDrawRepo::open(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "database ready");
    let repo = ResilientDrawRepo::new(Arc::new(sqlite), config.retry_config());

    let manager = RecordManager::new(
        Arc::new(repo),
        Arc::new(SystemClock),
        Arc::new(SystemRandom),
    );

    let ctx = RequestContext::user("demo-user");
    demo::demonstrate_engine(&manager, &ctx).await?;

    println!("📊 Writing frequency reports...");
    for game in GameType::ALL {
        match generate_and_save_report(&manager, game, &config.report_dir).await {
            Ok(path) => println!("   ✓ {}", path.display()),
            Err(e) => println!("   ✗ {}: {}", game, e),
        }
    }

    Ok(())
}
