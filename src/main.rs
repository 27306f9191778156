use std::sync::Arc;
use std::time::Duration;

use quotehub::{
    config::AppConfig,
    db::Db,
    engine::collector::Collector,
    engine::refresh::start_refresh_worker,
    feed::FeedClient,
    instruments::InstrumentSet,
    logger::init_tracing,
    metrics::counters::Counters,
    query::ReadService,
    store::{QuoteRepository, SqlxQuoteRepository},
};
use tokio::time::{MissedTickBehavior, interval};

/// Initializes the DB, runs migrations, and constructs the repository.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn QuoteRepository>> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    Ok(Arc::new(SqlxQuoteRepository::new(db.pool.as_ref().clone())))
}

/// Starts the scheduled collection loop (fixed cadence). A failed cycle is
/// logged and never delays the next one.
fn start_collector_loop(collector: Arc<Collector>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if let Err(e) = collector.run_cycle().await {
                tracing::error!(error = ?e, "collection cycle failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting quotehub backend...");

    let cfg = AppConfig::from_env();
    let instruments = Arc::new(InstrumentSet::builtin());
    let counters = Counters::default();

    let repo = init_store(&cfg).await?;

    let client = FeedClient::new(cfg.feed_url.clone())?;
    let collector = Arc::new(Collector::new(
        repo.clone(),
        client,
        instruments.clone(),
        cfg.tuning.clone(),
        counters.clone(),
    ));

    let refresh_tx = start_refresh_worker(collector.clone(), cfg.refresh_queue_capacity);

    // The read surface handed to the embedding transport layer; routing
    // itself lives outside this crate.
    let _reads = Arc::new(ReadService::new(
        repo,
        instruments,
        cfg.tuning.clone(),
        counters,
        refresh_tx,
    ));

    start_collector_loop(collector, Duration::from_secs(cfg.collect_interval_secs));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
