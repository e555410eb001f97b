use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use housing_ledger::config::Config;
use housing_ledger::notify::{LogNotifier, Notifier, SlackNotifier};
use housing_ledger::scrapers::BrowserSource;
use housing_ledger::store::PgStore;
use housing_ledger::{run_cycle, CycleOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Housing Ledger");
    info!("=================");

    // Both connections live exactly as long as this cycle; dropping them at
    // the end of main releases the pool and the browser even after a failed
    // walk.
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let source = BrowserSource::new(&config.site_url)?;
    source.login(&config.site_username, &config.site_password)?;

    let outcome = run_cycle(&store, &source, Utc::now()).await;

    let notifier: Box<dyn Notifier> = match &config.slack_webhook_url {
        Some(url) => Box::new(SlackNotifier::new(url)?),
        None => Box::new(LogNotifier),
    };
    if let Err(err) = notifier.notify(&outcome).await {
        warn!(error = %err, "failed to deliver cycle notification");
    }

    match &outcome {
        CycleOutcome::Success => info!("✅ Cycle finished"),
        CycleOutcome::Failure { reason } => warn!("Cycle failed: {reason}"),
    }

    Ok(())
}
