use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use poizon_bot::bot::{Handler, Router};
use poizon_bot::catalog::CatalogCache;
use poizon_bot::config::{BotSettings, Config, LogFormat};
use poizon_bot::domain::CatalogItem;
use poizon_bot::localization::Texts;
use poizon_bot::pricing::{FixedRateProvider, PricingEngine, RateProvider, RemoteRateProvider};
use poizon_bot::store::{CatalogListener, MemoryStore, PgStore, Store};
use poizon_bot::telegram::{self, TelegramClient};

const EVENT_QUEUE_CAPACITY: usize = 256;

fn init_tracing(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_store(config: &Config, cache: &Arc<CatalogCache>) -> Result<Arc<dyn Store>> {
    let listener: CatalogListener = {
        let cache = Arc::clone(cache);
        Arc::new(move |items: &[CatalogItem]| cache.load(items))
    };

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            info!("Connecting to PostgreSQL");
            let store = PgStore::connect(url)
                .await
                .context("Failed to connect to the database")?
                .with_catalog_listener(listener);
            store.init_schema().await.context("Failed to initialize database schema")?;
            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::with_catalog_listener(listener))
        }
    };

    let catalog = store.get_catalog().await.context("Failed to preload the catalog")?;
    cache.load(&catalog);
    info!(items = catalog.len(), "Catalog cache loaded");
    Ok(store)
}

fn build_pricing(config: &Config) -> PricingEngine {
    let rates: Arc<dyn RateProvider> = match &config.rate_source_url {
        Some(url) => {
            info!(url = %url, "Using remote yuan rate");
            Arc::new(RemoteRateProvider::new(url.clone(), config.rate_ttl))
        }
        None => {
            info!(rate = config.yuan_rate, "Using fixed yuan rate");
            Arc::new(FixedRateProvider::new(config.yuan_rate))
        }
    };
    PricingEngine::new(rates)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(&config.log_format);

    info!("Starting Poizon order bot");

    let cache = Arc::new(CatalogCache::new());
    let store = build_store(&config, &cache).await?;
    let pricing = build_pricing(&config);

    let texts = match &config.locales_dir {
        Some(dir) => Texts::from_dir(dir)?,
        None => Texts::embedded()?,
    };
    let settings = match &config.settings_path {
        Some(path) => BotSettings::load(path)?,
        None => BotSettings::default(),
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = Handler::new(
        store,
        Arc::new(TelegramClient::new(bot.clone())),
        cache,
        pricing,
        Arc::new(texts),
        Arc::new(settings),
    )?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let router = Router::new(Arc::new(handler), events_rx, shutdown_rx, config.handler_timeout);
    let router_task = tokio::spawn(router.run());

    info!("Bot initialized, starting dispatcher");
    telegram::run_ingress(bot, events_tx).await;

    shutdown_tx.send(true).ok();
    router_task.await.context("Router task failed")?;
    info!("Shutdown complete");
    Ok(())
}
