use std::sync::Arc;

use pricewatch::api::router::create_router;
use pricewatch::config::AppConfig;
use pricewatch::db::{self, PgPriceStore};
use pricewatch::heb::HebSearchClient;
use pricewatch::run_log::build_artifact_store;
use pricewatch::services::scheduler::run_scrape_scheduler;
use pricewatch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = pricewatch::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let source = HebSearchClient::new(config.heb_search_url.clone())?;

    // Missing storage config does not stop the server; the trigger reports it.
    let artifacts = match config.artifact_target() {
        Ok(target) => {
            tracing::info!(destination = %target.describe(), "Run logs will be written to artifact store");
            Ok(build_artifact_store(target, reqwest::Client::new()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Run log storage not configured, scrape trigger will fail");
            Err(e)
        }
    };

    let state = AppState {
        config: config.clone(),
        store: Arc::new(PgPriceStore::new(pool)),
        source: Arc::new(source),
        artifacts,
        run_guard: Arc::new(tokio::sync::Mutex::new(())),
        metrics_handle,
    };

    // --- Optional in-process schedule ---
    if let Some(interval_secs) = config.scrape_interval_secs {
        let scheduler_state = state.clone();
        tokio::spawn(async move {
            run_scrape_scheduler(scheduler_state, interval_secs).await;
        });
        tracing::info!(interval_secs, "Scrape scheduler spawned");
    } else {
        tracing::info!("Scrape scheduler disabled (SCRAPE_INTERVAL_SECS unset), HTTP trigger only");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
