use coindeck::config::Config;
use coindeck::services::{DocumentStore, HistoryService, MarketService, Refresher, SymbolResolver};
use coindeck::sources::{CoinGeckoClient, CoinLoreClient};
use coindeck::{api, AppState};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coindeck=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting coindeck server on {}:{}", config.host, config.port);

    // Connect the document store
    let store = DocumentStore::new();
    if let Some(ref redis_url) = config.redis_url {
        store.connect(redis_url).await;
    }

    // Upstream clients: CoinGecko primary, CoinLore as listing fallback
    let coingecko = Arc::new(CoinGeckoClient::new(config.coingecko_api_key.clone()));
    let coinlore = Arc::new(CoinLoreClient::new());

    let resolver = SymbolResolver::new(
        coingecko.clone(),
        config.listing_pages(),
        config.page_size,
        config.request_delay,
    );

    let market = MarketService::new(
        coingecko.clone(),
        Some(coinlore),
        resolver.clone(),
        store.clone(),
        config.page_size,
        config.listing_ttl,
        config.request_delay,
    );

    let history = HistoryService::new(
        coingecko,
        resolver,
        store,
        config.freshness,
        config.history_days,
    );

    // Background refresh keeps the dashboard warm; readers never wait on it.
    Refresher::new(
        market.clone(),
        history.clone(),
        config.top_n,
        config.warm_limit,
        config.refresh_interval,
        config.request_delay,
    )
    .spawn();

    // Create application state
    let state = AppState {
        config: config.clone(),
        market,
        history,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("coindeck listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
