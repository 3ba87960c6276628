//! Gateway entrypoint: wires up the metadata store, broker, and router,
//! then serves HTTP. Structured the way the teacher's `main.rs` ties
//! together config loading, client construction, and the top-level run
//! loop, but as a long-lived server instead of a one-shot CLI command.

use std::sync::Arc;

use gen_audio_core::auth::TokenIssuer;
use gen_audio_core::broker::RedisBroker;
use gen_audio_core::config::Config;
use gen_audio_core::store::PgMetadataStore;
use gen_audio_gateway::rate_limit::RateLimiters;
use gen_audio_gateway::state::AppState;
use gen_audio_gateway::{middleware, routes};
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Config::init_tracing();
    let config = Config::from_env()?;

    let store = Arc::new(PgMetadataStore::connect(&config.database_url).await?);
    let broker = Arc::new(RedisBroker::connect(&config.redis_url).await?);
    let tokens = Arc::new(TokenIssuer::new(config.secret_key.clone()));
    let rate_limiters = RateLimiters::new(config.debug_bypass_rate_limits);

    // CORS is built from an allowlist (§6 `CORS_ORIGINS`); credentials are
    // only permitted when the list doesn't contain the wildcard.
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(true)
    };

    let state = AppState {
        store,
        broker,
        config: Arc::new(config),
        tokens,
        rate_limiters,
    };

    let app = routes::router(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("gateway listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
