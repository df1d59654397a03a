//! eats-daemon entry point.
//!
//! Loads config and secrets, connects and migrates the database, wires the
//! services into the router and serves HTTP. Handlers live in `routes.rs`
//! and `graphql/`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use eats_auth::JwtService;
use eats_daemon::{routes, state};
use eats_db::{PgStore, Store};
use eats_service::{Services, TracingMailer};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = eats_config::load_from_env().context("load config")?;
    let cfg = &loaded.app;
    let secrets = eats_config::resolve_secrets(cfg).context("resolve secrets")?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let db_url = secrets.require_database_url(cfg)?;
    let pool = eats_db::connect(db_url, cfg.database.max_connections).await?;
    eats_db::migrate(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let services = Services::new(
        store.clone(),
        JwtService::new(secrets.jwt_key.as_bytes(), cfg.auth.token_ttl_secs),
        Arc::new(TracingMailer),
        cfg.promotion.days,
    );
    let shared = Arc::new(state::AppState::new(
        services,
        Some(loaded.config_hash.clone()),
    ));

    state::spawn_promotion_sweep(
        store,
        Duration::from_secs(cfg.promotion.sweep_interval_secs),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg
            .server
            .addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server.addr {:?}", cfg.server.addr))?,
    };
    info!("eats-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("EATS_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
