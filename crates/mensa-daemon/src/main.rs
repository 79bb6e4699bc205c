//! mensa-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config, runs
//! the explicit bootstrap (migrate + seed), builds the shared state, wires
//! middleware, and starts the HTTP server. All route handlers live in
//! `routes/`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mensa_daemon::{auth::IdentityVerifier, routes, state::AppState};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_config()?;

    let pool = mensa_db::connect_from_env(cfg.database.max_connections).await?;
    mensa_db::migrate(&pool).await?;

    // Seeding is an explicit bootstrap step, not a module-load side effect.
    // Idempotent: a second boot against the same DB is a no-op.
    let seeded = mensa_db::seed::seed_static_tables(&pool).await?;
    if seeded.inserted_anything() {
        info!(?seeded, "static tables seeded");
    } else {
        info!("static tables already seeded");
    }

    let verifier = IdentityVerifier::from_config(&cfg.identity)?;
    let shared = Arc::new(AppState::new(pool, verifier));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env()
        .map(Ok)
        .unwrap_or_else(|| cfg.server.bind_addr.parse::<SocketAddr>())
        .context("invalid bind address")?;
    info!("mensa-daemon listening on http://{}", addr);

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

/// Layered YAML config paths come from MENSA_CONFIG (comma-separated, merge
/// order base -> override). Unset = built-in defaults.
fn load_config() -> anyhow::Result<mensa_config::DaemonConfig> {
    match std::env::var("MENSA_CONFIG") {
        Ok(paths) => {
            let parts: Vec<&str> = paths.split(',').map(str::trim).collect();
            let loaded = mensa_config::load_layered_yaml(&parts)?;
            info!(config_hash = %loaded.config_hash, "config loaded");
            mensa_config::DaemonConfig::from_loaded(&loaded)
        }
        Err(_) => {
            info!("MENSA_CONFIG not set; using built-in defaults");
            Ok(mensa_config::DaemonConfig::default())
        }
    }
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("MENSA_DAEMON_ADDR").ok()?.parse().ok()
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
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
