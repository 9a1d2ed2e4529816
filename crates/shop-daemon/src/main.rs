//! shop-daemon entry point.
//!
//! This file is intentionally thin: it loads config, sets up tracing,
//! connects and migrates the database, wires middleware, and starts the HTTP
//! server.  Route handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use serde_json::json;
use shop_config::{report_unknown_keys, DaemonSettings, UnknownKeyPolicy};
use shop_daemon::{routes, state::AppState};
use shop_db::PgStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_CONFIG_PATHS: &str = "SHOP_CONFIG";
const ENV_DAEMON_ADDR: &str = "SHOP_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let settings = load_settings()?;

    let jwt_secret = std::env::var(&settings.jwt_secret_env).ok();
    if jwt_secret.as_deref().map_or(true, |s| s.trim().is_empty()) {
        warn!(
            env = %settings.jwt_secret_env,
            "no admin JWT secret set; every admin request will be rejected"
        );
    }

    let pool = shop_db::connect_from_env(settings.max_connections).await?;
    shop_db::migrate(&pool).await?;
    let st = shop_db::status(&pool).await?;
    info!(ok = st.ok, has_orders_table = st.has_orders_table, "database ready");

    let shared = Arc::new(AppState::new(PgStore::new(pool), jwt_secret));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&settings.allowed_origins));

    let addr = bind_addr_from_env().unwrap_or(settings.bind_addr);
    info!("shop-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
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

/// Layered YAML from `SHOP_CONFIG` (comma-separated), or defaults.
fn load_settings() -> anyhow::Result<DaemonSettings> {
    let paths: Vec<String> = std::env::var(ENV_CONFIG_PATHS)
        .ok()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if paths.is_empty() {
        info!("no {ENV_CONFIG_PATHS} set; using default settings");
        return DaemonSettings::from_config_json(&json!({}));
    }

    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = shop_config::load_layered_yaml(&refs)?;
    info!(config_hash = %loaded.config_hash, layers = refs.len(), "config loaded");

    let unknown = report_unknown_keys(&loaded.config_json, UnknownKeyPolicy::Warn)?;
    if !unknown.is_empty() {
        warn!(unknown = ?unknown, "config has keys nothing reads");
    }

    DaemonSettings::from_config_json(&loaded.config_json)
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var(ENV_DAEMON_ADDR).ok()?.parse().ok()
}

/// CORS: configured origins plus localhost dev servers.
fn cors(configured: &[String]) -> CorsLayer {
    let localhost = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = localhost
        .iter()
        .copied()
        .chain(configured.iter().map(String::as_str))
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown signal received");
}
