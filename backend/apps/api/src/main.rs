//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use gate::application::{AdminGate, GateConfig, Sweeper};
use gate::domain::entity::attempt_record::LockoutPolicy;
use gate::domain::value_object::master_secret::MasterSecret;
use gate::presentation::{GateAppState, gate_router_with_state};
use gate::MemoryGateStore;
use platform::rate_limit::{MemoryRateLimitStore, RateLimitConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,gate=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    let sweep_interval = config.sweep_interval;
    let rate_window = config.rate_limit.window;

    let store = MemoryGateStore::new(config.lockout, config.audit_capacity);

    let state = GateAppState {
        repo: Arc::new(store),
        rate: MemoryRateLimitStore::new(),
        admin: Arc::new(AdminGate::new(config.admin_addrs.iter().copied())),
        config: Arc::new(config),
    };

    // Background sweep shares the router's stores
    let sweeper = Sweeper::new(
        state.repo.clone(),
        state.repo.clone(),
        state.rate.clone(),
        rate_window * 2,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = sweeper.spawn(sweep_interval, shutdown_rx);

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/auth", gate_router_with_state(state))
        .fallback(|| async { AppError::not_found("No such endpoint") })
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("GATE_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("GATE_BIND_ADDR must be host:port")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    })
    .await?;

    // Stop the sweeper before exit
    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;

    Ok(())
}

/// Assemble the gate configuration from the environment
fn load_config() -> anyhow::Result<GateConfig> {
    let master_secret = MasterSecret::new(
        env::var("GATE_MASTER_PASSWORD").context("GATE_MASTER_PASSWORD must be set")?,
    )
    .context("GATE_MASTER_PASSWORD is not usable")?;

    let mut config = GateConfig::new(master_secret);

    // Token signing key: explicit in production, random per-process in debug
    if let Ok(secret_b64) = env::var("GATE_TOKEN_SECRET") {
        let secret_bytes = Engine::decode(&general_purpose::STANDARD, &secret_b64)
            .context("GATE_TOKEN_SECRET must be base64")?;
        anyhow::ensure!(
            secret_bytes.len() == 32,
            "GATE_TOKEN_SECRET must decode to 32 bytes"
        );
        config.token_secret.copy_from_slice(&secret_bytes);
    } else if !cfg!(debug_assertions) {
        anyhow::bail!("GATE_TOKEN_SECRET must be set in production");
    }

    config.lockout = LockoutPolicy {
        threshold: env_parse("GATE_LOCKOUT_THRESHOLD", 5u32)?,
        attempt_window: Duration::from_secs(
            env_parse("GATE_ATTEMPT_WINDOW_MINUTES", 15u64)? * 60,
        ),
        lockout_duration: Duration::from_secs(env_parse("GATE_LOCKOUT_MINUTES", 15u64)? * 60),
    };
    config.rate_limit = RateLimitConfig::new(
        env_parse("GATE_RATE_MAX_REQUESTS", 30u32)?,
        env_parse("GATE_RATE_WINDOW_SECONDS", 60u64)?,
    );
    config.session_ttl = Duration::from_secs(env_parse("GATE_SESSION_HOURS", 24u64)? * 3600);
    config.sweep_interval = Duration::from_secs(env_parse("GATE_SWEEP_SECONDS", 300u64)?);

    if let Ok(list) = env::var("GATE_ADMIN_IPS") {
        config.admin_addrs = list
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<IpAddr>()
                    .with_context(|| format!("invalid address in GATE_ADMIN_IPS: {s}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
    }

    Ok(config)
}

fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value")),
        Err(_) => Ok(default),
    }
}
