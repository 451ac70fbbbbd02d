//! Gate Router
//!
//! Route groups: the rate-limited authentication surface, the
//! admin-gated management surface, and the public health probe. Source
//! address resolution wraps both guarded groups.

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;

use platform::rate_limit::MemoryRateLimitStore;

use crate::application::{AdminGate, GateConfig};
use crate::domain::repository::{AttemptRepository, AuditRepository, SessionRepository};
use crate::infra::MemoryGateStore;
use crate::presentation::handlers::{self, GateAppState};
use crate::presentation::middleware;

/// Create the gate router backed by the in-memory store
pub fn gate_router(store: MemoryGateStore, config: GateConfig) -> Router {
    gate_router_generic(store, config)
}

/// Create a gate router for any repository implementation
pub fn gate_router_generic<R>(repo: R, config: GateConfig) -> Router
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let state = GateAppState {
        repo: Arc::new(repo),
        rate: MemoryRateLimitStore::new(),
        admin: Arc::new(AdminGate::new(config.admin_addrs.iter().copied())),
        config: Arc::new(config),
    };
    gate_router_with_state(state)
}

/// Create a gate router from prebuilt state
///
/// For callers that need to share the state's stores with something
/// outside the router (the sweeper holds the rate limiter).
pub fn gate_router_with_state<R>(state: GateAppState<R>) -> Router
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let auth_surface = Router::new()
        .route("/verify-password", post(handlers::verify_password::<R>))
        .route("/validate-session", post(handlers::validate_session::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .layer(from_fn({
            let state = state.clone();
            move |req, next| middleware::rate_limit(state.clone(), req, next)
        }));

    let admin_surface = Router::new()
        .route("/stats", get(handlers::stats::<R>))
        .route("/security-events", get(handlers::security_events::<R>))
        .route("/emergency/lock-ip", post(handlers::lock_ip::<R>))
        .route("/emergency/unlock-ip", post(handlers::unlock_ip::<R>))
        .route("/config", get(handlers::get_config::<R>))
        .layer(from_fn({
            let state = state.clone();
            move |req, next| middleware::require_admin(state.clone(), req, next)
        }));

    // Address resolution wraps everything that keys on the client;
    // /health stays reachable without one.
    Router::new()
        .merge(auth_surface)
        .merge(admin_surface)
        .layer(from_fn(middleware::resolve_source_addr))
        .route("/health", get(handlers::health::<R>))
        .with_state(state)
}
