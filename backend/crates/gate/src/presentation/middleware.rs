//! Gate Middleware
//!
//! Request guards layered in front of the handlers: source-address
//! resolution, the fixed-window rate limit for the authentication
//! surface, the admin allow-list, and the bearer-token session guard
//! for protected business routes.

use axum::Json;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use platform::client::extract_source_addr;
use platform::rate_limit::{RateLimitStore, now_ms};

use crate::application::ValidateSessionUseCase;
use crate::domain::repository::{AttemptRepository, AuditRepository, SessionRepository};
use crate::domain::entity::audit_event::{AuditEvent, AuditKind};
use crate::error::GateError;
use crate::presentation::handlers::GateAppState;

/// Resolved client source address, stored in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceAddr(pub std::net::IpAddr);

/// Resolve the source address once per request
///
/// X-Forwarded-For first entry, then the direct connection address. A
/// request with neither never reaches a handler; every gate decision is
/// keyed by this value.
pub async fn resolve_source_addr(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let direct_ip = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip());

    let Some(addr) = extract_source_addr(req.headers(), direct_ip) else {
        return Err(
            GateError::Validation("source address could not be determined".to_string())
                .into_response(),
        );
    };

    req.extensions_mut().insert(SourceAddr(addr));
    Ok(next.run(req).await)
}

/// Fixed-window rate limit keyed by source address
pub async fn rate_limit<R>(
    state: GateAppState<R>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let Some(SourceAddr(addr)) = req.extensions().get::<SourceAddr>().copied() else {
        return Err(
            GateError::Internal("source address not resolved before rate limit".to_string())
                .into_response(),
        );
    };

    let result = state
        .rate
        .check_and_increment(&addr.to_string(), &state.config.rate_limit)
        .await
        .map_err(|e| GateError::Internal(e.to_string()).into_response())?;

    if !result.allowed {
        let retry_after_ms = (result.reset_at_ms - now_ms()).max(0);
        return Err(GateError::RateLimited { retry_after_ms }.into_response());
    }

    Ok(next.run(req).await)
}

/// Admin allow-list guard
///
/// A denied address gets exactly one ADMIN_DENIED audit event per
/// rejected request.
pub async fn require_admin<R>(
    state: GateAppState<R>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let Some(SourceAddr(addr)) = req.extensions().get::<SourceAddr>().copied() else {
        return Err(
            GateError::Internal("source address not resolved before admin guard".to_string())
                .into_response(),
        );
    };

    if !state.admin.is_admin(addr) {
        if let Err(e) = state
            .repo
            .append(AuditEvent::new(AuditKind::AdminDenied, addr))
            .await
        {
            return Err(e.into_response());
        }
        return Err(GateError::AdminDenied.into_response());
    }

    Ok(next.run(req).await)
}

/// Bearer-token session guard for protected business routes
///
/// Missing or non-bearer Authorization is MISSING_TOKEN; a token that
/// fails validation for this source address is INVALID_TOKEN. Both are
/// 401 with a machine-readable code.
pub async fn require_session<R>(
    state: GateAppState<R>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    R: AttemptRepository + SessionRepository + AuditRepository + Clone + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip());
    let addr = req
        .extensions()
        .get::<SourceAddr>()
        .map(|source| source.0)
        .or_else(|| extract_source_addr(req.headers(), direct_ip));

    let Some(addr) = addr else {
        return Err(
            GateError::Validation("source address could not be determined".to_string())
                .into_response(),
        );
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        return Err(token_rejection("MISSING_TOKEN", "Authorization token required"));
    };

    let use_case = ValidateSessionUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );
    if !use_case.is_valid(token, addr).await {
        return Err(token_rejection("INVALID_TOKEN", "Invalid or expired session"));
    }

    Ok(next.run(req).await)
}

fn token_rejection(code: &'static str, message: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "success": false,
            "code": code,
            "error": message,
        })),
    )
        .into_response()
}
