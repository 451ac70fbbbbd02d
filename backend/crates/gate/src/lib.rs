//! Gate (Authentication & Session Security) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, config, admin gate, sweeper
//! - `infra/` - In-memory store implementations
//! - `presentation/` - HTTP handlers, DTOs, middleware, router
//!
//! ## Features
//! - Single shared master password with constant-time verification
//! - Per-address failure counting with automatic lockout
//! - Fixed-window rate limiting of the authentication surface
//! - Opaque HMAC-signed session tokens pinned to the issuing address
//! - Bounded in-memory audit log with filtered queries
//! - Admin allow-list gating the management endpoints
//!
//! ## Security Model
//! - Password comparison is constant-time over SHA-256 digests
//! - Locked addresses are rejected before the secret is examined
//! - Token signatures are verified before any table lookup
//! - Raw tokens and the master secret never appear in logs

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::GateConfig;
pub use error::{GateError, GateResult};
pub use infra::MemoryGateStore;
pub use presentation::router::gate_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::memory::MemoryGateStore as GateStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
