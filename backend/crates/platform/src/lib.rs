//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (CSPRNG, SHA-256, Base64, constant-time compare)
//! - Source-address extraction from HTTP requests
//! - Rate limiting infrastructure

pub mod client;
pub mod crypto;
pub mod rate_limit;
