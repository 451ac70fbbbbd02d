//! Application Configuration
//!
//! Configuration for the gate application layer. Every value is injected
//! from the outside (environment in the binary, literals in tests);
//! nothing secret is hardcoded.

use std::net::IpAddr;
use std::time::Duration;

use platform::crypto::random_bytes;
use platform::rate_limit::RateLimitConfig;

use crate::domain::entity::attempt_record::LockoutPolicy;
use crate::domain::value_object::master_secret::MasterSecret;

/// Gate application configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// The shared master password
    pub master_secret: MasterSecret,
    /// HMAC key for session token signing (32 bytes)
    pub token_secret: [u8; 32],
    /// Lockout threshold / windows
    pub lockout: LockoutPolicy,
    /// Fixed-window limit for the authentication surface
    pub rate_limit: RateLimitConfig,
    /// Session lifetime (24 hours by default)
    pub session_ttl: Duration,
    /// Background sweep period
    pub sweep_interval: Duration,
    /// Audit ring capacity (oldest evicted first)
    pub audit_capacity: usize,
    /// Admin allow-list
    pub admin_addrs: Vec<IpAddr>,
}

impl GateConfig {
    /// Create a config with default policies and a random token secret
    pub fn new(master_secret: MasterSecret) -> Self {
        let mut token_secret = [0u8; 32];
        token_secret.copy_from_slice(&random_bytes(32));

        Self {
            master_secret,
            token_secret,
            lockout: LockoutPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            session_ttl: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(300),
            audit_capacity: 1000,
            admin_addrs: vec![IpAddr::from([127, 0, 0, 1])],
        }
    }

    /// Get session TTL in milliseconds
    pub fn session_ttl_ms(&self) -> i64 {
        self.session_ttl.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> MasterSecret {
        MasterSecret::new("CorrectSecret1!").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = GateConfig::new(secret());
        assert_eq!(config.lockout.threshold, 5);
        assert_eq!(config.session_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.session_ttl_ms(), 24 * 3600 * 1000);
        assert_eq!(config.admin_addrs, vec![IpAddr::from([127, 0, 0, 1])]);
    }

    #[test]
    fn test_token_secret_is_random() {
        let a = GateConfig::new(secret());
        let b = GateConfig::new(secret());
        assert_ne!(a.token_secret, b.token_secret);
        assert_ne!(a.token_secret, [0u8; 32]);
    }
}
