//! Session Token Value Object
//!
//! Wire format: `<id>.<sig>` where `id` is URL-safe base64 of 32 CSPRNG
//! bytes (256 bits, never derived from address, time, or secret) and
//! `sig` is HMAC-SHA256 over the id with the configured token key.
//! The signature lets validation reject forged tokens before touching
//! the session table.

use hmac::{Hmac, Mac};
use platform::crypto::{from_base64url, random_bytes, to_base64url};
use sha2::Sha256;

/// Random bytes in a token id (256 bits of entropy)
pub const TOKEN_ID_BYTES: usize = 32;

/// A freshly minted token: store the id, hand out the wire form
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// Lookup key for the session table
    pub token_id: String,
    /// `<id>.<sig>` presented to the client
    pub wire: String,
}

/// Mint a new signed session token
pub fn mint(key: &[u8; 32]) -> MintedToken {
    let token_id = to_base64url(&random_bytes(TOKEN_ID_BYTES));
    let wire = format!("{}.{}", token_id, to_base64url(&sign(key, &token_id)));
    MintedToken { token_id, wire }
}

/// Verify a wire token's signature and extract the token id
///
/// Returns `None` for anything malformed, tampered with, or signed with
/// a different key. The MAC comparison is constant-time.
pub fn parse(wire: &str, key: &[u8; 32]) -> Option<String> {
    let (token_id, sig_b64) = wire.split_once('.')?;
    if token_id.is_empty() {
        return None;
    }
    let sig = from_base64url(sig_b64).ok()?;

    let mac = mac_for(key, token_id);
    mac.verify_slice(&sig).ok()?;

    Some(token_id.to_string())
}

fn sign(key: &[u8; 32], token_id: &str) -> Vec<u8> {
    mac_for(key, token_id).finalize().into_bytes().to_vec()
}

fn mac_for(key: &[u8; 32], token_id: &str) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(token_id.as_bytes());
    mac
}
