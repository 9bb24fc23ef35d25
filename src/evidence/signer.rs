//! Keyed tamper-evidence signatures over evidence payloads.
//!
//! A signed payload binds a content hash to a timestamp under a shared
//! secret: `signature = HMAC-SHA256(secret, "{timestamp}.{bodySha256}")`.
//! Signing is pure — no mutation, no I/O — and deterministic for a fixed
//! `(body, secret, timestamp)` triple.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A deterministic, keyed signature over a content hash and timestamp.
///
/// The JSON shape (`{timestamp, bodySha256, signature}`) is suitable for a
/// webhook header or an evidence artifact; a holder of the secret verifies
/// it by recomputing the HMAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    /// RFC 3339 timestamp the signature covers.
    pub timestamp: String,
    /// Lowercase hex SHA-256 of the signed body.
    pub body_sha256: String,
    /// Lowercase hex HMAC-SHA256 over `"{timestamp}.{bodySha256}"`.
    pub signature: String,
}

/// Sign `body` with `secret`.
///
/// When `timestamp` is omitted the current UTC time at millisecond
/// precision is used — the only non-deterministic input. Callers needing
/// determinism supply the timestamp explicitly.
pub fn sign(body: &str, secret: &str, timestamp: Option<&str>) -> SignedPayload {
    let timestamp = timestamp.map_or_else(
        || Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ToOwned::to_owned,
    );
    let body_sha256 = hex::encode(Sha256::digest(body.as_bytes()));
    let material = format!("{timestamp}.{body_sha256}");
    let signature = hex::encode(hmac_sha256(secret.as_bytes(), material.as_bytes()));
    SignedPayload {
        timestamp,
        body_sha256,
        signature,
    }
}

/// Verify that `payload` was produced by [`sign`] over `body` with `secret`.
///
/// Recomputes the body hash and HMAC for the payload's timestamp and
/// compares both in constant time.
pub fn verify(payload: &SignedPayload, body: &str, secret: &str) -> bool {
    let expected = sign(body, secret, Some(&payload.timestamp));
    constant_time_eq(
        expected.body_sha256.as_bytes(),
        payload.body_sha256.as_bytes(),
    ) && constant_time_eq(expected.signature.as_bytes(), payload.signature.as_bytes())
}

fn hmac_sha256(secret: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK_SIZE: usize = 64;
    let mut key_block = [0u8; BLOCK_SIZE];
    if secret.len() > BLOCK_SIZE {
        let digest = Sha256::digest(secret);
        key_block[..digest.len()].copy_from_slice(&digest);
    } else {
        key_block[..secret.len()].copy_from_slice(secret);
    }

    let mut o_key_pad = [0u8; BLOCK_SIZE];
    let mut i_key_pad = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        o_key_pad[i] = key_block[i] ^ 0x5c;
        i_key_pad[i] = key_block[i] ^ 0x36;
    }

    let mut inner = Sha256::new();
    inner.update(i_key_pad);
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(o_key_pad);
    outer.update(inner_hash);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
