//! Security metadata stamped on generated contracts.
//!
//! The fingerprint mixes the generation instant into the hashed input, so hashing the
//! same text twice yields two different fingerprints. A fingerprint can only be checked
//! against the value stored at generation time, never by recomputing it from the text.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::lookup::{resolve_address, AddressLookup};

pub const CONTRACT_TOKEN_PREFIX: &str = "MR3X-CTR-";
const TOKEN_RANDOM_LEN: usize = 13;

/// Token, fingerprint, address and instant of one generated document.
///
/// Never patched: a content change produces a fresh value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractMetadata {
    #[schema(example = "MR3X-CTR-2026-K3J9QX0L2M8ZAB1C2D3")]
    pub token: String,
    /// SHA-256, hex encoded
    pub hash: String,
    #[schema(example = "203.0.113.7")]
    pub ip: String,
    /// ISO-8601 instant the fingerprint was salted with
    pub timestamp: String,
}

/// SHA-256 over `data`, `ip` and the instant in epoch milliseconds.
pub fn fingerprint(data: &str, ip: &str, at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.update(ip.as_bytes());
    hasher.update(at.timestamp_millis().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// `MR3X-CTR-<year>-<random><base36 millis>`, upper case.
pub fn generate_token(at: DateTime<Utc>) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();

    let millis = u64::try_from(at.timestamp_millis()).unwrap_or_default();
    format!(
        "{}{}-{}{}",
        CONTRACT_TOKEN_PREFIX,
        at.year(),
        random,
        to_base36(millis)
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

pub fn to_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds metadata for already-resolved inputs. Used directly by tests.
pub fn build_metadata(content: &str, ip: String, at: DateTime<Utc>) -> ContractMetadata {
    ContractMetadata {
        token: generate_token(at),
        hash: fingerprint(content, &ip, at),
        ip,
        timestamp: to_iso8601(at),
    }
}

/// Generates metadata for `content`. Address lookup failures never block generation.
pub async fn generate_metadata(content: &str, lookup: &dyn AddressLookup) -> ContractMetadata {
    let ip = resolve_address(lookup).await;
    let metadata = build_metadata(content, ip, Utc::now());
    log::info!("Generated contract metadata {}", metadata.token);
    metadata
}

/// Whether `token` has the shape of a contract token for any year.
pub fn is_contract_token(token: &str) -> bool {
    token.starts_with(CONTRACT_TOKEN_PREFIX)
}
