//! Client address lookup.

use async_trait::async_trait;
use serde::Deserialize;

use super::LookupError;

/// Address recorded when the lookup service cannot be reached.
pub const NULL_ADDRESS: &str = "0.0.0.0";

#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn client_address(&self) -> Result<String, LookupError>;
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: String,
}

/// Looks up the public address through an ipify-compatible endpoint (`GET -> { ip }`).
pub struct IpifyLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl IpifyLookup {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AddressLookup for IpifyLookup {
    async fn client_address(&self) -> Result<String, LookupError> {
        let response = self.client.get(&self.endpoint).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }
        let body: IpifyResponse = response.json().await?;
        Ok(body.ip)
    }
}

/// Resolves the client address, substituting [`NULL_ADDRESS`] on any failure.
pub async fn resolve_address(lookup: &dyn AddressLookup) -> String {
    match lookup.client_address().await {
        Ok(ip) => ip,
        Err(e) => {
            log::warn!("Address lookup failed, using {}: {}", NULL_ADDRESS, e);
            NULL_ADDRESS.to_string()
        }
    }
}
