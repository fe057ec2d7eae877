//! Outbound lookups against public HTTP services.
//!
//! - `address` - client network address (ipify)
//! - `postal` - Brazilian postal code (CEP) resolution (ViaCEP)

pub mod address;
pub mod handlers;
pub mod postal;

pub use address::{resolve_address, AddressLookup, IpifyLookup, NULL_ADDRESS};
pub use postal::{PostalAddress, PostalLookup, ViaCepLookup};

use thiserror::Error;

/// Errors raised by the lookup collaborators.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup service answered with status {0}")]
    Status(u16),
    #[error("postal code must have 8 digits, got '{0}'")]
    InvalidPostalCode(String),
    #[error("postal code {0} not found")]
    NotFound(String),
}
