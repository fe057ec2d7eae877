//! Postal code (CEP) lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::LookupError;
use crate::contract::validation::{digits_only, POSTAL_CODE_DIGITS};

/// Street-level address resolved from a postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostalAddress {
    #[schema(example = "Avenida Paulista")]
    pub street: String,
    #[schema(example = "Bela Vista")]
    pub neighborhood: String,
    #[schema(example = "São Paulo")]
    pub city: String,
    #[schema(example = "SP")]
    pub state: String,
}

#[async_trait]
pub trait PostalLookup: Send + Sync {
    async fn lookup(&self, postal_code: &str) -> Result<PostalAddress, LookupError>;
}

/// ViaCEP payload. Unknown codes answer 200 with `{ "erro": true }`.
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag == "true",
            Some(_) => true,
            None => false,
        }
    }
}

pub struct ViaCepLookup {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepLookup {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

/// Strips punctuation and checks that exactly 8 digits remain.
pub fn normalize_postal_code(postal_code: &str) -> Result<String, LookupError> {
    let digits = digits_only(postal_code);
    if digits.len() != POSTAL_CODE_DIGITS {
        return Err(LookupError::InvalidPostalCode(postal_code.to_string()));
    }
    Ok(digits)
}

#[async_trait]
impl PostalLookup for ViaCepLookup {
    async fn lookup(&self, postal_code: &str) -> Result<PostalAddress, LookupError> {
        let digits = normalize_postal_code(postal_code)?;
        let url = format!("{}/{}/json/", self.base_url.trim_end_matches('/'), digits);

        log::debug!("Looking up postal code {}", digits);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: ViaCepResponse = response.json().await?;
        if body.is_not_found() {
            return Err(LookupError::NotFound(digits));
        }

        Ok(PostalAddress {
            street: body.logradouro.unwrap_or_default(),
            neighborhood: body.bairro.unwrap_or_default(),
            city: body.localidade.unwrap_or_default(),
            state: body.uf.unwrap_or_default(),
        })
    }
}
