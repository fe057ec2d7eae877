#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use contract_generator_server::config::AppConfig;
use contract_generator_server::contract::validation::digits_only;
use contract_generator_server::contract::{classify_field, FieldKind};
use contract_generator_server::db::{InMemoryContractStore, StoreError};
use contract_generator_server::lookup::{AddressLookup, LookupError, PostalAddress, PostalLookup};
use contract_generator_server::storage::ObjectStorage;
use contract_generator_server::AppState;

pub const CLIENT_IP: &str = "203.0.113.7";
pub const KNOWN_POSTAL_CODE: &str = "01310100";

/// Mock implementation of ObjectStorage for testing
pub struct MockObjectStorage {
    files: tokio::sync::Mutex<HashMap<String, Vec<u8>>>,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self {
            files: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn has_file(&self, filename: &str) -> bool {
        self.files.lock().await.contains_key(filename)
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), StoreError> {
        let mut files = self.files.lock().await;
        files.insert(filename.to_string(), file_data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, filename: &str) -> Result<(), StoreError> {
        self.files.lock().await.remove(filename);
        Ok(())
    }

    fn get_asset_url(&self, filename: &str) -> String {
        format!("http://test.example.com/{}", filename)
    }
}

pub struct FixedAddressLookup(pub String);

#[async_trait]
impl AddressLookup for FixedAddressLookup {
    async fn client_address(&self) -> Result<String, LookupError> {
        Ok(self.0.clone())
    }
}

/// Answers with [`CLIENT_IP`] after a delay.
pub struct SlowAddressLookup(pub std::time::Duration);

#[async_trait]
impl AddressLookup for SlowAddressLookup {
    async fn client_address(&self) -> Result<String, LookupError> {
        tokio::time::sleep(self.0).await;
        Ok(CLIENT_IP.to_string())
    }
}

pub struct FailingAddressLookup;

#[async_trait]
impl AddressLookup for FailingAddressLookup {
    async fn client_address(&self) -> Result<String, LookupError> {
        Err(LookupError::Status(503))
    }
}

/// Knows [`KNOWN_POSTAL_CODE`] only.
pub struct StubPostalLookup;

pub fn known_address() -> PostalAddress {
    PostalAddress {
        street: "Avenida Paulista".to_string(),
        neighborhood: "Bela Vista".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
    }
}

#[async_trait]
impl PostalLookup for StubPostalLookup {
    async fn lookup(&self, postal_code: &str) -> Result<PostalAddress, LookupError> {
        let digits = digits_only(postal_code);
        if digits.len() != 8 {
            return Err(LookupError::InvalidPostalCode(postal_code.to_string()));
        }
        if digits == KNOWN_POSTAL_CODE {
            Ok(known_address())
        } else {
            Err(LookupError::NotFound(digits))
        }
    }
}

/// State with an in-memory store, a fixed client address and the stub postal lookup.
pub fn test_state(storage: Option<Arc<dyn ObjectStorage>>) -> AppState {
    AppState::new_with_collaborators(
        AppConfig::default(),
        Arc::new(InMemoryContractStore::new()),
        storage,
        Arc::new(FixedAddressLookup(CLIENT_IP.to_string())),
        Arc::new(StubPostalLookup),
    )
}

/// A raw input that formats into a valid value for `field`.
pub fn sample_value(field: &str) -> String {
    match classify_field(field) {
        FieldKind::PersonTaxId => "11144477735".to_string(),
        FieldKind::OrgTaxId => "11222333000181".to_string(),
        FieldKind::Phone => "11987654321".to_string(),
        FieldKind::Email => "contato@example.com".to_string(),
        FieldKind::PostalCode => "20040002".to_string(),
        FieldKind::Date => "01022026".to_string(),
        FieldKind::Text => format!("Valor {}", field.to_lowercase()),
    }
}

/// A PDF-looking payload of `len` bytes.
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len.max(bytes.len()), b' ');
    bytes
}
