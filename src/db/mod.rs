//! Shared application state and persistence.
//!
//! - `contracts` - contract archive operations and the Postgres store
//! - `memory` - in-memory store used when no database is configured

mod contracts;
mod memory;

pub use contracts::PgContractStore;
pub use memory::InMemoryContractStore;

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::archive::models::{ContractRecord, NewContract};
use crate::config::AppConfig;
use crate::lookup::{AddressLookup, IpifyLookup, PostalLookup, ViaCepLookup};
use crate::session::SharedSession;
use crate::storage::{ObjectStorage, SupabaseStorage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("contract token {0} already exists")]
    DuplicateToken(String),
}

/// Append-only contract persistence.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert(&self, contract: NewContract) -> Result<ContractRecord, StoreError>;
    /// Every record, newest first.
    async fn list(&self) -> Result<Vec<ContractRecord>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<ContractRecord>, StoreError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<ContractRecord>, StoreError>;
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Cache<Uuid, SharedSession>,
    pub contracts_cache: Cache<String, Vec<ContractRecord>>,
    pub store: Arc<dyn ContractStore>,
    pub storage: Option<Arc<dyn ObjectStorage>>,
    pub address_lookup: Arc<dyn AddressLookup>,
    pub postal_lookup: Arc<dyn PostalLookup>,
}

fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(900))
        .timeout(Duration::from_secs(15))
        .user_agent("contract-generator-server/1.0")
        .build()
}

impl AppState {
    /// Builds the state from configuration, connecting to Postgres when a database
    /// URL is configured.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = build_http_client()?;

        let store: Arc<dyn ContractStore> = match &config.database_url {
            Some(database_url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(20)
                    .min_connections(2)
                    .acquire_timeout(Duration::from_secs(30))
                    .idle_timeout(Duration::from_secs(900))
                    .max_lifetime(Duration::from_secs(1800))
                    .connect(database_url)
                    .await?;
                let store = PgContractStore::new(pool);
                store.ensure_schema().await?;
                Arc::new(store)
            }
            None => Arc::new(InMemoryContractStore::new()),
        };

        let storage: Option<Arc<dyn ObjectStorage>> = config.supabase.clone().map(|supabase| {
            Arc::new(SupabaseStorage::new(supabase, http_client.clone())) as Arc<dyn ObjectStorage>
        });

        let address_lookup = Arc::new(IpifyLookup::new(
            http_client.clone(),
            config.ip_lookup_url.clone(),
        ));
        let postal_lookup = Arc::new(ViaCepLookup::new(
            http_client,
            config.postal_lookup_url.clone(),
        ));

        Ok(Self::new_with_collaborators(
            config,
            store,
            storage,
            address_lookup,
            postal_lookup,
        ))
    }

    pub fn new_with_collaborators(
        config: AppConfig,
        store: Arc<dyn ContractStore>,
        storage: Option<Arc<dyn ObjectStorage>>,
        address_lookup: Arc<dyn AddressLookup>,
        postal_lookup: Arc<dyn PostalLookup>,
    ) -> Self {
        let sessions = Cache::builder()
            .time_to_idle(config.session_idle)
            .max_capacity(10_000)
            .build();

        let contracts_cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(10)
            .build();

        Self {
            config: Arc::new(config),
            sessions,
            contracts_cache,
            store,
            storage,
            address_lookup,
            postal_lookup,
        }
    }

    pub async fn session(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get(id).await
    }
}
