//! Contract archive operations

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AppState, ContractStore, StoreError};
use crate::archive::models::{ContractRecord, NewContract};

const CONTRACTS_CACHE_KEY: &str = "all";

const CONTRACT_COLUMNS: &str = "id, token, hash, contract_type, content, form_data, inspection_token, inspection_pdf_url, created_at";

impl AppState {
    /// All contracts, newest first. Served from cache when warm.
    pub async fn list_contracts(&self) -> Result<Vec<ContractRecord>, StoreError> {
        if let Some(cached) = self.contracts_cache.get(CONTRACTS_CACHE_KEY).await {
            log::debug!("Contract list served from cache ({} records)", cached.len());
            return Ok(cached);
        }

        let records = self.store.list().await?;
        self.contracts_cache
            .insert(CONTRACTS_CACHE_KEY.to_string(), records.clone())
            .await;
        Ok(records)
    }

    pub async fn get_contract(&self, id: Uuid) -> Result<Option<ContractRecord>, StoreError> {
        self.store.get(id).await
    }

    pub async fn insert_contract(&self, contract: NewContract) -> Result<ContractRecord, StoreError> {
        let record = self.store.insert(contract).await?;
        self.contracts_cache.invalidate(CONTRACTS_CACHE_KEY).await;
        log::info!("Contract {} stored with id {}", record.token, record.id);
        Ok(record)
    }
}

pub struct PgContractStore {
    pool: PgPool,
}

impl PgContractStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `contracts` table when missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contracts (
                id UUID PRIMARY KEY,
                token TEXT NOT NULL UNIQUE,
                hash TEXT NOT NULL,
                contract_type TEXT NOT NULL,
                content TEXT NOT NULL,
                form_data JSONB NOT NULL,
                inspection_token TEXT,
                inspection_pdf_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ContractStore for PgContractStore {
    async fn insert(&self, contract: NewContract) -> Result<ContractRecord, StoreError> {
        let record = contract.into_record();
        let query = format!(
            r#"
            INSERT INTO contracts ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CONTRACT_COLUMNS, CONTRACT_COLUMNS
        );

        let stored = sqlx::query_as::<_, ContractRecord>(&query)
            .bind(record.id)
            .bind(&record.token)
            .bind(&record.hash)
            .bind(&record.contract_type)
            .bind(&record.content)
            .bind(&record.form_data)
            .bind(record.inspection_token.as_deref())
            .bind(record.inspection_pdf_url.as_deref())
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicateToken(record.token.clone())
                }
                _ => StoreError::Database(e),
            })?;

        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<ContractRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM contracts ORDER BY created_at DESC",
            CONTRACT_COLUMNS
        );
        Ok(sqlx::query_as::<_, ContractRecord>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ContractRecord>, StoreError> {
        let query = format!("SELECT {} FROM contracts WHERE id = $1", CONTRACT_COLUMNS);
        Ok(sqlx::query_as::<_, ContractRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ContractRecord>, StoreError> {
        let query = format!("SELECT {} FROM contracts WHERE token = $1", CONTRACT_COLUMNS);
        Ok(sqlx::query_as::<_, ContractRecord>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }
}
