use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ContractStore, StoreError};
use crate::archive::models::{ContractRecord, NewContract};

/// Process-local contract store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryContractStore {
    records: RwLock<Vec<ContractRecord>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn insert(&self, contract: NewContract) -> Result<ContractRecord, StoreError> {
        let mut records = self.records.write();
        if records.iter().any(|r| r.token == contract.token) {
            return Err(StoreError::DuplicateToken(contract.token));
        }
        let record = contract.into_record();
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ContractRecord>, StoreError> {
        let mut records = self.records.read().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ContractRecord>, StoreError> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ContractRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }
}
