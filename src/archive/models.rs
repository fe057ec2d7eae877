use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// A generated contract as persisted. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ContractRecord {
    pub id: Uuid,
    pub token: String,
    pub hash: String,
    #[schema(example = "residencial_pf")]
    pub contract_type: String,
    pub content: String,
    #[schema(value_type = Object)]
    pub form_data: serde_json::Value,
    pub inspection_token: Option<String>,
    pub inspection_pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub token: String,
    pub hash: String,
    pub contract_type: String,
    pub content: String,
    pub form_data: serde_json::Value,
    pub inspection_token: Option<String>,
    pub inspection_pdf_url: Option<String>,
}

impl NewContract {
    pub fn into_record(self) -> ContractRecord {
        ContractRecord {
            id: Uuid::new_v4(),
            token: self.token,
            hash: self.hash,
            contract_type: self.contract_type,
            content: self.content,
            form_data: self.form_data,
            inspection_token: self.inspection_token,
            inspection_pdf_url: self.inspection_pdf_url,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ContractFilter {
    /// Case-insensitive match against token, content and form data
    pub search: Option<String>,
    /// Exact template id
    pub contract_type: Option<String>,
}

impl ContractFilter {
    pub fn matches(&self, record: &ContractRecord) -> bool {
        if let Some(kind) = self.contract_type.as_deref().filter(|k| !k.is_empty()) {
            if record.contract_type != kind {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                record.token.to_lowercase().contains(&term)
                    || record.content.to_lowercase().contains(&term)
                    || record.form_data.to_string().to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Applies `filter` and orders the result newest first.
pub fn filter_contracts(records: &[ContractRecord], filter: &ContractFilter) -> Vec<ContractRecord> {
    let mut matched: Vec<ContractRecord> = records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched
}

pub fn download_filename(record: &ContractRecord) -> String {
    format!("contrato-{}.txt", record.token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token: &str, kind: &str, content: &str, age_minutes: i64) -> ContractRecord {
        ContractRecord {
            id: Uuid::new_v4(),
            token: token.to_string(),
            hash: "h".repeat(64),
            contract_type: kind.to_string(),
            content: content.to_string(),
            form_data: serde_json::json!({ "fields": { "NOME_LOCADOR": "Ana Paula" } }),
            inspection_token: None,
            inspection_pdf_url: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_filter_by_type_and_order() {
        let records = vec![
            record("MR3X-CTR-2026-A", "residencial_pf", "x", 10),
            record("MR3X-CTR-2026-B", "comercial_pj", "x", 5),
            record("MR3X-CTR-2026-C", "residencial_pf", "x", 1),
        ];
        let filter = ContractFilter {
            contract_type: Some("residencial_pf".to_string()),
            ..Default::default()
        };
        let tokens: Vec<String> = filter_contracts(&records, &filter)
            .into_iter()
            .map(|r| r.token)
            .collect();
        assert_eq!(tokens, vec!["MR3X-CTR-2026-C", "MR3X-CTR-2026-A"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let records = vec![
            record("MR3X-CTR-2026-A", "residencial_pf", "Imóvel na Rua Azul", 1),
            record("MR3X-CTR-2026-B", "residencial_pf", "Outro", 2),
        ];
        let search = |term: &str| {
            filter_contracts(
                &records,
                &ContractFilter {
                    search: Some(term.to_string()),
                    ..Default::default()
                },
            )
            .len()
        };
        assert_eq!(search("rua azul"), 1);
        assert_eq!(search("mr3x-ctr-2026-b"), 1);
        assert_eq!(search("ana paula"), 2);
        assert_eq!(search("   "), 2);
        assert_eq!(search("inexistente"), 0);
    }

    #[test]
    fn test_download_filename() {
        let r = record("MR3X-CTR-2026-Z", "rural_pf", "", 0);
        assert_eq!(download_filename(&r), "contrato-MR3X-CTR-2026-Z.txt");
    }
}
