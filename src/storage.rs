//! Object storage for inspection reports (Supabase Storage REST API).

use async_trait::async_trait;
use std::env;

use crate::db::StoreError;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), StoreError>;
    async fn delete_file(&self, filename: &str) -> Result<(), StoreError>;
    fn get_asset_url(&self, filename: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub bucket_name: String,
}

impl SupabaseConfig {
    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `SUPABASE_BUCKET`.
    /// Returns `None` when the URL or key is missing.
    pub fn from_env() -> Option<Self> {
        let supabase_url = env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty())?;
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY").ok().filter(|v| !v.is_empty())?;
        let bucket_name =
            env::var("SUPABASE_BUCKET").unwrap_or_else(|_| "contract-inspections".to_string());

        Some(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            bucket_name,
        })
    }
}

pub struct SupabaseStorage {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn object_url(&self, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.supabase_url, self.config.bucket_name, filename
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), StoreError> {
        let content_type = mime_guess::from_path(filename).first_or_octet_stream();
        log::debug!("Uploading {} ({} bytes) to storage", filename, file_data.len());

        let response = self
            .client
            .post(self.object_url(filename))
            .bearer_auth(&self.config.supabase_anon_key)
            .header("apikey", &self.config.supabase_anon_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type.as_ref())
            .body(file_data.to_vec())
            .send()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Storage(format!(
                "upload of {} failed with {}: {}",
                filename, status, body
            )));
        }

        log::info!("Uploaded {} to bucket {}", filename, self.config.bucket_name);
        Ok(())
    }

    async fn delete_file(&self, filename: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.object_url(filename))
            .bearer_auth(&self.config.supabase_anon_key)
            .header("apikey", &self.config.supabase_anon_key)
            .send()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Storage(format!(
                "delete of {} failed with {}",
                filename,
                response.status()
            )));
        }
        Ok(())
    }

    fn get_asset_url(&self, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.supabase_url, self.config.bucket_name, filename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            supabase_url: "https://test.supabase.co".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            bucket_name: "inspections".to_string(),
        }
    }

    #[test]
    fn test_urls() {
        let storage = SupabaseStorage::new(config(), reqwest::Client::new());
        assert_eq!(
            storage.object_url("a.pdf"),
            "https://test.supabase.co/storage/v1/object/inspections/a.pdf"
        );
        assert_eq!(
            storage.get_asset_url("a.pdf"),
            "https://test.supabase.co/storage/v1/object/public/inspections/a.pdf"
        );
    }

    #[test]
    fn test_config_debug_format() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("SupabaseConfig"));
        assert!(debug.contains("test.supabase.co"));
    }
}
