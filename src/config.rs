//! Environment configuration.

use std::env;
use std::time::Duration;

use crate::storage::SupabaseConfig;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";
pub const DEFAULT_POSTAL_LOOKUP_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://mr3x.com.br/verify";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub database_url: Option<String>,
    pub supabase: Option<SupabaseConfig>,
    pub ip_lookup_url: String,
    pub postal_lookup_url: String,
    pub verify_base_url: String,
    pub agency_name: Option<String>,
    pub session_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database_url: None,
            supabase: None,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            postal_lookup_url: DEFAULT_POSTAL_LOOKUP_URL.to_string(),
            verify_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
            agency_name: None,
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Loads `.env` and reads the process environment. Never fails: missing or
    /// malformed values fall back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let database_url = var("SUPABASE_DATABASE_URL");
        if database_url.is_none() {
            log::warn!("SUPABASE_DATABASE_URL not set, contracts will be kept in memory");
        }

        let supabase = SupabaseConfig::from_env();
        if supabase.is_none() {
            log::warn!("SUPABASE_URL/SUPABASE_ANON_KEY not set, inspection PDFs stay in the session");
        }

        let session_idle = match var("SESSION_IDLE_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                log::warn!(
                    "Invalid SESSION_IDLE_SECS, using {} seconds",
                    DEFAULT_SESSION_IDLE_SECS
                );
                defaults.session_idle
            }
            None => defaults.session_idle,
        };

        Self {
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url,
            supabase,
            ip_lookup_url: var("IP_LOOKUP_URL").unwrap_or(defaults.ip_lookup_url),
            postal_lookup_url: var("POSTAL_LOOKUP_URL").unwrap_or(defaults.postal_lookup_url),
            verify_base_url: var("VERIFY_BASE_URL").unwrap_or(defaults.verify_base_url),
            agency_name: var("AGENCY_NAME"),
            session_idle,
        }
    }
}
