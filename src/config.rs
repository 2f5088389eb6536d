use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::store::{PostgrestConfig, PostgrestStore, RemoteStore, SqliteStore};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Postgrest(PostgrestConfig),
    /// Local SQLite database, selected by `DATABASE_URL`.
    Sqlite { url: String },
}

impl StoreBackend {
    pub async fn connect(&self) -> Result<Arc<dyn RemoteStore>, AppError> {
        match self {
            StoreBackend::Postgrest(config) => {
                info!("Using hosted store at {}", config.url);
                Ok(Arc::new(PostgrestStore::new(config.clone())?))
            }
            StoreBackend::Sqlite { url } => {
                info!("Using local store {}", url);
                Ok(Arc::new(SqliteStore::connect(url).await?))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env`, if any,
    /// has been loaded).
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match var("DATABASE_URL") {
            Some(url) => StoreBackend::Sqlite { url },
            None => {
                let url = var("SUPABASE_URL")
                    .ok_or_else(|| AppError::Config("SUPABASE_URL is not set".to_string()))?;
                let api_key = var("SUPABASE_SERVICE_ROLE_KEY")
                    .or_else(|| var("SUPABASE_ANON_KEY"))
                    .ok_or_else(|| AppError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;
                StoreBackend::Postgrest(PostgrestConfig { url, api_key })
            }
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid BIND_ADDR: {}", e)))?;

        Ok(Self { backend, bind_addr })
    }
}
