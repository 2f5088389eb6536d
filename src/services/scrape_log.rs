use std::sync::Arc;

use serde_json::Value;

use super::or_empty;
use crate::error::AppError;
use crate::models::{NewScrapeLog, ScrapeLog, ScrapeStatus};
use crate::store::schema::SCRAPE_LOG;
use crate::store::{Query, RemoteStore, decode_rows, to_row};

#[derive(Clone)]
pub struct ScrapeLogService {
    store: Arc<dyn RemoteStore>,
}

impl ScrapeLogService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn log_scrape(
        &self,
        records_updated: i64,
        status: ScrapeStatus,
        error_message: Option<&str>,
    ) -> Result<ScrapeLog, AppError> {
        let entry = NewScrapeLog {
            records_updated,
            status,
            error_message: error_message.map(str::to_string),
        };
        let row = self.store.insert(SCRAPE_LOG, to_row(&entry)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    pub async fn try_recent(&self, limit: u32) -> Result<Vec<ScrapeLog>, AppError> {
        let query = Query::table(SCRAPE_LOG)
            .order("timestamp", false)
            .order("log_id", false)
            .limit(limit);
        decode_rows(self.store.select(&query).await?)
    }

    /// Latest runs first.
    pub async fn recent(&self, limit: u32) -> Vec<ScrapeLog> {
        or_empty("scrape log", self.try_recent(limit).await)
    }
}
