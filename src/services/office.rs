use std::sync::Arc;

use serde_json::Value;

use super::{or_empty, or_none};
use crate::error::AppError;
use crate::models::{NewOffice, Office};
use crate::store::schema::OFFICE;
use crate::store::{Query, RemoteStore, decode_rows, decode_single, to_row};

#[derive(Clone)]
pub struct OfficeService {
    store: Arc<dyn RemoteStore>,
}

impl OfficeService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_get_all(&self) -> Result<Vec<Office>, AppError> {
        let query = Query::table(OFFICE).order("block", true).order("room_number", true);
        decode_rows(self.store.select(&query).await?)
    }

    pub async fn get_all(&self) -> Vec<Office> {
        or_empty("offices", self.try_get_all().await)
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<Office, AppError> {
        let query = Query::table(OFFICE).eq("office_id", id);
        decode_single(self.store.select(&query).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Office> {
        or_none("office", self.try_get_by_id(id).await)
    }

    pub async fn create(&self, office: &NewOffice) -> Result<Office, AppError> {
        let row = self.store.insert(OFFICE, to_row(office)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}
