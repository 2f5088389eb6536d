use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{or_empty, or_none};
use crate::error::AppError;
use crate::models::{Department, DepartmentPatch, NewDepartment};
use crate::store::schema::DEPARTMENTS;
use crate::store::{Filter, Query, RemoteStore, decode_rows, decode_single, to_row};

#[derive(Clone)]
pub struct DepartmentService {
    store: Arc<dyn RemoteStore>,
}

impl DepartmentService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_get_all(&self) -> Result<Vec<Department>, AppError> {
        let query = Query::table(DEPARTMENTS).order("department_name", true);
        decode_rows(self.store.select(&query).await?)
    }

    /// All departments by name; empty on failure.
    pub async fn get_all(&self) -> Vec<Department> {
        or_empty("departments", self.try_get_all().await)
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<Department, AppError> {
        let query = Query::table(DEPARTMENTS).eq("department_id", id);
        decode_single(self.store.select(&query).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Department> {
        or_none("department", self.try_get_by_id(id).await)
    }

    pub async fn create(&self, department: &NewDepartment) -> Result<Department, AppError> {
        let row = self.store.insert(DEPARTMENTS, to_row(department)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    pub async fn update(&self, id: i64, patch: &DepartmentPatch) -> Result<Department, AppError> {
        let rows = self
            .store
            .update(DEPARTMENTS, &[Filter::eq("department_id", id)], to_row(patch)?)
            .await?;
        decode_single(rows)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let rows = self
            .store
            .delete(DEPARTMENTS, &[Filter::eq("department_id", id)])
            .await?;
        Ok(!rows.is_empty())
    }

    /// Lower-cased department name to id, from a single fetch.
    pub async fn try_name_index(&self) -> Result<HashMap<String, i64>, AppError> {
        Ok(self
            .try_get_all()
            .await?
            .into_iter()
            .map(|d| (d.department_name.trim().to_lowercase(), d.department_id))
            .collect())
    }

    pub async fn find_id_by_name(&self, name: &str) -> Result<Option<i64>, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(self.try_name_index().await?.get(&name.to_lowercase()).copied())
    }
}
