use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::or_empty;
use crate::error::AppError;
use crate::models::DepartmentSummary;
use crate::store::schema::{COURSES, DEPARTMENTS, FACULTY, PUBLICATIONS};
use crate::store::{Embed, Query, RemoteStore, decode_rows};

/// Label for faculty without a department.
pub const UNASSIGNED: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub faculty: u64,
    pub courses: u64,
    pub departments: u64,
    pub publications: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStat {
    pub department_id: Option<i64>,
    pub department: String,
    pub faculty_count: u64,
}

#[derive(Debug, Deserialize)]
struct FacultyDepartment {
    #[serde(default)]
    department_id: Option<i64>,
    #[serde(default)]
    department: Option<DepartmentSummary>,
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn RemoteStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_count(&self, table: &str) -> Result<u64, AppError> {
        self.store.count(table, &[]).await
    }

    async fn count_or_zero(&self, table: &str) -> u64 {
        self.try_count(table).await.unwrap_or_else(|e| {
            error!("Error counting {}: {}", table, e);
            0
        })
    }

    /// Row totals for the dashboard. The four counts run concurrently and each
    /// falls back to zero on its own.
    pub async fn dashboard_counts(&self) -> DashboardCounts {
        let (faculty, courses, departments, publications) = tokio::join!(
            self.count_or_zero(FACULTY),
            self.count_or_zero(COURSES),
            self.count_or_zero(DEPARTMENTS),
            self.count_or_zero(PUBLICATIONS),
        );

        DashboardCounts {
            faculty,
            courses,
            departments,
            publications,
        }
    }

    /// Faculty per department, ordered by department id with unassigned first.
    pub async fn try_department_statistics(&self) -> Result<Vec<DepartmentStat>, AppError> {
        let query = Query::table(FACULTY).columns(&["department_id"]).embed(
            Embed::to_one("department", DEPARTMENTS, "department_id")
                .columns(&["department_id", "department_name"]),
        );
        let rows: Vec<FacultyDepartment> = decode_rows(self.store.select(&query).await?)?;

        let mut grouped: BTreeMap<Option<i64>, DepartmentStat> = BTreeMap::new();
        for row in rows {
            let stat = grouped
                .entry(row.department_id)
                .or_insert_with(|| DepartmentStat {
                    department_id: row.department_id,
                    department: row
                        .department
                        .map(|d| d.department_name)
                        .unwrap_or_else(|| UNASSIGNED.to_string()),
                    faculty_count: 0,
                });
            stat.faculty_count += 1;
        }

        Ok(grouped.into_values().collect())
    }

    pub async fn department_statistics(&self) -> Vec<DepartmentStat> {
        or_empty("department statistics", self.try_department_statistics().await)
    }
}
