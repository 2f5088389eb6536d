//! The data access layer.
//!
//! Each service wraps an injected [`RemoteStore`] and states its failure policy
//! in its signatures:
//!
//! - list reads return `Vec<T>` and degrade to empty on failure (logged);
//! - single reads return `Option<T>` and degrade to `None` on failure or absence;
//! - `try_*` reads return `Result` for callers that must tell the two apart;
//! - mutations return `Result` and always propagate.
//!
//! Nothing here retries.

pub mod course;
pub mod department;
pub mod faculty;
pub mod office;
pub mod publication;
pub mod scrape_log;
pub mod search;
pub mod stats;

use std::sync::Arc;

use tracing::error;

use crate::error::AppError;
use crate::store::RemoteStore;

pub use course::CourseService;
pub use department::DepartmentService;
pub use faculty::FacultyService;
pub use office::OfficeService;
pub use publication::PublicationService;
pub use scrape_log::ScrapeLogService;
pub use search::{SearchSequencer, SearchTicket};
pub use stats::{DashboardCounts, DepartmentStat, StatsService};

/// Every service, sharing one store.
#[derive(Clone)]
pub struct Directory {
    pub departments: DepartmentService,
    pub faculty: FacultyService,
    pub courses: CourseService,
    pub publications: PublicationService,
    pub offices: OfficeService,
    pub stats: StatsService,
    pub scrape_logs: ScrapeLogService,
}

impl Directory {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            departments: DepartmentService::new(store.clone()),
            faculty: FacultyService::new(store.clone()),
            courses: CourseService::new(store.clone()),
            publications: PublicationService::new(store.clone()),
            offices: OfficeService::new(store.clone()),
            stats: StatsService::new(store.clone()),
            scrape_logs: ScrapeLogService::new(store),
        }
    }
}

pub(crate) fn or_empty<T>(what: &str, result: Result<Vec<T>, AppError>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            error!("Error fetching {}: {}", what, e);
            Vec::new()
        }
    }
}

pub(crate) fn or_none<T>(what: &str, result: Result<T, AppError>) -> Option<T> {
    match result {
        Ok(row) => Some(row),
        Err(AppError::NotFound) => None,
        Err(e) => {
            error!("Error fetching {}: {}", what, e);
            None
        }
    }
}
