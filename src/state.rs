use std::sync::Arc;

use crate::error::AppError;
use crate::scrape::FacultyScraper;
use crate::services::Directory;
use crate::store::RemoteStore;

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub scraper: FacultyScraper,
}

impl AppState {
    pub fn new(store: Arc<dyn RemoteStore>) -> Result<Self, AppError> {
        let directory = Directory::new(store);
        let scraper = FacultyScraper::new(
            directory.faculty.clone(),
            directory.departments.clone(),
            directory.scrape_logs.clone(),
        )?;
        Ok(Self { directory, scraper })
    }
}
