use std::sync::Arc;

use serde_json::Value;

use super::{or_empty, or_none};
use crate::error::AppError;
use crate::models::{NewPublication, Publication, PublicationListing, PublicationPatch};
use crate::store::schema::{FACULTY, PUBLICATIONS};
use crate::store::{Embed, Filter, Query, RemoteStore, decode_rows, decode_single, to_row};

#[derive(Clone)]
pub struct PublicationService {
    store: Arc<dyn RemoteStore>,
}

/// Newest first with undated rows last; ties go to the latest added.
fn listing_query() -> Query {
    Query::table(PUBLICATIONS)
        .embed(Embed::to_one("faculty", FACULTY, "faculty_id").columns(&["faculty_id", "name"]))
        .order("publication_year", false)
        .order("created_at", false)
}

impl PublicationService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_get_all(&self) -> Result<Vec<PublicationListing>, AppError> {
        decode_rows(self.store.select(&listing_query()).await?)
    }

    pub async fn get_all(&self) -> Vec<PublicationListing> {
        or_empty("publications", self.try_get_all().await)
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<PublicationListing, AppError> {
        let query = listing_query().eq("publication_id", id);
        decode_single(self.store.select(&query).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<PublicationListing> {
        or_none("publication", self.try_get_by_id(id).await)
    }

    pub async fn try_get_by_faculty(&self, faculty_id: i64) -> Result<Vec<Publication>, AppError> {
        let query = Query::table(PUBLICATIONS)
            .eq("faculty_id", faculty_id)
            .order("publication_year", false)
            .order("created_at", false);
        decode_rows(self.store.select(&query).await?)
    }

    pub async fn get_by_faculty(&self, faculty_id: i64) -> Vec<Publication> {
        or_empty("publications by faculty", self.try_get_by_faculty(faculty_id).await)
    }

    pub async fn create(&self, publication: &NewPublication) -> Result<Publication, AppError> {
        let row = self.store.insert(PUBLICATIONS, to_row(publication)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    pub async fn update(&self, id: i64, patch: &PublicationPatch) -> Result<Publication, AppError> {
        let rows = self
            .store
            .update(PUBLICATIONS, &[Filter::eq("publication_id", id)], to_row(patch)?)
            .await?;
        decode_single(rows)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let rows = self
            .store
            .delete(PUBLICATIONS, &[Filter::eq("publication_id", id)])
            .await?;
        Ok(!rows.is_empty())
    }
}
