use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::search::SearchSequencer;
use super::{or_empty, or_none};
use crate::error::AppError;
use crate::models::{
    Faculty, FacultyListing, FacultyPatch, FacultyProfile, FacultyWithCourses, NewFaculty,
};
use crate::store::schema::{COURSES, DEPARTMENTS, FACULTY, FACULTY_COURSE, OFFICE, PUBLICATIONS};
use crate::store::{Embed, Filter, Query, RemoteStore, decode_rows, decode_single, to_row};

/// Columns matched by free-text search.
pub const SEARCH_COLUMNS: &[&str] = &["name", "email", "designation"];

/// Shorter (trimmed) search terms list everyone instead.
pub const MIN_SEARCH_LEN: usize = 2;

/// Soft-unique key used to reconcile bulk upserts.
pub const CONFLICT_KEY: &str = "email";

#[derive(Clone)]
pub struct FacultyService {
    store: Arc<dyn RemoteStore>,
}

fn department_embed() -> Embed {
    Embed::to_one("department", DEPARTMENTS, "department_id")
        .columns(&["department_id", "department_name"])
}

fn listing_query() -> Query {
    Query::table(FACULTY)
        .embed(department_embed())
        .embed(Embed::to_one("office", OFFICE, "office_id"))
        .order("name", true)
}

fn assignments_embed() -> Embed {
    Embed::to_many(FACULTY_COURSE, "faculty_id").embed(Embed::to_one("course", COURSES, "course_id"))
}

impl FacultyService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_get_all(&self) -> Result<Vec<FacultyListing>, AppError> {
        decode_rows(self.store.select(&listing_query()).await?)
    }

    /// Everyone, alphabetically, with department and office; empty on failure.
    pub async fn get_all(&self) -> Vec<FacultyListing> {
        or_empty("faculty", self.try_get_all().await)
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<FacultyListing, AppError> {
        let query = listing_query().eq("faculty_id", id);
        decode_single(self.store.select(&query).await?)
    }

    /// `None` both when the row is absent and when the fetch failed.
    pub async fn get_by_id(&self, id: i64) -> Option<FacultyListing> {
        or_none("faculty member", self.try_get_by_id(id).await)
    }

    pub async fn try_get_by_department(&self, department_id: i64) -> Result<Vec<FacultyListing>, AppError> {
        let query = listing_query().eq("department_id", department_id);
        decode_rows(self.store.select(&query).await?)
    }

    pub async fn get_by_department(&self, department_id: i64) -> Vec<FacultyListing> {
        or_empty("faculty by department", self.try_get_by_department(department_id).await)
    }

    pub async fn try_search(&self, term: &str) -> Result<Vec<FacultyListing>, AppError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return self.try_get_all().await;
        }

        let query = listing_query().filter(Filter::ilike_any(SEARCH_COLUMNS, term));
        decode_rows(self.store.select(&query).await?)
    }

    /// Case-insensitive match on name, email or designation.
    pub async fn search(&self, term: &str) -> Vec<FacultyListing> {
        or_empty("faculty search", self.try_search(term).await)
    }

    /// Run a search, returning `None` if a newer search began on `sequencer`
    /// before this one finished.
    pub async fn search_latest(
        &self,
        sequencer: &SearchSequencer,
        term: &str,
    ) -> Option<Vec<FacultyListing>> {
        let ticket = sequencer.begin();
        let results = self.search(term).await;
        if sequencer.is_current(ticket) {
            Some(results)
        } else {
            warn!("Discarding stale search results for {:?}", term);
            None
        }
    }

    /// Insert one faculty member. A duplicate email is a `Conflict`.
    pub async fn create(&self, faculty: &NewFaculty) -> Result<Faculty, AppError> {
        let row = self.store.insert(FACULTY, to_row(faculty)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    pub async fn update(&self, id: i64, patch: &FacultyPatch) -> Result<Faculty, AppError> {
        let rows = self
            .store
            .update(FACULTY, &[Filter::eq("faculty_id", id)], to_row(patch)?)
            .await?;
        decode_single(rows)
    }

    /// `true` when a row was removed, `false` when none matched.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let rows = self.store.delete(FACULTY, &[Filter::eq("faculty_id", id)]).await?;
        Ok(!rows.is_empty())
    }

    /// Insert-or-update keyed by email.
    ///
    /// Emails are trimmed and lower-cased. Within one batch the last record for
    /// an email wins, so the store never sees the same key twice. Columns a
    /// record leaves unset keep their stored values.
    pub async fn bulk_upsert(&self, records: Vec<NewFaculty>) -> Result<Vec<Faculty>, AppError> {
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, NewFaculty> = HashMap::new();

        for mut record in records {
            let email = record
                .email
                .as_deref()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Faculty {:?} has no email to upsert on", record.name))
                })?;
            record.email = Some(email.clone());
            if latest.insert(email.clone(), record).is_none() {
                order.push(email);
            }
        }

        let rows = order
            .iter()
            .filter_map(|email| latest.remove(email))
            .map(|record| to_row(&record))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Upserting {} faculty records", rows.len());
        decode_rows(self.store.upsert(FACULTY, rows, CONFLICT_KEY).await?)
    }

    pub async fn try_get_with_courses(&self, id: i64) -> Result<FacultyWithCourses, AppError> {
        let query = Query::table(FACULTY)
            .embed(department_embed())
            .embed(assignments_embed())
            .eq("faculty_id", id);
        decode_single(self.store.select(&query).await?)
    }

    pub async fn get_with_courses(&self, id: i64) -> Option<FacultyWithCourses> {
        or_none("faculty with courses", self.try_get_with_courses(id).await)
    }

    pub async fn try_get_profile(&self, id: i64) -> Result<FacultyProfile, AppError> {
        let query = Query::table(FACULTY)
            .embed(
                Embed::to_one("department", DEPARTMENTS, "department_id")
                    .columns(&["department_id", "department_name", "hod_id"]),
            )
            .embed(Embed::to_one("office", OFFICE, "office_id"))
            .embed(assignments_embed())
            .embed(Embed::to_many(PUBLICATIONS, "faculty_id"))
            .eq("faculty_id", id);
        let mut profile: FacultyProfile = decode_single(self.store.select(&query).await?)?;

        // Embedded lists come back unordered.
        profile
            .publications
            .sort_by(|a, b| b.publication_year.cmp(&a.publication_year));
        profile.faculty_course.sort_by_key(|a| a.assignment.id);
        Ok(profile)
    }

    /// Faculty with department, office, teaching assignments and publications.
    pub async fn get_profile(&self, id: i64) -> Option<FacultyProfile> {
        or_none("faculty profile", self.try_get_profile(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    async fn service() -> FacultyService {
        let store = SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");
        FacultyService::new(Arc::new(store))
    }

    fn new_faculty(name: &str, email: &str) -> NewFaculty {
        NewFaculty {
            name: name.to_string(),
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unset_fields_stay_off_the_row() {
        let row = to_row(&new_faculty("Dr. A", "a@uni.edu")).expect("row");
        let mut keys = row.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(keys, vec!["email", "name"]);
    }

    #[tokio::test]
    async fn bulk_upsert_requires_email() {
        let service = service().await;
        let records = vec![NewFaculty {
            name: "No Mail".to_string(),
            ..Default::default()
        }];

        let err = service.bulk_upsert(records).await.expect_err("missing email");
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(service.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn bulk_upsert_normalises_email() {
        let service = service().await;
        service
            .bulk_upsert(vec![new_faculty("Dr. A", "  A@Uni.EDU ")])
            .await
            .expect("upsert");
        let stored = service
            .bulk_upsert(vec![new_faculty("Dr. A Renamed", "a@uni.edu")])
            .await
            .expect("upsert again");

        assert_eq!(stored.len(), 1);
        let all = service.get_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].faculty.name, "Dr. A Renamed");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let service = service().await;
        let patch = FacultyPatch {
            designation: Some("Professor".to_string()),
            ..Default::default()
        };

        assert!(matches!(service.update(999, &patch).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went() {
        let service = service().await;
        let created = service.create(&new_faculty("Dr. B", "b@uni.edu")).await.expect("create");

        assert!(service.delete(created.faculty_id).await.expect("delete"));
        assert!(!service.delete(created.faculty_id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn one_character_search_lists_everyone() {
        let service = service().await;
        for (name, email) in [("Zed", "z@uni.edu"), ("Amy", "amy@uni.edu")] {
            service.create(&new_faculty(name, email)).await.expect("create");
        }

        let all = service.get_all().await;
        assert_eq!(service.search("q").await, all);
        assert_eq!(service.search("   ").await, all);
        assert_eq!(all[0].faculty.name, "Amy");
    }
}
