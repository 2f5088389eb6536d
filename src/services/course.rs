use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::{or_empty, or_none};
use crate::error::AppError;
use crate::models::{
    Course, CourseAssignment, CourseListing, CoursePatch, FacultyCourse, NewCourse,
    NewFacultyCourse,
};
use crate::store::schema::{COURSES, DEPARTMENTS, FACULTY_COURSE};
use crate::store::{Embed, Filter, Query, RemoteStore, decode_rows, decode_single, to_row};

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn RemoteStore>,
}

fn listing_query() -> Query {
    Query::table(COURSES)
        .embed(
            Embed::to_one("department", DEPARTMENTS, "department_id")
                .columns(&["department_id", "department_name"]),
        )
        .order("course_code", true)
}

impl CourseService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn try_get_all(&self) -> Result<Vec<CourseListing>, AppError> {
        decode_rows(self.store.select(&listing_query()).await?)
    }

    /// Every course by code, with its department.
    pub async fn get_all(&self) -> Vec<CourseListing> {
        or_empty("courses", self.try_get_all().await)
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<CourseListing, AppError> {
        let query = listing_query().eq("course_id", id);
        decode_single(self.store.select(&query).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<CourseListing> {
        or_none("course", self.try_get_by_id(id).await)
    }

    pub async fn try_get_by_department(&self, department_id: i64) -> Result<Vec<CourseListing>, AppError> {
        let query = listing_query().eq("department_id", department_id);
        decode_rows(self.store.select(&query).await?)
    }

    pub async fn get_by_department(&self, department_id: i64) -> Vec<CourseListing> {
        or_empty("courses by department", self.try_get_by_department(department_id).await)
    }

    pub async fn try_get_by_faculty(&self, faculty_id: i64) -> Result<Vec<CourseAssignment>, AppError> {
        let query = Query::table(FACULTY_COURSE)
            .embed(Embed::to_one("course", COURSES, "course_id"))
            .eq("faculty_id", faculty_id)
            .order("id", true);
        decode_rows(self.store.select(&query).await?)
    }

    /// Teaching assignments of one faculty member, each with its course.
    pub async fn get_by_faculty(&self, faculty_id: i64) -> Vec<CourseAssignment> {
        or_empty("courses by faculty", self.try_get_by_faculty(faculty_id).await)
    }

    pub async fn create(&self, course: &NewCourse) -> Result<Course, AppError> {
        let row = self.store.insert(COURSES, to_row(course)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    pub async fn update(&self, id: i64, patch: &CoursePatch) -> Result<Course, AppError> {
        let rows = self
            .store
            .update(COURSES, &[Filter::eq("course_id", id)], to_row(patch)?)
            .await?;
        decode_single(rows)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let rows = self.store.delete(COURSES, &[Filter::eq("course_id", id)]).await?;
        Ok(!rows.is_empty())
    }

    /// Record that a faculty member teaches a course.
    pub async fn assign_to_faculty(
        &self,
        faculty_id: i64,
        course_id: i64,
        semester: Option<&str>,
        academic_year: Option<&str>,
    ) -> Result<FacultyCourse, AppError> {
        info!("Assigning course {} to faculty {}", course_id, faculty_id);
        let assignment = NewFacultyCourse {
            faculty_id,
            course_id,
            semester: semester.map(str::to_string),
            academic_year: academic_year.map(str::to_string),
        };
        let row = self.store.insert(FACULTY_COURSE, to_row(&assignment)?).await?;
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}
