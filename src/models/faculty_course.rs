use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Course;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyCourse {
    pub id: i64,
    pub faculty_id: i64,
    pub course_id: i64,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFacultyCourse {
    pub faculty_id: i64,
    pub course_id: i64,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub academic_year: Option<String>,
}

/// A teaching assignment with the course it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAssignment {
    #[serde(flatten)]
    pub assignment: FacultyCourse,
    #[serde(default)]
    pub course: Option<Course>,
}
