use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CourseAssignment, DepartmentSummary, Office, Publication};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faculty {
    pub faculty_id: i64,
    pub name: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_link: Option<String>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub office_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A faculty record to create or merge. Unset fields are not sent, so a merge
/// on `email` leaves those columns as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFaculty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_id: Option<i64>,
}

/// Partial update. Only fields that are `Some` are sent to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacultyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_id: Option<i64>,
}

/// Directory row: faculty with its department name and office resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyListing {
    #[serde(flatten)]
    pub faculty: Faculty,
    #[serde(default)]
    pub department: Option<DepartmentSummary>,
    #[serde(default)]
    pub office: Option<Office>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyWithCourses {
    #[serde(flatten)]
    pub faculty: Faculty,
    #[serde(default)]
    pub department: Option<DepartmentSummary>,
    #[serde(default)]
    pub faculty_course: Vec<CourseAssignment>,
}

/// Everything the detail screen shows for one faculty member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyProfile {
    #[serde(flatten)]
    pub faculty: Faculty,
    #[serde(default)]
    pub department: Option<DepartmentSummary>,
    #[serde(default)]
    pub office: Option<Office>,
    #[serde(default)]
    pub faculty_course: Vec<CourseAssignment>,
    #[serde(default)]
    pub publications: Vec<Publication>,
}

/// Faculty reference embedded into publication listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyName {
    pub faculty_id: i64,
    pub name: String,
}
