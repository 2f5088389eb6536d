use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DepartmentSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: i64,
    pub course_name: String,
    pub course_code: String,
    #[serde(default)]
    pub credits: Option<i32>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub course_name: String,
    pub course_code: String,
    #[serde(default)]
    pub credits: Option<i32>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseListing {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub department: Option<DepartmentSummary>,
}
