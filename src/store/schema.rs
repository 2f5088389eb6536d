//! Static description of the tables the directory reads and writes.
//!
//! The local store needs explicit column lists to build `json_object` rows,
//! and both backends use it to reject unknown tables before touching the wire.

use crate::error::AppError;

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

pub const DEPARTMENTS: &str = "departments";
pub const OFFICE: &str = "office";
pub const FACULTY: &str = "faculty";
pub const COURSES: &str = "courses";
pub const PUBLICATIONS: &str = "publications";
pub const FACULTY_COURSE: &str = "faculty_course";
pub const SCRAPE_LOG: &str = "scrape_log";

pub static TABLES: &[TableSchema] = &[
    TableSchema {
        name: DEPARTMENTS,
        primary_key: "department_id",
        columns: &["department_id", "department_name", "hod_id", "created_at"],
    },
    TableSchema {
        name: OFFICE,
        primary_key: "office_id",
        columns: &["office_id", "room_number", "block", "location", "created_at"],
    },
    TableSchema {
        name: FACULTY,
        primary_key: "faculty_id",
        columns: &[
            "faculty_id",
            "name",
            "designation",
            "qualification",
            "email",
            "phone",
            "profile_link",
            "department_id",
            "office_id",
            "created_at",
        ],
    },
    TableSchema {
        name: COURSES,
        primary_key: "course_id",
        columns: &[
            "course_id",
            "course_name",
            "course_code",
            "credits",
            "department_id",
            "created_at",
        ],
    },
    TableSchema {
        name: PUBLICATIONS,
        primary_key: "publication_id",
        columns: &[
            "publication_id",
            "faculty_id",
            "title",
            "journal",
            "publication_year",
            "link",
            "created_at",
        ],
    },
    TableSchema {
        name: FACULTY_COURSE,
        primary_key: "id",
        columns: &[
            "id",
            "faculty_id",
            "course_id",
            "semester",
            "academic_year",
            "created_at",
        ],
    },
    TableSchema {
        name: SCRAPE_LOG,
        primary_key: "log_id",
        columns: &["log_id", "records_updated", "status", "error_message", "timestamp"],
    },
];

pub fn table(name: &str) -> Option<&'static TableSchema> {
    TABLES.iter().find(|t| t.name == name)
}

pub fn require(name: &str) -> Result<&'static TableSchema, AppError> {
    table(name).ok_or_else(|| AppError::Unknown(format!("Unknown table: {}", name)))
}
