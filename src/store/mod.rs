//! The remote store query contract.
//!
//! Services never talk to a transport directly: they compose a [`Query`] and
//! hand it to whatever [`RemoteStore`] they were constructed with.

pub mod postgrest;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::AppError;

pub use postgrest::{PostgrestConfig, PostgrestStore};
pub use sqlite::SqliteStore;

/// One record as it travels over the store contract.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`; a JSON null compares with `IS NULL`.
    Eq { column: String, value: Value },
    /// Case-insensitive substring match on any of the columns.
    IlikeAny { columns: Vec<String>, term: String },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike_any(columns: &[&str], term: &str) -> Self {
        Filter::IlikeAny {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Parent holds `local_column` pointing at `foreign_column` of `table`.
    ToOne {
        table: String,
        local_column: String,
        foreign_column: String,
    },
    /// Rows of `table` whose `foreign_column` points back at the parent's `local_column`.
    ToMany {
        table: String,
        local_column: String,
        foreign_column: String,
    },
}

impl Relation {
    pub fn table(&self) -> &str {
        match self {
            Relation::ToOne { table, .. } | Relation::ToMany { table, .. } => table,
        }
    }
}

/// A related record (or list of records) nested under `alias` in each result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub alias: String,
    pub relation: Relation,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
}

impl Embed {
    /// Embed the row of `table` that the parent's `local_column` references.
    /// The referenced column is assumed to share the foreign key's name.
    pub fn to_one(alias: &str, table: &str, local_column: &str) -> Self {
        Self {
            alias: alias.to_string(),
            relation: Relation::ToOne {
                table: table.to_string(),
                local_column: local_column.to_string(),
                foreign_column: local_column.to_string(),
            },
            columns: Vec::new(),
            embeds: Vec::new(),
        }
    }

    /// Embed every row of `table` whose `column` references the parent's column of the same name.
    pub fn to_many(table: &str, column: &str) -> Self {
        Self {
            alias: table.to_string(),
            relation: Relation::ToMany {
                table: table.to_string(),
                local_column: column.to_string(),
                foreign_column: column.to_string(),
            },
            columns: Vec::new(),
            embeds: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            embeds: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError>;

    /// Number of rows matching `filters`, without transferring them.
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError>;

    /// Insert one row and return it as stored, generated key included.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, AppError>;

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>, AppError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, AppError>;

    /// Insert rows, merging into existing rows that share `on_conflict`.
    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<Vec<Row>, AppError>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::BadRequest(format!("Expected an object, got {}", other))),
    }
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(AppError::from))
        .collect()
}

/// Exactly one row, or `NotFound` when there are none.
pub fn decode_single<T: DeserializeOwned>(rows: Vec<Row>) -> Result<T, AppError> {
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Ok(serde_json::from_value(Value::Object(row))?),
        (None, _) => Err(AppError::NotFound),
        (Some(_), Some(_)) => Err(AppError::Unknown(
            "Expected a single row, got several".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_single_rejects_empty_and_many() {
        let empty: Result<Value, _> = decode_single(Vec::new());
        assert!(matches!(empty, Err(AppError::NotFound)));

        let row = to_row(&json!({ "a": 1 })).expect("object");
        let many: Result<Value, _> = decode_single(vec![row.clone(), row]);
        assert!(matches!(many, Err(AppError::Unknown(_))));
    }

    #[test]
    fn to_row_requires_an_object() {
        assert!(to_row(&json!([1, 2])).is_err());
        assert_eq!(to_row(&json!({ "x": "y" })).expect("object")["x"], "y");
    }

    #[test]
    fn builder_collects_clauses_in_order() {
        let query = Query::table("faculty")
            .eq("department_id", 3)
            .order("name", true)
            .order("faculty_id", false)
            .limit(10);
        assert_eq!(query.filters, vec![Filter::eq("department_id", 3)]);
        assert_eq!(query.order.len(), 2);
        assert!(!query.order[1].ascending);
        assert_eq!(query.limit, Some(10));
    }
}
