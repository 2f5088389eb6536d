//! Local relational store on SQLite.
//!
//! Rows leave the database already shaped as JSON objects (`json_object`), and
//! embeds are correlated sub-selects, so callers see the same contract as the
//! hosted backend.

use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::schema::{self, TableSchema};
use super::{Embed, Filter, Query, Relation, RemoteStore, Row};
use crate::error::AppError;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its single connection.
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(if in_memory { None } else { Some(std::time::Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(std::time::Duration::from_secs(1800)) })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Unknown(format!("Failed to run migrations: {}", e)))?;

        info!("sqlite store ready at {}", url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_rows(&self, builder: QueryBuilder<'_, Sqlite>) -> Result<Vec<Row>, AppError> {
        self.fetch_json::<Row>(builder).await
    }

    /// Run a query whose single column is JSON text and decode each row.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        mut builder: QueryBuilder<'_, Sqlite>,
    ) -> Result<Vec<T>, AppError> {
        debug!("sqlite: {}", builder.sql());
        let rows = builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|text| serde_json::from_str::<T>(text).map_err(AppError::from))
            .collect()
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        let table = schema::require(&query.table)?;
        let (filters, text) = split_filters(table, &query.filters)?;
        let mut next_alias = 0;
        let mut object = row_object(table, "t0", &query.columns, &query.embeds, &mut next_alias)?;
        if !text.is_empty() {
            object = format!("json_array({}, {})", object, haystack(&text, "t0"));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} t0",
            object, table.name
        ));
        push_filters(&mut builder, table, "t0", &filters)?;

        for (i, order) in query.order.iter().enumerate() {
            check_column(table, &order.column)?;
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push(format!(
                "t0.{} COLLATE NOCASE {} NULLS LAST",
                order.column,
                if order.ascending { "ASC" } else { "DESC" }
            ));
        }

        if text.is_empty() {
            if let Some(limit) = query.limit {
                builder.push(format!(" LIMIT {}", limit));
            }
            return self.fetch_rows(builder).await;
        }

        // Text filters run here, so the limit applies to what survives them.
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let mut rows = Vec::new();
        for (row, fields) in self.fetch_json::<(Row, Vec<Vec<Value>>)>(builder).await? {
            if rows.len() >= limit {
                break;
            }
            if text.iter().zip(&fields).all(|(m, values)| m.matches(values)) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let table = schema::require(table)?;
        let (plain, text) = split_filters(table, filters)?;
        if !text.is_empty() {
            let mut query = Query::table(table.name).columns(&[table.primary_key]);
            query.filters = filters.to_vec();
            return Ok(self.select(&query).await?.len() as u64);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", table.name));
        push_filters(&mut builder, table, table.name, &plain)?;

        let count = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, AppError> {
        let table = schema::require(table)?;
        let builder = insert_statement(table, &row, None)?;

        self.fetch_rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unknown("Insert returned no row".to_string()))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>, AppError> {
        let table = schema::require(table)?;
        if filters.is_empty() {
            return Err(AppError::BadRequest("Refusing to update without a filter".to_string()));
        }
        if patch.is_empty() {
            // Nothing to write; report the rows that would have been touched.
            let mut query = Query::table(table.name);
            query.filters = filters.to_vec();
            return self.select(&query).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table.name));
        for (i, (column, value)) in patch.iter().enumerate() {
            check_column(table, column)?;
            if i > 0 {
                builder.push(", ");
            }
            builder.push(format!("{} = ", column));
            push_value(&mut builder, value);
        }
        push_filters(&mut builder, table, table.name, filters)?;
        builder.push(format!(" RETURNING {}", plain_object(table)));

        self.fetch_rows(builder).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, AppError> {
        let table = schema::require(table)?;
        if filters.is_empty() {
            return Err(AppError::BadRequest("Refusing to delete without a filter".to_string()));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", table.name));
        push_filters(&mut builder, table, table.name, filters)?;
        builder.push(format!(" RETURNING {}", plain_object(table)));

        self.fetch_rows(builder).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<Vec<Row>, AppError> {
        let table = schema::require(table)?;
        check_column(table, on_conflict)?;

        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(rows.len());

        for row in &rows {
            let mut builder = insert_statement(table, row, Some(on_conflict))?;
            let text = builder
                .build_query_scalar::<String>()
                .fetch_one(&mut *tx)
                .await?;
            stored.push(serde_json::from_str::<Row>(&text)?);
        }

        tx.commit().await?;
        Ok(stored)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_column(table: &TableSchema, column: &str) -> Result<(), AppError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(AppError::Unknown(format!(
            "Column {}.{} does not exist",
            table.name, column
        )))
    }
}

/// `json_object(...)` over a table alias, with embeds as correlated sub-selects.
fn row_object(
    table: &TableSchema,
    alias: &str,
    columns: &[String],
    embeds: &[Embed],
    next_alias: &mut usize,
) -> Result<String, AppError> {
    let mut parts = Vec::new();

    if columns.is_empty() {
        for column in table.columns {
            parts.push(format!("'{0}', {1}.{0}", column, alias));
        }
    } else {
        for column in columns {
            check_column(table, column)?;
            parts.push(format!("'{0}', {1}.{0}", column, alias));
        }
    }

    for embed in embeds {
        if !is_identifier(&embed.alias) {
            return Err(AppError::BadRequest(format!("Invalid embed alias: {}", embed.alias)));
        }
        let child = schema::require(embed.relation.table())?;
        *next_alias += 1;
        let child_alias = format!("t{}", next_alias);
        let inner = row_object(child, &child_alias, &embed.columns, &embed.embeds, next_alias)?;

        let sub_select = match &embed.relation {
            Relation::ToOne { local_column, foreign_column, .. } => {
                check_column(table, local_column)?;
                check_column(child, foreign_column)?;
                format!(
                    "SELECT {inner} FROM {child} {ca} WHERE {ca}.{fc} = {alias}.{lc} LIMIT 1",
                    inner = inner,
                    child = child.name,
                    ca = child_alias,
                    fc = foreign_column,
                    alias = alias,
                    lc = local_column,
                )
            }
            Relation::ToMany { local_column, foreign_column, .. } => {
                check_column(table, local_column)?;
                check_column(child, foreign_column)?;
                format!(
                    "SELECT json_group_array({inner}) FROM {child} {ca} WHERE {ca}.{fc} = {alias}.{lc}",
                    inner = inner,
                    child = child.name,
                    ca = child_alias,
                    fc = foreign_column,
                    alias = alias,
                    lc = local_column,
                )
            }
        };

        // json() keeps the nested value as JSON instead of a quoted string.
        parts.push(format!("'{}', json(({}))", embed.alias, sub_select));
    }

    Ok(format!("json_object({})", parts.join(", ")))
}

/// `json_object(...)` over unqualified columns, for RETURNING clauses.
fn plain_object(table: &TableSchema) -> String {
    let parts = table
        .columns
        .iter()
        .map(|c| format!("'{0}', {0}", c))
        .collect::<Vec<_>>();
    format!("json_object({})", parts.join(", "))
}

fn insert_statement<'a>(
    table: &TableSchema,
    row: &Row,
    on_conflict: Option<&str>,
) -> Result<QueryBuilder<'a, Sqlite>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {}", table.name));

    if row.is_empty() {
        builder.push(" DEFAULT VALUES");
    } else {
        let columns = row.keys().map(String::as_str).collect::<Vec<_>>();
        for column in &columns {
            check_column(table, column)?;
        }
        builder.push(format!(" ({}) VALUES (", columns.join(", ")));
        for (i, value) in row.values().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");

        if let Some(conflict) = on_conflict {
            let mut assignments = columns
                .iter()
                .filter(|c| **c != conflict && **c != table.primary_key)
                .map(|c| format!("{0} = excluded.{0}", c))
                .collect::<Vec<_>>();
            if assignments.is_empty() {
                assignments.push(format!("{0} = excluded.{0}", conflict));
            }
            builder.push(format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                conflict,
                assignments.join(", ")
            ));
        }
    }

    builder.push(format!(" RETURNING {}", plain_object(table)));
    Ok(builder)
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    table: &TableSchema,
    alias: &str,
    filters: &[Filter],
) -> Result<(), AppError> {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });

        match filter {
            Filter::Eq { column, value } => {
                check_column(table, column)?;
                if value.is_null() {
                    builder.push(format!("{}.{} IS NULL", alias, column));
                } else {
                    builder.push(format!("{}.{} = ", alias, column));
                    push_value(builder, value);
                }
            }
            Filter::IlikeAny { .. } => {
                return Err(AppError::BadRequest(
                    "Text search is only supported on reads".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            builder.push_bind(None::<String>);
        }
        Value::Bool(b) => {
            builder.push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                builder.push_bind(i);
            }
            None => {
                builder.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        other => {
            builder.push_bind(other.to_string());
        }
    }
}

/// A case-insensitive substring filter, matched in Rust.
///
/// SQLite's `LOWER` and `LIKE` only fold ASCII, so both sides are folded
/// here with Unicode lower-casing instead.
struct TextMatch {
    columns: Vec<String>,
    needle: String,
}

impl TextMatch {
    fn matches(&self, values: &[Value]) -> bool {
        values.iter().any(|value| match value {
            Value::Null => false,
            Value::String(s) => s.to_lowercase().contains(&self.needle),
            other => other.to_string().to_lowercase().contains(&self.needle),
        })
    }
}

/// Separate filters SQL can evaluate from text matches done after reading.
fn split_filters(
    table: &TableSchema,
    filters: &[Filter],
) -> Result<(Vec<Filter>, Vec<TextMatch>), AppError> {
    let mut plain = Vec::new();
    let mut text = Vec::new();
    for filter in filters {
        match filter {
            Filter::Eq { .. } => plain.push(filter.clone()),
            Filter::IlikeAny { columns, term } => {
                for column in columns {
                    check_column(table, column)?;
                }
                text.push(TextMatch {
                    columns: columns.clone(),
                    needle: term.to_lowercase(),
                });
            }
        }
    }
    Ok((plain, text))
}

/// `json_array(json_array(a.c1, a.c2), ...)`, one inner array per text match.
fn haystack(text: &[TextMatch], alias: &str) -> String {
    let groups = text
        .iter()
        .map(|m| {
            let columns = m
                .columns
                .iter()
                .map(|c| format!("{}.{}", alias, c))
                .collect::<Vec<_>>();
            format!("json_array({})", columns.join(", "))
        })
        .collect::<Vec<_>>();
    format!("json_array({})", groups.join(", "))
}
