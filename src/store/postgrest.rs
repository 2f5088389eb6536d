//! Hosted store backend speaking the PostgREST dialect (as exposed by Supabase).

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Embed, Filter, Order, Query, Relation, RemoteStore, Row, schema};
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

pub struct PostgrestStore {
    client: Client,
    config: PostgrestConfig,
}

impl PostgrestStore {
    pub fn new(config: PostgrestConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, AppError> {
        schema::require(table)?;
        let url = format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key)))
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<Row>, AppError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str::<Vec<Row>>(&body)?)
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        let mut params = vec![(
            "select".to_string(),
            render_select(&query.columns, &query.embeds),
        )];
        params.extend(filter_params(&query.filters));
        if !query.order.is_empty() {
            params.push(("order".to_string(), render_order(&query.order)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        debug!("select {} {:?}", query.table, params);
        let request = self.request(Method::GET, &query.table)?.query(&params);
        self.send_rows(request).await
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(filters));

        let response = self
            .request(Method::HEAD, table)?
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error(status, ""));
        }

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| AppError::Unknown("Missing Content-Range on count".to_string()))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, AppError> {
        let request = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&row);

        self.send_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unknown("Insert returned no row".to_string()))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> Result<Vec<Row>, AppError> {
        if filters.is_empty() {
            return Err(AppError::BadRequest("Refusing to update without a filter".to_string()));
        }

        let request = self
            .request(Method::PATCH, table)?
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(&patch);
        self.send_rows(request).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, AppError> {
        if filters.is_empty() {
            return Err(AppError::BadRequest("Refusing to delete without a filter".to_string()));
        }

        let request = self
            .request(Method::DELETE, table)?
            .header("Prefer", "return=representation")
            .query(&filter_params(filters));
        self.send_rows(request).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Row>, on_conflict: &str) -> Result<Vec<Row>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // A bulk body must share one key set; rows with different keys go in
        // separate requests so absent columns are left untouched on merge.
        let mut stored = Vec::with_capacity(rows.len());
        for (columns, batch) in group_by_keys(rows) {
            debug!("upsert {} ({}) x{}", table, columns, batch.len());
            let request = self
                .request(Method::POST, table)?
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .query(&[("on_conflict", on_conflict), ("columns", columns.as_str())])
                .json(&batch);
            stored.extend(self.send_rows(request).await?);
        }
        Ok(stored)
    }
}

/// Render the `order` parameter. NULLs sort last in both directions.
pub fn render_order(order: &[Order]) -> String {
    order
        .iter()
        .map(|o| {
            format!(
                "{}.{}.nullslast",
                o.column,
                if o.ascending { "asc" } else { "desc" }
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Split rows into batches sharing the same key set, in first-seen order.
/// Each batch is paired with its comma-joined column list.
pub fn group_by_keys(rows: Vec<Row>) -> Vec<(String, Vec<Row>)> {
    let mut groups: Vec<(String, Vec<Row>)> = Vec::new();
    for row in rows {
        let mut keys = row.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        let columns = keys.join(",");
        match groups.iter_mut().find(|(c, _)| *c == columns) {
            Some((_, batch)) => batch.push(row),
            None => groups.push((columns, vec![row])),
        }
    }
    groups
}

/// Render the `select` parameter, e.g. `*,department:department_id(department_id,department_name)`.
pub fn render_select(columns: &[String], embeds: &[Embed]) -> String {
    let mut parts: Vec<String> = if columns.is_empty() {
        vec!["*".to_string()]
    } else {
        columns.to_vec()
    };

    for embed in embeds {
        let target = match &embed.relation {
            Relation::ToOne { local_column, .. } => local_column.as_str(),
            Relation::ToMany { table, .. } => table.as_str(),
        };
        let head = if embed.alias == target {
            target.to_string()
        } else {
            format!("{}:{}", embed.alias, target)
        };
        parts.push(format!("{}({})", head, render_select(&embed.columns, &embed.embeds)));
    }

    parts.join(",")
}

pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value: Value::Null } => (column.clone(), "is.null".to_string()),
            Filter::Eq { column, value } => (column.clone(), format!("eq.{}", literal(value))),
            Filter::IlikeAny { columns, term } => {
                let pattern = quote(&format!("*{}*", term));
                let alternatives = columns
                    .iter()
                    .map(|c| format!("{}.ilike.{}", c, pattern))
                    .collect::<Vec<_>>()
                    .join(",");
                ("or".to_string(), format!("({})", alternatives))
            }
        })
        .collect()
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Reserved characters inside `or=(...)` need a double-quoted value.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Total from a `Content-Range` header: `0-24/3573` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

pub fn map_error(status: StatusCode, body: &str) -> AppError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (&parsed.message, &parsed.details) {
        (Some(m), Some(d)) => format!("{} ({})", m, d),
        (Some(m), None) => m.clone(),
        _ if !body.is_empty() => body.to_string(),
        _ => status.to_string(),
    };

    match parsed.code.as_deref() {
        Some("23505") => return AppError::Conflict(message),
        Some("PGRST116") => return AppError::NotFound,
        _ => {}
    }

    match status {
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::NOT_FOUND => AppError::NotFound,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            AppError::RemoteUnavailable(message)
        }
        _ => AppError::Unknown(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::store::to_row;

    #[test]
    fn select_renders_nested_embeds() {
        let embeds = vec![
            Embed::to_one("department", "departments", "department_id")
                .columns(&["department_id", "department_name"]),
            Embed::to_one("office", "office", "office_id"),
            Embed::to_many("faculty_course", "faculty_id")
                .embed(Embed::to_one("course", "courses", "course_id")),
        ];

        assert_eq!(
            render_select(&[], &embeds),
            "*,department:department_id(department_id,department_name),\
             office:office_id(*),faculty_course(*,course:course_id(*))"
        );
    }

    #[test]
    fn search_becomes_quoted_or_group() {
        let params = filter_params(&[Filter::ilike_any(&["name", "email"], "jane")]);
        assert_eq!(
            params,
            vec![(
                "or".to_string(),
                "(name.ilike.\"*jane*\",email.ilike.\"*jane*\")".to_string()
            )]
        );
    }

    #[test]
    fn eq_filters_render_literals() {
        let params = filter_params(&[
            Filter::eq("department_id", 4),
            Filter::eq("email", "a@b.edu"),
            Filter::eq("office_id", Value::Null),
        ]);
        assert_eq!(params[0], ("department_id".to_string(), "eq.4".to_string()));
        assert_eq!(params[1], ("email".to_string(), "eq.a@b.edu".to_string()));
        assert_eq!(params[2], ("office_id".to_string(), "is.null".to_string()));
    }

    #[test]
    fn order_keeps_nulls_last() {
        let query = Query::table("publications")
            .order("publication_year", false)
            .order("created_at", false);
        assert_eq!(
            render_order(&query.order),
            "publication_year.desc.nullslast,created_at.desc.nullslast"
        );
        let office = Query::table("office").order("block", true);
        assert_eq!(render_order(&office.order), "block.asc.nullslast");
    }

    #[test]
    fn upsert_batches_share_a_key_set() {
        let rows = vec![
            to_row(&json!({ "name": "A", "email": "a@uni.edu" })).expect("row"),
            to_row(&json!({ "name": "B", "email": "b@uni.edu", "office_id": 3 })).expect("row"),
            to_row(&json!({ "email": "c@uni.edu", "name": "C" })).expect("row"),
        ];

        let groups = group_by_keys(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "email,name");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1]["name"], "C");
        assert_eq!(groups[1].0, "email,name,office_id");
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn unique_violation_is_conflict() {
        let body = json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"faculty_email_key\"",
            "details": "Key (email)=(jane@uni.edu) already exists.",
            "hint": null
        })
        .to_string();

        assert!(matches!(map_error(StatusCode::CONFLICT, &body), AppError::Conflict(_)));
    }

    #[test]
    fn gateway_errors_are_unavailable() {
        assert!(matches!(
            map_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            AppError::RemoteUnavailable(_)
        ));
        assert!(matches!(
            map_error(StatusCode::BAD_REQUEST, "{\"code\":\"PGRST204\",\"message\":\"no column\"}"),
            AppError::Unknown(m) if m == "no column"
        ));
    }
}
