//! Table API endpoints
//!
//! Rows are filtered with the `filter.<column>.op` / `filter.<column>.value`
//! query parameters and paged with `pageIndex` / `pageSize`.

use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::routing::get;
use axum::{Json, Router};
use gridline::{PaginatedEnvelope, QueryParams, TableColumns};
use serde::Serialize;

use crate::api::extractors::TablePath;
use crate::api::types::ApiError;
use crate::data::Row;
use crate::domain::{ApplyError, Table, TableCatalog};

#[derive(Clone)]
pub struct TablesApiState {
    pub catalog: Arc<TableCatalog>,
}

impl TablesApiState {
    fn table(&self, name: &str) -> Result<&Arc<Table>, ApiError> {
        self.catalog
            .get(name)
            .ok_or_else(|| ApiError::not_found("TABLE_NOT_FOUND", format!("Unknown table: {}", name)))
    }
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

pub fn routes(catalog: Arc<TableCatalog>) -> Router<()> {
    let state = TablesApiState { catalog };

    Router::new()
        .route("/", get(list_tables))
        .route("/{table}/columns", get(get_columns))
        .route("/{table}/rows", get(list_rows))
        .with_state(state)
}

/// Names of every registered table
pub async fn list_tables(State(state): State<TablesApiState>) -> Json<TablesResponse> {
    Json(TablesResponse {
        tables: state.catalog.names().map(str::to_string).collect(),
    })
}

/// Column metadata with the operators each column accepts
pub async fn get_columns(
    State(state): State<TablesApiState>,
    path: TablePath,
) -> Result<Json<TableColumns>, ApiError> {
    let table = state.table(&path.table)?;
    Ok(Json(table.columns()))
}

/// One page of filtered rows
pub async fn list_rows(
    State(state): State<TablesApiState>,
    path: TablePath,
    RawQuery(query): RawQuery,
) -> Result<(HeaderMap, Json<PaginatedEnvelope<Row>>), ApiError> {
    let table = state.table(&path.table)?;

    let params = QueryParams::from_query_string(query.as_deref().unwrap_or_default())
        .map_err(ApplyError::from)?;
    let page = table.query(&params).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((headers, Json(page)))
}
