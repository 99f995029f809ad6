//! DuckDB executor for delegated statements

use duckdb::types::ValueRef;
use duckdb::{Connection, Result as DuckResult};
use quarry_query::Row;
use quarry_sql::SelectStmt;
use serde_json::Value as Json;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),
}

/// Resource limits applied to a statement
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionBudget {
    pub max_memory_mb: Option<u64>,
    pub max_rows: Option<u64>,
}

pub struct DuckExecutor {
    conn: Connection,
}

impl DuckExecutor {
    pub fn open_in_memory() -> DuckResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> DuckResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a statement and collect its rows as JSON values
    pub fn execute(&self, select: &SelectStmt, budget: Option<ExecutionBudget>) -> Result<QueryResult, ExecutionError> {
        if let Some(ref budget) = budget {
            self.apply_budget(budget)?;
        }

        let sql = select.to_sql();
        debug!(sql = %sql, "executing statement");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        // Column names are only known once the statement ran
        let columns: Vec<String> = rows.as_ref().map(|stmt| stmt.column_names()).unwrap_or_default();

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut json_row = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                json_row.push(to_json(row.get_ref(i)?));
            }
            result_rows.push(json_row);

            if let Some(max_rows) = budget.and_then(|budget| budget.max_rows) {
                if result_rows.len() as u64 > max_rows {
                    return Err(ExecutionError::BudgetExceeded(format!("Max rows ({}) exceeded", max_rows)));
                }
            }
        }

        debug!(rows = result_rows.len(), "statement done");
        Ok(QueryResult {
            row_count: result_rows.len(),
            columns,
            rows: result_rows,
        })
    }

    fn apply_budget(&self, budget: &ExecutionBudget) -> Result<(), ExecutionError> {
        if let Some(max_memory_mb) = budget.max_memory_mb {
            let pragma = format!("PRAGMA memory_limit='{}MB'", max_memory_mb);
            self.conn.execute_batch(&pragma)?;
        }
        Ok(())
    }
}

fn to_json(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Null => Json::Null,
        ValueRef::Boolean(b) => Json::Bool(b),
        ValueRef::TinyInt(i) => Json::from(i),
        ValueRef::SmallInt(i) => Json::from(i),
        ValueRef::Int(i) => Json::from(i),
        ValueRef::BigInt(i) => Json::from(i),
        ValueRef::UTinyInt(i) => Json::from(i),
        ValueRef::USmallInt(i) => Json::from(i),
        ValueRef::UInt(i) => Json::from(i),
        ValueRef::UBigInt(i) => Json::from(i),
        ValueRef::Float(f) => serde_json::json!(f),
        ValueRef::Double(f) => serde_json::json!(f),
        ValueRef::Text(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        other => {
            tracing::trace!(data_type = ?other.data_type(), "unsupported value type, read as null");
            Json::Null
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Json>>,
    pub row_count: usize,
}

impl QueryResult {
    /// Rows keyed by column name, the shape residual queries evaluate on
    pub fn into_rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect()
    }
}
