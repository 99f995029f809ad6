//! Relational expression builder
//!
//! A small, dialect-neutral model of a `SELECT` statement: tables, columns,
//! boolean expressions and a builder (`SelectStmt`) that clauses are added to
//! one call at a time. Statements render to ANSI SQL with quoted identifiers
//! and inlined, escaped literals.

mod expr;
mod query;

pub use expr::{BoolExpr, Column, Literal, Operand, Operator, Table};
pub use query::{Join, JoinKind, LabeledColumn, OrderByExpr, SelectStmt, SortDir};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlError {
    #[error("Invalid operator: {0:?}")]
    InvalidOperator(String),
}

/// Quote an identifier with double quotes
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
