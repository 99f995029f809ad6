//! Tables, columns and boolean expressions

use crate::{quote_ident, SqlError};
use std::fmt;

// =============================================================================
// Tables and columns
// =============================================================================

/// A physical table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table {
    pub name: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn column(&self, name: impl Into<String>) -> Column {
        Column {
            table: self.name.clone(),
            name: name.into(),
        }
    }

    pub fn to_sql(&self) -> String {
        quote_ident(&self.name)
    }
}

/// A column qualified by its table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub table: String,
    pub name: String,
}

impl Column {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }

    /// `self = right`
    pub fn eq(&self, right: impl Into<Operand>) -> BoolExpr {
        BoolExpr::Compare {
            left: self.clone(),
            op: Operator::equal(),
            right: right.into(),
        }
    }

    /// `self <symbol> right` for any valid operator symbol
    pub fn op(&self, symbol: &str, right: impl Into<Operand>) -> Result<BoolExpr, SqlError> {
        Ok(BoolExpr::Compare {
            left: self.clone(),
            op: Operator::parse(symbol)?,
            right: right.into(),
        })
    }

    pub fn to_sql(&self) -> String {
        format!("{}.{}", quote_ident(&self.table), quote_ident(&self.name))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

// =============================================================================
// Literals and operands
// =============================================================================

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn to_sql(&self) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(true) => "TRUE".to_string(),
            Literal::Bool(false) => "FALSE".to_string(),
            Literal::Int(i) => i.to_string(),
            // Debug keeps the decimal point (`1.0`) and uses exponents for large values
            Literal::Float(f) if f.is_finite() => format!("{:?}", f),
            Literal::Float(_) => "NULL".to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(Column),
    Literal(Literal),
}

impl Operand {
    pub fn to_sql(&self) -> String {
        match self {
            Operand::Column(column) => column.to_sql(),
            Operand::Literal(literal) => literal.to_sql(),
        }
    }
}

impl From<Column> for Operand {
    fn from(column: Column) -> Self {
        Operand::Column(column)
    }
}

impl From<Literal> for Operand {
    fn from(literal: Literal) -> Self {
        Operand::Literal(literal)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Literal(Literal::String(s.to_string()))
    }
}

impl From<i64> for Operand {
    fn from(i: i64) -> Self {
        Operand::Literal(Literal::Int(i))
    }
}

impl From<i32> for Operand {
    fn from(i: i32) -> Self {
        Operand::Literal(Literal::Int(i64::from(i)))
    }
}

// =============================================================================
// Operators
// =============================================================================

/// A binary comparison operator.
///
/// Symbols are restricted to runs of `<>=!~` or keyword sequences such as
/// `LIKE` / `NOT ILIKE`; keywords are normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operator(String);

impl Operator {
    pub fn equal() -> Self {
        Operator("=".to_string())
    }

    pub fn parse(symbol: &str) -> Result<Self, SqlError> {
        let symbol = symbol.trim();
        if !symbol.is_empty() && symbol.chars().all(|c| "<>=!~".contains(c)) {
            return Ok(Operator(symbol.to_string()));
        }

        let words: Vec<&str> = symbol.split_whitespace().collect();
        if !words.is_empty() && words.iter().all(|w| w.chars().all(|c| c.is_ascii_alphabetic())) {
            return Ok(Operator(words.join(" ").to_ascii_uppercase()));
        }

        Err(SqlError::InvalidOperator(symbol.to_string()))
    }

    pub fn is_valid(symbol: &str) -> bool {
        Self::parse(symbol).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Boolean expressions
// =============================================================================

/// A boolean expression usable in a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    And(Vec<BoolExpr>),
    Or(Vec<BoolExpr>),
    Not(Box<BoolExpr>),
    Compare {
        left: Column,
        op: Operator,
        right: Operand,
    },
}

impl BoolExpr {
    pub fn and(exprs: Vec<BoolExpr>) -> Self {
        BoolExpr::And(exprs)
    }

    pub fn or(exprs: Vec<BoolExpr>) -> Self {
        BoolExpr::Or(exprs)
    }

    pub fn not(expr: BoolExpr) -> Self {
        BoolExpr::Not(Box::new(expr))
    }

    pub fn to_sql(&self) -> String {
        match self {
            BoolExpr::And(exprs) => join_sql(exprs, " AND ", "TRUE"),
            BoolExpr::Or(exprs) => join_sql(exprs, " OR ", "FALSE"),
            BoolExpr::Not(expr) => format!("NOT ({})", expr.to_sql()),
            BoolExpr::Compare { left, op, right } => {
                format!("{} {} {}", left.to_sql(), op.as_str(), right.to_sql())
            }
        }
    }
}

fn join_sql(exprs: &[BoolExpr], separator: &str, empty: &str) -> String {
    match exprs {
        [] => empty.to_string(),
        [single] => single.to_sql(),
        _ => {
            let parts: Vec<String> = exprs.iter().map(BoolExpr::to_sql).collect();
            format!("({})", parts.join(separator))
        }
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
