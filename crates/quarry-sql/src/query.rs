//! SELECT statement builder

use crate::expr::{BoolExpr, Column, Table};
use crate::quote_ident;
use std::fmt;

// =============================================================================
// SELECT list
// =============================================================================

/// A projected column and the name it is exposed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledColumn {
    pub column: Column,
    pub label: String,
}

impl LabeledColumn {
    pub fn to_sql(&self) -> String {
        format!("{} AS {}", self.column.to_sql(), quote_ident(&self.label))
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByExpr {
    pub column: Column,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            column,
            dir: SortDir::Desc,
        }
    }

    pub fn to_sql(&self) -> String {
        let dir = match self.dir {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        };
        format!("{} {}", self.column.to_sql(), dir)
    }
}
// =============================================================================
// JOIN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Rows without a match are dropped
    Inner,
    /// Rows without a match are kept, with NULL in the joined columns
    Left,
}

/// A table joined to the statement on a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: Table,
    pub on: BoolExpr,
}

impl Join {
    pub fn to_sql(&self) -> String {
        let kind = match self.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        format!("{} {} ON {}", kind, self.table.to_sql(), self.on.to_sql())
    }
}

// =============================================================================
// SELECT statement
// =============================================================================

/// A SELECT statement built clause by clause.
///
/// A table appears at most once: joining a table the statement already
/// reaches keeps the existing join, made inner if an inner join is asked
/// for. Every builder method consumes and returns the statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectStmt {
    pub from: Table,
    pub joins: Vec<Join>,
    pub columns: Vec<LabeledColumn>,
    pub predicates: Vec<BoolExpr>,
    pub order_by: Vec<OrderByExpr>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub distinct: bool,
}

impl SelectStmt {
    pub fn from_table(table: Table) -> Self {
        Self {
            from: table,
            joins: Vec::new(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            distinct: false,
        }
    }

    /// Inner join `table` on `on`
    pub fn join(self, table: Table, on: BoolExpr) -> Self {
        self.add_join(JoinKind::Inner, table, on)
    }

    /// Left outer join `table` on `on`
    pub fn left_join(self, table: Table, on: BoolExpr) -> Self {
        self.add_join(JoinKind::Left, table, on)
    }

    fn add_join(mut self, kind: JoinKind, table: Table, on: BoolExpr) -> Self {
        if self.from == table {
            return self;
        }
        match self.joins.iter().position(|join| join.table == table) {
            Some(index) => {
                if kind == JoinKind::Inner {
                    self.joins[index].kind = JoinKind::Inner;
                }
            }
            None => self.joins.push(Join { kind, table, on }),
        }
        self
    }

    /// AND a predicate into the WHERE clause, skipping exact duplicates
    pub fn and_where(mut self, predicate: BoolExpr) -> Self {
        if !self.predicates.contains(&predicate) {
            self.predicates.push(predicate);
        }
        self
    }

    pub fn order_by(mut self, order: OrderByExpr) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sort by `keys` first; the keys already present only break ties
    pub fn order_by_first(mut self, keys: Vec<OrderByExpr>) -> Self {
        let previous = std::mem::replace(&mut self.order_by, keys);
        self.order_by.extend(previous);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn append_column(mut self, column: Column, label: impl Into<String>) -> Self {
        self.columns.push(LabeledColumn {
            column,
            label: label.into(),
        });
        self
    }

    /// Whether `table` is the FROM table or one of the joined tables
    pub fn reaches(&self, table: &str) -> bool {
        self.from.name == table || self.joins.iter().any(|join| join.table.name == table)
    }

    /// The column as seen through this statement, `None` when its table is
    /// not reachable
    pub fn corresponding_column(&self, column: &Column) -> Option<Column> {
        self.reaches(&column.table).then(|| column.clone())
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<String> = self.columns.iter().map(LabeledColumn::to_sql).collect();
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from.to_sql());
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        if !self.predicates.is_empty() {
            let predicates: Vec<String> = self.predicates.iter().map(BoolExpr::to_sql).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(OrderByExpr::to_sql).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
