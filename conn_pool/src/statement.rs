//! Statement composition and cache keys
//!
//! SQL is composed from table/join/where/limit/order fragments with `?`
//! placeholders, rewritten for null-safe equality predicates, and renumbered
//! to `$n` for dialects that want numbered placeholders. Cached statements
//! are keyed structurally by operation kind, table and clause shape.

use crate::dialect::Dialect;
use param_bind::SqlValue;

/// The operation a cached statement performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementOp {
    Insert,
    Update,
    Delete,
    Select,
    Count,
}

/// Structured statement-cache key: operation kind, table, and an optional
/// clause-shape tag distinguishing filtered variants. A given key must always
/// correspond to the same SQL shape; that discipline is the caller's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    pub op: StatementOp,
    pub table: String,
    pub shape: Option<String>,
}

impl StatementKey {
    pub fn insert(table: impl Into<String>) -> Self {
        Self {
            op: StatementOp::Insert,
            table: table.into(),
            shape: None,
        }
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self {
            op: StatementOp::Update,
            table: table.into(),
            shape: None,
        }
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self {
            op: StatementOp::Delete,
            table: table.into(),
            shape: None,
        }
    }

    pub fn select(table: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            op: StatementOp::Select,
            table: table.into(),
            shape: Some(shape.into()),
        }
    }

    pub fn count(table: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            op: StatementOp::Count,
            table: table.into(),
            shape: Some(shape.into()),
        }
    }
}

/// Discriminator predicate for single-table inheritance: `column=?` is ANDed
/// onto every statement's WHERE and `value` is bound as the trailing
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub column: String,
    pub value: String,
}

impl Discriminator {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn bind_value(&self) -> SqlValue {
        SqlValue::Text(self.value.clone())
    }
}

/// Fragments of a SELECT statement. Placeholders in `where_clause` and `join`
/// are written `?`; their order must match the caller's parameter list.
#[derive(Debug, Clone, Default)]
pub struct SelectSpec {
    /// Projection, e.g. `"t.id, t.name"` or `"COUNT(*) AS total"`
    pub columns: String,
    pub table: String,
    pub join: Option<String>,
    pub where_clause: Option<String>,
    /// `ORDER BY` content without the keyword, e.g. `"id ASC"`
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub discriminator: Option<Discriminator>,
}

/// Compose a SELECT from its fragments.
///
/// The discriminator predicate is ANDed with any explicit WHERE. A dialect
/// without LIMIT support gets no limit fragment; enforcing the limit is then
/// the caller's responsibility.
pub fn compose_select(spec: &SelectSpec, dialect: Dialect) -> String {
    let mut sql = String::with_capacity(64);
    sql.push_str("SELECT ");
    if spec.columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&spec.columns);
    }
    sql.push_str(" FROM ");
    sql.push_str(&spec.table);

    if let Some(join) = &spec.join {
        if !join.is_empty() {
            sql.push(' ');
            sql.push_str(join);
        }
    }

    let mut predicates: Vec<&str> = Vec::new();
    if let Some(where_clause) = &spec.where_clause {
        if !where_clause.is_empty() {
            predicates.push(where_clause);
        }
    }
    let discriminator_predicate;
    if let Some(discriminator) = &spec.discriminator {
        discriminator_predicate = format!("{}=?", discriminator.column);
        predicates.push(&discriminator_predicate);
    }
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(order) = &spec.order {
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
    }

    if let Some(limit) = spec.limit {
        if dialect.supports_limit() {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        } else {
            tracing::warn!(
                dialect = dialect.display_name(),
                limit,
                "dialect lacks LIMIT, fragment omitted"
            );
        }
    }
    if let Some(offset) = spec.offset {
        if dialect.supports_limit() {
            sql.push_str(" OFFSET ");
            sql.push_str(&offset.to_string());
        }
    }

    sql
}

/// Compose an INSERT over the non-key columns, the discriminator column when
/// declared, and an optional `RETURNING` clause for the generated key.
pub fn compose_insert(
    table: &str,
    columns: &[&str],
    discriminator: Option<&Discriminator>,
    returning: Option<&str>,
) -> String {
    let mut names: Vec<&str> = columns.to_vec();
    if let Some(d) = discriminator {
        names.push(&d.column);
    }
    let placeholders = vec!["?"; names.len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders
    );
    if let Some(pk) = returning {
        sql.push_str(" RETURNING ");
        sql.push_str(pk);
    }
    sql
}

/// Compose an UPDATE setting the non-key columns (and discriminator when
/// declared), keyed on the primary column. The primary key is the last
/// placeholder.
pub fn compose_update(
    table: &str,
    columns: &[&str],
    discriminator: Option<&Discriminator>,
    primary_column: &str,
) -> String {
    let mut assignments: Vec<String> = columns.iter().map(|c| format!("{}=?", c)).collect();
    if let Some(d) = discriminator {
        assignments.push(format!("{}=?", d.column));
    }
    format!(
        "UPDATE {} SET {} WHERE {}=?",
        table,
        assignments.join(", "),
        primary_column
    )
}

/// Compose a DELETE keyed on the primary column, with the discriminator
/// ANDed into the WHERE when declared.
pub fn compose_delete(
    table: &str,
    primary_column: &str,
    discriminator: Option<&Discriminator>,
) -> String {
    match discriminator {
        Some(d) => format!(
            "DELETE FROM {} WHERE {}=? AND {}=?",
            table, primary_column, d.column
        ),
        None => format!("DELETE FROM {} WHERE {}=?", table, primary_column),
    }
}

/// Rewrite `col=?` predicates whose positional parameter reduced to NULL into
/// `(col=? OR col IS NULL)`, so three-valued NULL semantics do not drop rows
/// the caller meant to match by absence.
///
/// Tokenization is whitespace-based and positional: the clause is split on
/// whitespace and each token's placeholders are matched to the parameter list
/// in declaration order. `col = ?` written with spaces, trailing parentheses
/// glued to the placeholder, and multi-word functions are NOT rewritten.
pub fn rewrite_nullable_where(where_clause: &str, values: &[SqlValue]) -> String {
    let mut index = 0usize;
    let mut out: Vec<String> = Vec::new();
    for token in where_clause.split_whitespace() {
        let placeholders = token.matches('?').count();
        let rewritable = placeholders == 1
            && token.ends_with("=?")
            && !token.ends_with("!=?")
            && !token.ends_with("<=?")
            && !token.ends_with(">=?")
            && !token.ends_with("<>=?");
        if rewritable && values.get(index).is_some_and(|v| v.is_null()) {
            let open = token.len() - token.trim_start_matches('(').len();
            let prefix = &token[..open];
            let body = &token[open..];
            let column = &body[..body.len() - 2];
            out.push(format!("{}({} OR {} IS NULL)", prefix, body, column));
        } else {
            out.push(token.to_string());
        }
        index += placeholders;
    }
    out.join(" ")
}

/// Renumber `?` placeholders to `$1..$n`, skipping quoted literals.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0u32;
    let mut in_literal = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}
