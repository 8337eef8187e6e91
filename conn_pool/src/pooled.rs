//! Pooled connection with statement cache
//!
//! A `PooledConnection` wraps a raw connection plus a cache of composed SQL
//! keyed by [`StatementKey`]. Under the keep-open policy the cache (and the
//! server-side prepared statements behind it) survives across borrows; under
//! close-always the whole handle is destroyed after each operation.

use crate::dialect::Dialect;
use crate::errors::PoolError;
use crate::raw::{ExecResult, RawConnection, SqlRow};
use crate::statement::{
    compose_delete, compose_insert, compose_select, compose_update, number_placeholders,
    rewrite_nullable_where, Discriminator, SelectSpec, StatementKey,
};
use param_bind::{ParamTypeRegistry, ParameterList, SqlValue};
use std::collections::HashMap;
use std::sync::Arc;

/// How a generated key came back from an insert.
#[derive(Debug)]
pub enum GeneratedKey {
    /// Returning-columns mode: the key is the first column of this row
    Row(SqlRow),
    /// The statement's last-insert id
    Id(i64),
    /// The statement produced no key; a defensive invariant violation for
    /// auto-generated primary keys
    Missing,
}

/// Exclusive handle to one physical connection plus its statement cache.
pub struct PooledConnection {
    raw: RawConnection,
    dialect: Dialect,
    registry: Arc<ParamTypeRegistry>,
    statements: HashMap<StatementKey, String>,
    persistent: bool,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("dialect", &self.dialect)
            .field("cached_statements", &self.statements.len())
            .field("persistent", &self.persistent)
            .finish()
    }
}

impl PooledConnection {
    pub(crate) fn new(
        raw: RawConnection,
        dialect: Dialect,
        registry: Arc<ParamTypeRegistry>,
        persistent: bool,
    ) -> Self {
        Self {
            raw,
            dialect,
            registry,
            statements: HashMap::new(),
            persistent,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of cached statement texts on this handle.
    pub fn cached_statement_count(&self) -> usize {
        self.statements.len()
    }

    /// A handle is valid iff the underlying connection still answers.
    pub(crate) async fn validate(&mut self) -> bool {
        match self.raw.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "pooled connection failed validation");
                false
            }
        }
    }

    /// Drop the statement cache, client and server side.
    pub async fn clear_statements(&mut self) -> Result<(), PoolError> {
        self.statements.clear();
        self.raw.clear_statements().await?;
        Ok(())
    }

    /// Destroy the handle and its physical connection.
    pub(crate) async fn close(self) {
        if let Err(e) = self.raw.close().await {
            tracing::warn!(error = %e, "error closing pooled connection");
        }
    }

    fn reduce(
        &self,
        params: &ParameterList,
        statement: &str,
    ) -> Result<Vec<SqlValue>, PoolError> {
        params
            .reduce_all(&self.registry)
            .map_err(|(position, source)| {
                let column = param_bind::column_at_placeholder(statement, position)
                    .unwrap_or_else(|| "unknown".to_string());
                PoolError::Bind {
                    statement: statement.to_string(),
                    position: position + 1,
                    column,
                    source,
                }
            })
    }

    fn finish_sql(&self, sql: String) -> String {
        if self.dialect.numbered_placeholders() {
            number_placeholders(&sql)
        } else {
            sql
        }
    }

    fn cached_or_build(
        &mut self,
        key: Option<StatementKey>,
        build: impl FnOnce() -> String,
    ) -> String {
        match key {
            Some(key) if self.persistent => {
                if let Some(sql) = self.statements.get(&key) {
                    tracing::debug!(?key, "statement cache hit");
                    return sql.clone();
                }
                let sql = build();
                self.statements.insert(key, sql.clone());
                sql
            }
            _ => build(),
        }
    }

    /// Compose and run a SELECT. A cache key, under keep-open, causes the
    /// built statement to be reused verbatim on later calls with that key.
    pub async fn select(
        &mut self,
        spec: &SelectSpec,
        params: &ParameterList,
        key: Option<StatementKey>,
    ) -> Result<Vec<SqlRow>, PoolError> {
        // Diagnostics for reduction errors use the unrewritten text
        let draft = compose_select(spec, self.dialect);
        let mut values = self.reduce(params, &draft)?;

        let dialect = self.dialect;
        let sql = self.cached_or_build(
            key,
            || {
                let mut rewritten = spec.clone();
                if let Some(where_clause) = rewritten.where_clause.take() {
                    rewritten.where_clause =
                        Some(rewrite_nullable_where(&where_clause, &values));
                }
                compose_select(&rewritten, dialect)
            },
        );
        let sql = self.finish_sql(sql);

        if let Some(discriminator) = &spec.discriminator {
            values.push(discriminator.bind_value());
        }

        tracing::debug!(sql = %sql, "select");
        Ok(self.raw.fetch_all(&sql, values, self.persistent).await?)
    }

    /// Insert a row and retrieve the generated key, in returning-columns mode
    /// or through the statement's last-insert id, per dialect.
    pub async fn insert(
        &mut self,
        table: &str,
        columns: &[&str],
        discriminator: Option<&Discriminator>,
        primary_column: &str,
        params: &ParameterList,
    ) -> Result<GeneratedKey, PoolError> {
        let returning = self.dialect.uses_returning().then_some(primary_column);
        let sql = self.cached_or_build(Some(StatementKey::insert(table)), || {
            compose_insert(table, columns, discriminator, returning)
        });
        let sql = self.finish_sql(sql);

        let mut values = self.reduce(params, &sql)?;
        if let Some(discriminator) = discriminator {
            values.push(discriminator.bind_value());
        }

        tracing::debug!(sql = %sql, "insert");
        if returning.is_some() {
            let row = self.raw.fetch_optional(&sql, values, self.persistent).await?;
            Ok(match row {
                Some(row) => GeneratedKey::Row(row),
                None => GeneratedKey::Missing,
            })
        } else {
            let result = self.raw.execute(&sql, values, self.persistent).await?;
            Ok(match result.last_insert_id {
                Some(id) => GeneratedKey::Id(id),
                None => GeneratedKey::Missing,
            })
        }
    }

    /// Update a row by primary key. The key is the last bound parameter.
    pub async fn update(
        &mut self,
        table: &str,
        columns: &[&str],
        discriminator: Option<&Discriminator>,
        primary_column: &str,
        params: &ParameterList,
        primary_value: SqlValue,
    ) -> Result<u64, PoolError> {
        let sql = self.cached_or_build(Some(StatementKey::update(table)), || {
            compose_update(table, columns, discriminator, primary_column)
        });
        let sql = self.finish_sql(sql);

        let mut values = self.reduce(params, &sql)?;
        if let Some(discriminator) = discriminator {
            values.push(discriminator.bind_value());
        }
        values.push(primary_value);

        tracing::debug!(sql = %sql, "update");
        let result = self.raw.execute(&sql, values, self.persistent).await?;
        Ok(result.rows_affected)
    }

    /// Delete a row by primary key (+ discriminator for the compound WHERE).
    pub async fn delete(
        &mut self,
        table: &str,
        primary_column: &str,
        discriminator: Option<&Discriminator>,
        primary_value: SqlValue,
    ) -> Result<u64, PoolError> {
        let sql = self.cached_or_build(Some(StatementKey::delete(table)), || {
            compose_delete(table, primary_column, discriminator)
        });
        let sql = self.finish_sql(sql);

        let mut values = vec![primary_value];
        if let Some(discriminator) = discriminator {
            values.push(discriminator.bind_value());
        }

        tracing::debug!(sql = %sql, "delete");
        let result = self.raw.execute(&sql, values, self.persistent).await?;
        Ok(result.rows_affected)
    }

    /// Run a caller-composed statement written with `?` placeholders, cached
    /// under the given key when one is supplied.
    pub async fn execute_statement(
        &mut self,
        key: Option<StatementKey>,
        sql: &str,
        params: &ParameterList,
    ) -> Result<ExecResult, PoolError> {
        let owned = sql.to_string();
        let sql = self.cached_or_build(key, || owned);
        let sql = self.finish_sql(sql);
        let values = self.reduce(params, &sql)?;

        tracing::debug!(sql = %sql, "execute");
        Ok(self.raw.execute(&sql, values, self.persistent).await?)
    }

    /// Run a `;`-separated DDL script, statement by statement.
    pub async fn run_script(&mut self, script: &str) -> Result<(), PoolError> {
        for statement in script.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            tracing::debug!(sql = %statement, "script statement");
            self.raw.execute_raw(statement).await?;
        }
        Ok(())
    }
}
