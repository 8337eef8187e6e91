//! Cross-table relationship loaders
//!
//! Many-to-many and ternary relationships live in a join table with
//! foreign-key columns and no surrogate key. The loaders compose the same
//! borrow/execute/map pattern as the entity DAOs, against the join table.

use crate::binding::{LoadContext, TableBinding};
use crate::dao::Dao;
use crate::entity::KeyRef;
use crate::errors::DaoError;
use crate::loaded::LoadedSet;
use crate::query::Query;
use crate::row_reader::RowReader;
use conn_pool::{
    compose_insert, ConnectionPool, SelectSpec, SqlRow, StatementKey, StatementOp,
};
use param_bind::{Parameter, ParameterList};

/// A join-table row for a 2-way relation. References may be absent when not
/// resolved. Equality is structural.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation2<A, B> {
    pub a: Option<A>,
    pub b: Option<B>,
}

/// A join-table row for a ternary relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation3<A, B, C> {
    pub a: Option<A>,
    pub b: Option<B>,
    pub c: Option<C>,
}

fn endpoint_key<E: TableBinding>(entity: &E) -> Result<param_bind::SqlValue, DaoError> {
    entity
        .key()
        .map(|key| crate::entity::PrimaryKey::to_value(key))
        .ok_or_else(|| {
            DaoError::IllegalState(format!(
                "relation endpoint {} has no primary key",
                E::table()
            ))
        })
}

/// 2-way cross-table DAO over `table(a_column, b_column)`.
pub struct CrossDao<A: TableBinding, B: TableBinding> {
    table: String,
    a_column: String,
    b_column: String,
    a_dao: Dao<A>,
    b_dao: Dao<B>,
    pool: ConnectionPool,
}

impl<A: TableBinding, B: TableBinding> std::fmt::Debug for CrossDao<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossDao")
            .field("table", &self.table)
            .field("a", &A::table())
            .field("b", &B::table())
            .finish()
    }
}

impl<A: TableBinding, B: TableBinding> CrossDao<A, B> {
    pub fn new(pool: ConnectionPool, table: &str, a_column: &str, b_column: &str) -> Self {
        Self {
            table: table.to_string(),
            a_column: a_column.to_string(),
            b_column: b_column.to_string(),
            a_dao: Dao::with_pool(pool.clone()),
            b_dao: Dao::with_pool(pool.clone()),
            pool,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn join_for<E: TableBinding>(&self, entity_column: &str) -> String {
        format!(
            "JOIN {} ON {}.{}={}.{}",
            self.table,
            E::table(),
            E::primary_column(),
            self.table,
            entity_column
        )
    }

    fn relation_key(&self, op: StatementOp) -> StatementKey {
        StatementKey {
            op,
            table: self.table.clone(),
            shape: Some("relation".to_string()),
        }
    }

    /// All A whose join-table row references the given B.
    pub async fn load_a_from_b(&self, b: &B) -> Result<Vec<A>, DaoError> {
        self.load_a_from_b_with(b, &LoadedSet::new()).await
    }

    pub async fn load_a_from_b_with(&self, b: &B, loaded: &LoadedSet) -> Result<Vec<A>, DaoError> {
        let key = endpoint_key(b)?;
        let query = Query::new()
            .join(&self.join_for::<A>(&self.a_column))
            .filter(&format!("{}.{}=?", self.table, self.b_column))
            .param(Parameter::value(key));
        self.a_dao.load_all_where_with(query, loaded).await
    }

    /// All B whose join-table row references the given A.
    pub async fn load_b_from_a(&self, a: &A) -> Result<Vec<B>, DaoError> {
        self.load_b_from_a_with(a, &LoadedSet::new()).await
    }

    pub async fn load_b_from_a_with(&self, a: &A, loaded: &LoadedSet) -> Result<Vec<B>, DaoError> {
        let key = endpoint_key(a)?;
        let query = Query::new()
            .join(&self.join_for::<B>(&self.b_column))
            .filter(&format!("{}.{}=?", self.table, self.a_column))
            .param(Parameter::value(key));
        self.b_dao.load_all_where_with(query, loaded).await
    }

    /// Insert a join-table row for the tuple. Detached endpoints bind as
    /// typed NULLs.
    pub async fn create_relation(&self, a: &A, b: &B) -> Result<(), DaoError> {
        let sql = compose_insert(&self.table, &[&self.a_column, &self.b_column], None, None);
        let params = ParameterList::new()
            .with(Parameter::convertible(KeyRef::of(a)))
            .with(Parameter::convertible(KeyRef::of(b)));
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .execute_statement(Some(self.relation_key(StatementOp::Insert)), &sql, &params)
            .await;
        match result {
            Ok(_) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    /// Delete the join-table row for the tuple.
    pub async fn delete_relation(&self, a: &A, b: &B) -> Result<(), DaoError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}=? AND {}=?",
            self.table, self.a_column, self.b_column
        );
        let params = ParameterList::new()
            .with(Parameter::convertible(KeyRef::of(a)))
            .with(Parameter::convertible(KeyRef::of(b)));
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .execute_statement(Some(self.relation_key(StatementOp::Delete)), &sql, &params)
            .await;
        match result {
            Ok(_) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    async fn fetch_relation_rows(&self, query: &Query) -> Result<Vec<SqlRow>, DaoError> {
        let spec = SelectSpec {
            columns: format!("{}, {}", self.a_column, self.b_column),
            table: self.table.clone(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: query.order.clone(),
            limit: query.limit,
            offset: query.offset,
            discriminator: None,
        };
        let key = query
            .cache_key
            .as_deref()
            .map(|cache_key| StatementKey::select(self.table.clone(), cache_key));
        let mut conn = self.pool.borrow().await?;
        let result = conn.select(&spec, &query.params, key).await;
        match result {
            Ok(rows) => {
                self.pool.release(conn).await;
                Ok(rows)
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    /// Materialize one join-table row: each referenced entity comes from the
    /// loaded set or a fresh load against its own DAO. N+1 behavior here is
    /// the accepted tradeoff over eager joins.
    async fn relation_from_row(
        &self,
        row: &SqlRow,
        loaded: &LoadedSet,
    ) -> Result<Relation2<A, B>, DaoError> {
        let mut reader = RowReader::new(row);
        let a_key = reader.next_primary::<A::Key>()?;
        let b_key = reader.next_primary::<B::Key>()?;
        let ctx = LoadContext::new(&self.pool, loaded);
        Ok(Relation2 {
            a: ctx.resolve::<A>(a_key).await?,
            b: ctx.resolve::<B>(b_key).await?,
        })
    }

    /// Every join-table row, entities resolved.
    pub async fn load_relations(&self) -> Result<Vec<Relation2<A, B>>, DaoError> {
        self.load_relations_where(Query::new(), &LoadedSet::new())
            .await
    }

    pub async fn load_relations_where(
        &self,
        query: Query,
        loaded: &LoadedSet,
    ) -> Result<Vec<Relation2<A, B>>, DaoError> {
        let rows = self.fetch_relation_rows(&query).await?;
        let mut relations = Vec::with_capacity(rows.len());
        for row in &rows {
            relations.push(self.relation_from_row(row, loaded).await?);
        }
        Ok(relations)
    }

    /// Count join-table rows matching the query's join/where.
    pub async fn count_relations(&self, query: Query) -> Result<i64, DaoError> {
        let spec = SelectSpec {
            columns: "COUNT(*) AS total".to_string(),
            table: self.table.clone(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: None,
            limit: None,
            offset: None,
            discriminator: None,
        };
        let key = query
            .cache_key
            .as_deref()
            .map(|cache_key| StatementKey::count(self.table.clone(), cache_key));
        let mut conn = self.pool.borrow().await?;
        let result = conn.select(&spec, &query.params, key).await;
        let rows = match result {
            Ok(rows) => {
                self.pool.release(conn).await;
                rows
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                return Err(e.into());
            }
        };
        let row = rows
            .first()
            .ok_or_else(|| DaoError::NotFound(format!("count over {}", self.table)))?;
        Ok(row.read::<i64>(0)?.unwrap_or(0))
    }
}

/// 3-way cross-table DAO over `table(a_column, b_column, c_column)`.
pub struct CrossDao3<A: TableBinding, B: TableBinding, C: TableBinding> {
    table: String,
    a_column: String,
    b_column: String,
    c_column: String,
    a_dao: Dao<A>,
    b_dao: Dao<B>,
    c_dao: Dao<C>,
    pool: ConnectionPool,
}

impl<A: TableBinding, B: TableBinding, C: TableBinding> std::fmt::Debug for CrossDao3<A, B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossDao3")
            .field("table", &self.table)
            .field("a", &A::table())
            .field("b", &B::table())
            .field("c", &C::table())
            .finish()
    }
}

impl<A: TableBinding, B: TableBinding, C: TableBinding> CrossDao3<A, B, C> {
    pub fn new(
        pool: ConnectionPool,
        table: &str,
        a_column: &str,
        b_column: &str,
        c_column: &str,
    ) -> Self {
        Self {
            table: table.to_string(),
            a_column: a_column.to_string(),
            b_column: b_column.to_string(),
            c_column: c_column.to_string(),
            a_dao: Dao::with_pool(pool.clone()),
            b_dao: Dao::with_pool(pool.clone()),
            c_dao: Dao::with_pool(pool.clone()),
            pool,
        }
    }

    fn join_for<E: TableBinding>(&self, entity_column: &str) -> String {
        format!(
            "JOIN {} ON {}.{}={}.{}",
            self.table,
            E::table(),
            E::primary_column(),
            self.table,
            entity_column
        )
    }

    fn pair_filter(&self, first_column: &str, second_column: &str) -> String {
        format!(
            "{}.{}=? AND {}.{}=?",
            self.table, first_column, self.table, second_column
        )
    }

    /// All A referenced together with the given B and C.
    pub async fn load_a_from_b_and_c(&self, b: &B, c: &C) -> Result<Vec<A>, DaoError> {
        let query = Query::new()
            .join(&self.join_for::<A>(&self.a_column))
            .filter(&self.pair_filter(&self.b_column, &self.c_column))
            .param(Parameter::value(endpoint_key(b)?))
            .param(Parameter::value(endpoint_key(c)?));
        self.a_dao.load_all_where(query).await
    }

    /// All B referenced together with the given A and C.
    pub async fn load_b_from_a_and_c(&self, a: &A, c: &C) -> Result<Vec<B>, DaoError> {
        let query = Query::new()
            .join(&self.join_for::<B>(&self.b_column))
            .filter(&self.pair_filter(&self.a_column, &self.c_column))
            .param(Parameter::value(endpoint_key(a)?))
            .param(Parameter::value(endpoint_key(c)?));
        self.b_dao.load_all_where(query).await
    }

    /// All C referenced together with the given A and B.
    pub async fn load_c_from_a_and_b(&self, a: &A, b: &B) -> Result<Vec<C>, DaoError> {
        let query = Query::new()
            .join(&self.join_for::<C>(&self.c_column))
            .filter(&self.pair_filter(&self.a_column, &self.b_column))
            .param(Parameter::value(endpoint_key(a)?))
            .param(Parameter::value(endpoint_key(b)?));
        self.c_dao.load_all_where(query).await
    }

    /// Insert a join-table row for the triple.
    pub async fn create_relation(&self, a: &A, b: &B, c: &C) -> Result<(), DaoError> {
        let sql = compose_insert(
            &self.table,
            &[&self.a_column, &self.b_column, &self.c_column],
            None,
            None,
        );
        let params = ParameterList::new()
            .with(Parameter::convertible(KeyRef::of(a)))
            .with(Parameter::convertible(KeyRef::of(b)))
            .with(Parameter::convertible(KeyRef::of(c)));
        let key = StatementKey {
            op: StatementOp::Insert,
            table: self.table.clone(),
            shape: Some("relation".to_string()),
        };
        let mut conn = self.pool.borrow().await?;
        let result = conn.execute_statement(Some(key), &sql, &params).await;
        match result {
            Ok(_) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    /// Delete the join-table row for the triple.
    pub async fn delete_relation(&self, a: &A, b: &B, c: &C) -> Result<(), DaoError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}=? AND {}=? AND {}=?",
            self.table, self.a_column, self.b_column, self.c_column
        );
        let params = ParameterList::new()
            .with(Parameter::convertible(KeyRef::of(a)))
            .with(Parameter::convertible(KeyRef::of(b)))
            .with(Parameter::convertible(KeyRef::of(c)));
        let key = StatementKey {
            op: StatementOp::Delete,
            table: self.table.clone(),
            shape: Some("relation".to_string()),
        };
        let mut conn = self.pool.borrow().await?;
        let result = conn.execute_statement(Some(key), &sql, &params).await;
        match result {
            Ok(_) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    /// Every join-table row, entities resolved through the loaded set or
    /// their own DAOs.
    pub async fn load_relations(&self) -> Result<Vec<Relation3<A, B, C>>, DaoError> {
        self.load_relations_where(Query::new(), &LoadedSet::new())
            .await
    }

    pub async fn load_relations_where(
        &self,
        query: Query,
        loaded: &LoadedSet,
    ) -> Result<Vec<Relation3<A, B, C>>, DaoError> {
        let spec = SelectSpec {
            columns: format!("{}, {}, {}", self.a_column, self.b_column, self.c_column),
            table: self.table.clone(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: query.order.clone(),
            limit: query.limit,
            offset: query.offset,
            discriminator: None,
        };
        let mut conn = self.pool.borrow().await?;
        let result = conn.select(&spec, &query.params, None).await;
        let rows = match result {
            Ok(rows) => {
                self.pool.release(conn).await;
                rows
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                return Err(e.into());
            }
        };

        let ctx = LoadContext::new(&self.pool, loaded);
        let mut relations = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut reader = RowReader::new(row);
            let a_key = reader.next_primary::<A::Key>()?;
            let b_key = reader.next_primary::<B::Key>()?;
            let c_key = reader.next_primary::<C::Key>()?;
            relations.push(Relation3 {
                a: ctx.resolve::<A>(a_key).await?,
                b: ctx.resolve::<B>(b_key).await?,
                c: ctx.resolve::<C>(c_key).await?,
            });
        }
        Ok(relations)
    }

    /// Count join-table rows matching the query's join/where.
    pub async fn count_relations(&self, query: Query) -> Result<i64, DaoError> {
        let spec = SelectSpec {
            columns: "COUNT(*) AS total".to_string(),
            table: self.table.clone(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: None,
            limit: None,
            offset: None,
            discriminator: None,
        };
        let mut conn = self.pool.borrow().await?;
        let result = conn.select(&spec, &query.params, None).await;
        let rows = match result {
            Ok(rows) => {
                self.pool.release(conn).await;
                rows
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                return Err(e.into());
            }
        };
        let row = rows
            .first()
            .ok_or_else(|| DaoError::NotFound(format!("count over {}", self.table)))?;
        Ok(row.read::<i64>(0)?.unwrap_or(0))
    }
}
