//! Pool lifecycle: policy-driven release, statement-cache retention, borrow
//! timeout, health checks.

mod common;

use common::{setup, setup_with_policy, timestamp, Note};
use rowhaus::prelude::*;

#[tokio::test]
async fn close_always_destroys_connection_after_operation() {
    let (rowhaus, _db) = setup_with_policy(PoolPolicy::CloseAlways).await;
    let notes = rowhaus.dao::<Note>();

    let mut note = Note::new("ephemeral", 1, timestamp("2020-01-01T00:00:00"));
    notes.insert(&mut note).await.unwrap();

    // nothing is retained between operations
    assert_eq!(rowhaus.pool().idle_count().await, 0);
    assert_eq!(rowhaus.pool().total_count().await, 0);
}

#[tokio::test]
async fn keep_open_reidles_connection_and_statement_cache() {
    let (rowhaus, _db) = setup_with_policy(PoolPolicy::KeepOpen).await;

    let pool = rowhaus.pool();
    let mut conn = pool.borrow().await.unwrap();
    let spec = SelectSpec {
        columns: "id, body".to_string(),
        table: "notes".to_string(),
        ..Default::default()
    };
    let key = || Some(StatementKey::select("notes", "scan"));

    conn.select(&spec, &ParameterList::new(), key()).await.unwrap();
    assert_eq!(conn.cached_statement_count(), 1);
    // same key, cache hit: no second entry
    conn.select(&spec, &ParameterList::new(), key()).await.unwrap();
    assert_eq!(conn.cached_statement_count(), 1);

    pool.release(conn).await;
    assert_eq!(pool.idle_count().await, 1);
    assert_eq!(pool.total_count().await, 1);

    // the re-borrowed handle still carries the cache
    let conn = pool.borrow().await.unwrap();
    assert_eq!(conn.cached_statement_count(), 1);
    assert_eq!(pool.total_count().await, 1);
    pool.release(conn).await;
}

#[tokio::test]
async fn borrow_times_out_when_pool_is_exhausted() {
    let (rowhaus, _db) = setup_with_policy(PoolPolicy::KeepOpen).await;
    let pool = rowhaus.pool();
    pool.update_settings(PoolSettings::new(0, 1, 1, 1));

    let held = pool.borrow().await.unwrap();
    let err = pool.borrow().await.unwrap_err();
    assert!(matches!(err, PoolError::Timeout { .. }));
    pool.release(held).await;

    // capacity freed, borrowing works again
    let conn = pool.borrow().await.unwrap();
    pool.release(conn).await;
}

#[tokio::test]
async fn closed_pool_refuses_borrows() {
    let (rowhaus, _db) = setup().await;
    rowhaus.close().await;
    assert!(rowhaus.pool().is_closed());
    assert!(matches!(
        rowhaus.pool().borrow().await,
        Err(PoolError::Closed)
    ));
}

#[tokio::test]
async fn health_check_and_script_execution() {
    let (rowhaus, _db) = setup().await;
    rowhaus.health_check().await.unwrap();

    rowhaus
        .run_script("CREATE TABLE extras (id INTEGER PRIMARY KEY); INSERT INTO extras (id) VALUES (1)")
        .await
        .unwrap();
}

#[tokio::test]
async fn prewarm_fills_min_idle() {
    let (rowhaus, _db) = setup_with_policy(PoolPolicy::KeepOpen).await;
    rowhaus.pool().update_settings(PoolSettings::new(2, 4, 8, 30));

    rowhaus.prewarm().await.unwrap();
    assert_eq!(rowhaus.pool().idle_count().await, 2);
    assert_eq!(rowhaus.pool().total_count().await, 2);
}

#[tokio::test]
async fn dialect_detected_from_url() {
    let (rowhaus, _db) = setup().await;
    assert_eq!(rowhaus.pool().dialect(), Dialect::SQLite);

    let bad = DatabaseConfig::from_url("oracle://somewhere/db");
    let registry = std::sync::Arc::new(ParamTypeRegistry::with_defaults());
    assert!(matches!(
        ConnectionPool::new(&bad, registry),
        Err(PoolError::UnknownDialect { .. })
    ));
}

#[tokio::test]
async fn bind_errors_name_statement_position_and_column() {
    let (rowhaus, _db) = setup().await;
    let notes = rowhaus.dao::<Note>();

    let query = Query::new()
        .filter("rank=? AND body=?")
        .param(Parameter::of(1i32))
        .param(Parameter::null_untyped());
    let err = notes.load_all_where(query).await.unwrap_err();
    match err {
        DaoError::Pool(PoolError::Bind {
            position, column, ..
        }) => {
            assert_eq!(position, 2);
            assert_eq!(column, "body");
        }
        other => panic!("expected bind error, got {:?}", other),
    }
}
