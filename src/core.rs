//! Core RowHaus functionality
//!
//! This module contains the main RowHaus struct and its implementation,
//! providing centralized coordination for the connection pool, the parameter
//! registry and registered DAO instances.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::RowHausError;
use config::DatabaseConfig;
use conn_pool::ConnectionPool;
use dao_core::{Dao, TableBinding};
use param_bind::{ParamTypeRegistry, ParameterList};

/// Main RowHaus coordinator that manages the shared connection pool, the
/// parameter-type registry and named DAO instances.
pub struct RowHaus {
    pool: ConnectionPool,
    registry: Arc<ParamTypeRegistry>,
    daos: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl RowHaus {
    /// Create a new RowHaus with the default parameter adapters.
    pub fn new(config: DatabaseConfig) -> Result<Self, RowHausError> {
        Self::with_registry(config, ParamTypeRegistry::with_defaults())
    }

    /// Create a new RowHaus with an explicitly constructed adapter registry.
    pub fn with_registry(
        config: DatabaseConfig,
        registry: ParamTypeRegistry,
    ) -> Result<Self, RowHausError> {
        config.validate()?;
        let registry = Arc::new(registry);
        let pool = ConnectionPool::new(&config, Arc::clone(&registry))?;
        Ok(Self {
            pool,
            registry,
            daos: HashMap::new(),
        })
    }

    /// Get the shared connection pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Get the parameter-type registry.
    pub fn registry(&self) -> Arc<ParamTypeRegistry> {
        Arc::clone(&self.registry)
    }

    /// Open connections up to the pool's `min_idle`.
    pub async fn prewarm(&self) -> Result<(), RowHausError> {
        self.pool.prewarm().await?;
        Ok(())
    }

    /// A DAO for the entity type, sharing this coordinator's pool.
    pub fn dao<E: TableBinding>(&self) -> Dao<E> {
        Dao::with_pool(self.pool.clone())
    }

    /// Register a DAO instance under a given name.
    pub fn register_dao<T>(&mut self, name: String, dao: T) -> Result<(), RowHausError>
    where
        T: Any + Send + Sync,
    {
        if self.daos.contains_key(&name) {
            return Err(RowHausError::DaoAlreadyRegistered(name));
        }
        self.daos.insert(name, Box::new(dao));
        Ok(())
    }

    /// Get a registered DAO by name.
    pub fn get_dao<T>(&self, name: &str) -> Result<&T, RowHausError>
    where
        T: Any + Send + Sync,
    {
        self.daos
            .get(name)
            .and_then(|dao| dao.downcast_ref::<T>())
            .ok_or_else(|| RowHausError::DaoNotFound(name.to_string()))
    }

    /// List all registered DAO names.
    pub fn list_daos(&self) -> Vec<&String> {
        self.daos.keys().collect()
    }

    /// Remove a registered DAO by name.
    pub fn unregister_dao(&mut self, name: &str) -> Result<(), RowHausError> {
        self.daos
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RowHausError::DaoNotFound(name.to_string()))
    }

    /// Check database connection health.
    pub async fn health_check(&self) -> Result<(), RowHausError> {
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .execute_statement(None, "SELECT 1", &ParameterList::new())
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

    /// Run a `;`-separated DDL script, for seeding schemas. Schema
    /// generation itself is out of scope; the script is the caller's.
    pub async fn run_script(&self, script: &str) -> Result<(), RowHausError> {
        let mut conn = self.pool.borrow().await?;
        let result = conn.run_script(script).await;
        match result {
            Ok(()) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    /// Close the shared pool; every registered DAO is unusable afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
