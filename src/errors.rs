use config::ConfigError;
use conn_pool::PoolError;
use dao_core::DaoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowHausError {
    #[error(transparent)]
    Dao(#[from] DaoError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("DAO already registered: {0}")]
    DaoAlreadyRegistered(String),

    #[error("DAO not found: {0}")]
    DaoNotFound(String),
}
