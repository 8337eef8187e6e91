//! The connection pool
//!
//! Borrow/release/invalidate over a set of pooled connections. Settings are
//! re-read on every borrow and release, so they can be adjusted on a live
//! pool. The release behavior follows the pool's policy: close-always
//! destroys the handle after each operation, keep-open re-idles it.

use crate::dialect::Dialect;
use crate::errors::PoolError;
use crate::pooled::PooledConnection;
use crate::raw::RawConnection;
use config::{DatabaseConfig, PoolPolicy, PoolSettings};
use param_bind::ParamTypeRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::Instant;

struct PoolState {
    idle: Vec<PooledConnection>,
    total: u32,
}

struct PoolInner {
    url: String,
    dialect: Dialect,
    registry: Arc<ParamTypeRegistry>,
    policy: PoolPolicy,
    settings: Mutex<PoolSettings>,
    state: tokio::sync::Mutex<PoolState>,
    freed: Notify,
    closed: AtomicBool,
}

/// Cloneable handle to one pool of physical connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("dialect", &self.inner.dialect)
            .field("policy", &self.inner.policy)
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl ConnectionPool {
    /// Create a pool for the configured database. Fails when the URL scheme
    /// matches no known dialect. No connection is opened yet.
    pub fn new(
        config: &DatabaseConfig,
        registry: Arc<ParamTypeRegistry>,
    ) -> Result<Self, PoolError> {
        let dialect = Dialect::from_url(&config.url);
        if dialect == Dialect::Unknown {
            return Err(PoolError::UnknownDialect {
                url: config.masked_url(),
            });
        }
        tracing::info!(
            dialect = dialect.display_name(),
            policy = ?config.policy,
            "creating connection pool"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                url: config.url.clone(),
                dialect,
                registry,
                policy: config.policy,
                settings: Mutex::new(config.pool),
                state: tokio::sync::Mutex::new(PoolState {
                    idle: Vec::new(),
                    total: 0,
                }),
                freed: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    pub fn policy(&self) -> PoolPolicy {
        self.inner.policy
    }

    pub fn registry(&self) -> Arc<ParamTypeRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// Current settings; read lazily on each borrow/release.
    pub fn settings(&self) -> PoolSettings {
        *self.inner.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the settings applied to subsequent borrows and releases.
    pub fn update_settings(&self, settings: PoolSettings) {
        *self
            .inner
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = settings;
    }

    /// Open connections until `min_idle` handles sit idle.
    pub async fn prewarm(&self) -> Result<(), PoolError> {
        let settings = self.settings();
        loop {
            let needed = {
                let state = self.inner.state.lock().await;
                state.idle.len() < settings.min_idle as usize
                    && state.total < settings.max_total
            };
            if !needed {
                return Ok(());
            }
            let conn = self.open_connection().await?;
            let mut state = self.inner.state.lock().await;
            state.total += 1;
            state.idle.push(conn);
        }
    }

    async fn open_connection(&self) -> Result<PooledConnection, PoolError> {
        let raw = RawConnection::connect(self.inner.dialect, &self.inner.url).await?;
        Ok(PooledConnection::new(
            raw,
            self.inner.dialect,
            Arc::clone(&self.inner.registry),
            self.inner.policy == PoolPolicy::KeepOpen,
        ))
    }

    /// Borrow an exclusive connection handle.
    ///
    /// Reuses a validated idle handle when one exists, opens a new physical
    /// connection while under `max_total`, and otherwise waits up to
    /// `wait_timeout_seconds` for a handle to be freed. Idle handles that
    /// fail validation are evicted and the borrow retries.
    pub async fn borrow(&self) -> Result<PooledConnection, PoolError> {
        let settings = self.settings();
        let started = Instant::now();
        let deadline =
            started + std::time::Duration::from_secs(settings.wait_timeout_seconds);

        enum Claim {
            Idle(PooledConnection),
            Capacity,
            Full,
        }

        loop {
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(PoolError::Closed);
            }

            let claim = {
                let mut state = self.inner.state.lock().await;
                if let Some(conn) = state.idle.pop() {
                    Claim::Idle(conn)
                } else if state.total < settings.max_total {
                    state.total += 1;
                    Claim::Capacity
                } else {
                    Claim::Full
                }
            };

            match claim {
                Claim::Idle(mut conn) => {
                    if conn.validate().await {
                        return Ok(conn);
                    }
                    tracing::debug!("evicting invalid idle connection");
                    self.discard(conn).await;
                }
                Claim::Capacity => match self.open_connection().await {
                    Ok(conn) => return Ok(conn),
                    Err(e) => {
                        let mut state = self.inner.state.lock().await;
                        state.total -= 1;
                        drop(state);
                        self.inner.freed.notify_one();
                        return Err(e);
                    }
                },
                Claim::Full => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PoolError::Timeout {
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    let wait = tokio::time::timeout_at(deadline, self.inner.freed.notified());
                    if wait.await.is_err() {
                        return Err(PoolError::Timeout {
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                }
            }
        }
    }

    /// Hand a borrowed handle back, honoring the pool policy: close-always
    /// destroys it, keep-open re-idles it up to `max_idle`.
    pub async fn release(&self, conn: PooledConnection) {
        match self.inner.policy {
            PoolPolicy::CloseAlways => self.invalidate(conn).await,
            PoolPolicy::KeepOpen => {
                let settings = self.settings();
                let closed = self.inner.closed.load(Ordering::Acquire);
                let rejected = {
                    let mut state = self.inner.state.lock().await;
                    if !closed && (state.idle.len() as u32) < settings.max_idle {
                        state.idle.push(conn);
                        None
                    } else {
                        // over max_idle or pool closed
                        Some(conn)
                    }
                };
                match rejected {
                    None => self.inner.freed.notify_one(),
                    Some(conn) => self.discard(conn).await,
                }
            }
        }
    }

    /// Permanently destroy a borrowed handle, its statements included. Used
    /// after errors that leave the connection in a questionable state and by
    /// the close-always policy.
    pub async fn invalidate(&self, conn: PooledConnection) {
        self.discard(conn).await;
    }

    async fn discard(&self, conn: PooledConnection) {
        {
            let mut state = self.inner.state.lock().await;
            state.total -= 1;
        }
        conn.close().await;
        self.inner.freed.notify_one();
    }

    /// Close the pool: no further borrows, all idle handles destroyed.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let drained = {
            let mut state = self.inner.state.lock().await;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.total -= drained.len() as u32;
            drained
        };
        for conn in drained {
            conn.close().await;
        }
        self.inner.freed.notify_waiters();
        tracing::info!("connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Idle handle count, for diagnostics and tests.
    pub async fn idle_count(&self) -> usize {
        self.inner.state.lock().await.idle.len()
    }

    /// Total physical connections, borrowed ones included.
    pub async fn total_count(&self) -> u32 {
        self.inner.state.lock().await.total
    }
}
