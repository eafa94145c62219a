//! Transactional sessions.
//!
//! A [`Session`] is the unit of connectivity a unit of work owns: one lazily
//! begun Postgres transaction plus the pool it is drawn from. The first store
//! operation begins the transaction; `commit`/`rollback` end it and the next
//! operation begins a fresh one on the same session. Dropping a session with
//! a live transaction rolls it back (sqlx rolls back un-committed
//! transactions on drop).
//!
//! Overlapping calls on one session are serialized by an async mutex; callers
//! are still expected to use a session sequentially within its scope.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use stratum_common::FilterValue;

use crate::{Error, Result};

/// Bind ordered [`FilterValue`] parameters onto a sqlx query.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params {
            query = match value {
                FilterValue::Null => query.bind(Option::<String>::None),
                FilterValue::Bool(v) => query.bind(*v),
                FilterValue::Int(v) => query.bind(*v),
                FilterValue::Float(v) => query.bind(*v),
                FilterValue::Text(v) => query.bind(v.clone()),
                FilterValue::Uuid(v) => query.bind(*v),
                FilterValue::Timestamp(v) => query.bind(*v),
            };
        }
        query
    }};
}

/// Produces independent sessions from a shared pool, one per unit of work.
#[derive(Clone, Debug)]
pub struct SessionFactory {
    pool: PgPool,
}

impl SessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A fresh session. No connection is taken until the first operation.
    pub fn session(&self) -> Session {
        Session {
            inner: Arc::new(SessionInner {
                pool: self.pool.clone(),
                tx: Mutex::new(None),
            }),
        }
    }
}

struct SessionInner {
    pool: PgPool,
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

/// One transactional session. Cheap to clone; clones share the same
/// underlying transaction, which is how repositories bound to one unit of
/// work observe each other's uncommitted writes.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

async fn begin_if_needed<'g>(
    pool: &PgPool,
    slot: &'g mut Option<Transaction<'static, Postgres>>,
) -> Result<&'g mut Transaction<'static, Postgres>> {
    let tx = match slot.take() {
        Some(tx) => tx,
        None => {
            debug!("Beginning new transaction");
            pool.begin().await.map_err(Error::Database)?
        }
    };
    Ok(slot.insert(tx))
}

impl Session {
    /// Fetch all rows of a built query, hydrated as `T`.
    pub async fn fetch_all<T>(&self, sql: &str, params: &[FilterValue]) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut guard = self.inner.tx.lock().await;
        let tx = begin_if_needed(&self.inner.pool, &mut guard).await?;
        bind_params!(sqlx::query_as::<Postgres, T>(sql), params)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Fetch at most one row, hydrated as `T`.
    pub async fn fetch_optional<T>(&self, sql: &str, params: &[FilterValue]) -> Result<Option<T>>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut guard = self.inner.tx.lock().await;
        let tx = begin_if_needed(&self.inner.pool, &mut guard).await?;
        bind_params!(sqlx::query_as::<Postgres, T>(sql), params)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Fetch exactly one row, hydrated as `T`.
    pub async fn fetch_one<T>(&self, sql: &str, params: &[FilterValue]) -> Result<T>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut guard = self.inner.tx.lock().await;
        let tx = begin_if_needed(&self.inner.pool, &mut guard).await?;
        bind_params!(sqlx::query_as::<Postgres, T>(sql), params)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Fetch a single scalar, e.g. a COUNT.
    pub async fn fetch_scalar(&self, sql: &str, params: &[FilterValue]) -> Result<i64> {
        let mut guard = self.inner.tx.lock().await;
        let tx = begin_if_needed(&self.inner.pool, &mut guard).await?;
        bind_params!(sqlx::query_scalar::<Postgres, i64>(sql), params)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    /// Execute a statement, returning the affected row count.
    pub async fn execute(&self, sql: &str, params: &[FilterValue]) -> Result<u64> {
        let mut guard = self.inner.tx.lock().await;
        let tx = begin_if_needed(&self.inner.pool, &mut guard).await?;
        let result = bind_params!(sqlx::query(sql), params)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// Commit the open transaction. A session with nothing pending is a
    /// no-op, matching commit-on-clean-session semantics.
    pub async fn commit(&self) -> Result<()> {
        let mut guard = self.inner.tx.lock().await;
        if let Some(tx) = guard.take() {
            debug!("Committing transaction");
            tx.commit().await.map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Roll back the open transaction, if any.
    pub async fn rollback(&self) -> Result<()> {
        let mut guard = self.inner.tx.lock().await;
        if let Some(tx) = guard.take() {
            debug!("Rolling back transaction");
            tx.rollback().await.map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Release the session. Anything still open is rolled back, never
    /// committed.
    pub async fn close(&self) {
        let mut guard = self.inner.tx.lock().await;
        if let Some(tx) = guard.take() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Failed to roll back transaction on close");
            }
        }
    }

    /// Whether a transaction is currently open.
    pub async fn in_transaction(&self) -> bool {
        self.inner.tx.lock().await.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
