//! Storage Collaborator
//!
//! Thin parameterized-query executor over an sqlx `Any` pool. Every value
//! crosses this boundary as a bound [`SqlParam`]; SQL text is always a
//! fixed statement owned by the caller. Each call is bounded by the
//! configured storage timeout, and connections go back to the pool on
//! every exit path.

use crate::config::AuthConfig;

use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Arguments, FromRow, Transaction};
use std::future::Future;
use std::time::Duration;

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    /// True when the backend rejected a write because of a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StorageError::Query(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

/// A single bound query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&[u8]> for SqlParam {
    fn from(v: &[u8]) -> Self {
        SqlParam::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(v: Vec<u8>) -> Self {
        SqlParam::Bytes(v)
    }
}

fn arguments<'q>(params: &[SqlParam]) -> AnyArguments<'q> {
    let mut args = AnyArguments::default();
    for param in params {
        match param {
            SqlParam::Int(v) => args.add(*v),
            SqlParam::Text(v) => args.add(v.clone()),
            SqlParam::Bytes(v) => args.add(v.clone()),
        }
    }
    args
}

async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StorageError::from),
        Err(_) => Err(StorageError::Timeout(limit)),
    }
}

/// Parameterized-query executor shared by all components
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    timeout: Duration,
}

impl Database {
    /// Connect using the configured URL, connection limit and timeout
    pub async fn connect(config: &AuthConfig) -> Result<Self, StorageError> {
        Self::connect_with(
            &config.database_url,
            config.max_connections,
            config.storage_timeout(),
        )
        .await
    }

    /// Connect with explicit settings
    pub async fn connect_with(
        url: &str,
        max_connections: u32,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect(url)
            .await?;

        Ok(Self::from_pool(pool, timeout))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Run a query and collect every row
    pub async fn query<T>(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<T>, StorageError>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        bounded(
            self.timeout,
            sqlx::query_as_with::<Any, T, _>(sql, arguments(params)).fetch_all(&self.pool),
        )
        .await
    }

    /// Run a query expected to return at most one row
    pub async fn query_single<T>(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<T>, StorageError>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        bounded(
            self.timeout,
            sqlx::query_as_with::<Any, T, _>(sql, arguments(params)).fetch_optional(&self.pool),
        )
        .await
    }

    /// Run a statement and return the number of affected rows
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StorageError> {
        let result = bounded(
            self.timeout,
            sqlx::query_with(sql, arguments(params)).execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    /// Open a unit of work; it rolls back unless committed
    pub async fn begin(&self) -> Result<UnitOfWork, StorageError> {
        let tx = bounded(self.timeout, self.pool.begin()).await?;

        Ok(UnitOfWork {
            tx,
            timeout: self.timeout,
        })
    }
}

/// A storage transaction.
///
/// Dropping it without calling [`UnitOfWork::commit`] rolls back every
/// statement executed through it.
pub struct UnitOfWork {
    tx: Transaction<'static, Any>,
    timeout: Duration,
}

impl UnitOfWork {
    pub async fn query_single<T>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<T>, StorageError>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        bounded(
            self.timeout,
            sqlx::query_as_with::<Any, T, _>(sql, arguments(params)).fetch_optional(&mut *self.tx),
        )
        .await
    }

    pub async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, StorageError> {
        let result = bounded(
            self.timeout,
            sqlx::query_with(sql, arguments(params)).execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn commit(self) -> Result<(), StorageError> {
        bounded(self.timeout, self.tx.commit()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_bound_text_is_never_interpreted_as_sql() {
        let (_dir, db) = testing::database().await;

        let hostile = "x'); DROP TABLE users; --";
        let rows: Vec<(i64,)> = assert_ok!(
            db.query("SELECT user_id FROM users WHERE email = $1", &[hostile.into()])
                .await
        );
        assert!(rows.is_empty());

        let count: Option<(i64,)> = assert_ok!(
            db.query_single("SELECT COUNT(*) FROM users", &[]).await
        );
        assert_eq!(count, Some((0,)));
    }

    #[tokio::test]
    async fn test_unit_of_work_rolls_back_on_drop() {
        let (_dir, db) = testing::database().await;

        {
            let mut uow = assert_ok!(db.begin().await);
            let inserted = assert_ok!(
                uow.execute(
                    "INSERT INTO auth_credentials (email, password_hash, password_salt) VALUES ($1, $2, $3)",
                    &["a@x.com".into(), vec![1u8; 32].into(), vec![2u8; 16].into()],
                )
                .await
            );
            assert_eq!(inserted, 1);
        }

        let rows: Vec<(String,)> = assert_ok!(
            db.query("SELECT email FROM auth_credentials", &[]).await
        );
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unit_of_work_commit_persists() {
        let (_dir, db) = testing::database().await;

        let mut uow = assert_ok!(db.begin().await);
        assert_ok!(
            uow.execute(
                "INSERT INTO auth_credentials (email, password_hash, password_salt) VALUES ($1, $2, $3)",
                &["a@x.com".into(), vec![1u8; 32].into(), vec![2u8; 16].into()],
            )
            .await
        );
        assert_ok!(uow.commit().await);

        let row: Option<(String, Vec<u8>)> = assert_ok!(
            db.query_single(
                "SELECT email, password_salt FROM auth_credentials WHERE email = $1",
                &["a@x.com".into()],
            )
            .await
        );
        assert_eq!(row, Some(("a@x.com".to_string(), vec![2u8; 16])));
    }

    #[tokio::test]
    async fn test_unique_violation_is_detected() {
        let (_dir, db) = testing::database().await;
        let insert = "INSERT INTO auth_credentials (email, password_hash, password_salt) VALUES ($1, $2, $3)";
        let params: Vec<SqlParam> = vec!["a@x.com".into(), vec![1u8; 32].into(), vec![2u8; 16].into()];

        assert_ok!(db.execute(insert, &params).await);
        let err = db.execute(insert, &params).await.unwrap_err();

        assert!(err.is_unique_violation());
    }
}
