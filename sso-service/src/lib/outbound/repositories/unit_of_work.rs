use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;
use tracing::Instrument;

use super::sql::classify;
use super::sql::query_span;
use crate::domain::session::errors::StoreError;
use crate::domain::session::ports::UnitOfWork;

const SET_SERIALIZABLE: &str = "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE";

/// Opens serializable PostgreSQL transactions for `PostgresSessionStore`.
///
/// A transaction dropped without `commit` or `rollback` is rolled back by
/// `sqlx` when its connection returns to the pool.
pub struct PostgresUnitOfWork {
    pool: PgPool,
}

impl PostgresUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify(e, "transaction"))?;

        // Must be the first statement of the transaction.
        sqlx::query(SET_SERIALIZABLE)
            .execute(&mut *tx)
            .instrument(query_span("SET", SET_SERIALIZABLE))
            .await
            .map_err(|e| classify(e, "transaction"))?;

        Ok(tx)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit().await.map_err(|e| classify(e, "transaction"))
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.rollback().await.map_err(|e| classify(e, "transaction"))
    }
}
