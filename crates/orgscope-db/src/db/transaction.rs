//! Database transaction utilities
//!
//! Compound membership writes (primary demotion + insert/update) must be
//! atomic; this guard wraps them so an early return rolls the transaction
//! back instead of leaving a half-applied write.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};

/// A database transaction wrapper that automatically handles commit/rollback
///
/// # Example
///
/// ```ignore
/// use orgscope_db::db::transaction::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> anyhow::Result<()> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("INSERT INTO ...").execute(&mut **tx).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool) -> Result<Self> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Commit the transaction
    ///
    /// After calling this, the transaction is consumed and cannot be used further.
    pub async fn commit(mut self) -> Result<()> {
        if let Some(tx) = self.transaction.take() {
            tx.commit()
                .await
                .context("Failed to commit database transaction")?;
        }
        Ok(())
    }

    /// Rollback the transaction
    ///
    /// After calling this, the transaction is consumed and cannot be used further.
    pub async fn rollback(mut self) -> Result<()> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
        }
        Ok(())
    }
}

impl<'a> Deref for TransactionGuard<'a> {
    type Target = Transaction<'a, Postgres>;

    fn deref(&self) -> &Self::Target {
        self.transaction
            .as_ref()
            .expect("Transaction was already committed or rolled back")
    }
}

impl<'a> DerefMut for TransactionGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.transaction
            .as_mut()
            .expect("Transaction was already committed or rolled back")
    }
}

impl<'a> Drop for TransactionGuard<'a> {
    fn drop(&mut self) {
        // A transaction still present here was neither committed nor rolled
        // back; sqlx rolls it back when the inner Transaction drops.
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
