use futures::future::BoxFuture;

use crate::domain::session::errors::StoreError;
use crate::domain::session::ports::UnitOfWork;

/// Run `operation` inside one transaction.
///
/// Commits when the operation returns `Ok` and rolls back when it returns
/// `Err`. If the operation panics, or the returned future is dropped
/// mid-flight (request deadline, client gone), the transaction handle is
/// dropped uncommitted and the store rolls it back, so a partial unit of
/// work is never observable.
///
/// The operation borrows the transaction only for the duration of its
/// future; anything else it needs must be moved in.
///
/// # Errors
/// * The operation's own error, after rollback
/// * `StoreError` (converted into `E`) from begin or commit
pub async fn run_in_transaction<U, F, T, E>(uow: &U, operation: F) -> Result<T, E>
where
    U: UnitOfWork,
    F: for<'tx> FnOnce(&'tx mut U::Tx) -> BoxFuture<'tx, Result<T, E>> + Send,
    T: Send,
    E: From<StoreError> + Send,
{
    let mut tx = uow.begin().await?;

    let outcome = operation(&mut tx).await;

    match outcome {
        Ok(value) => {
            uow.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback(tx).await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}
