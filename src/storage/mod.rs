use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub mod task;
pub mod users;

/// Closed failure taxonomy for every store operation. Callers branch on
/// these variants instead of sniffing backend error strings.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("task {0} is already in a terminal state")]
    Terminal(String),
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("store failure: {0}")]
    Fatal(String),
}

impl StoreError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let transient = matches!(
            err,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
        ) || matches!(&err, sqlx::Error::Database(db) if db.message().contains("locked"));
        if transient {
            StoreError::Transient(err.to_string())
        } else {
            StoreError::Fatal(err.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Runs a store operation, retrying transient failures a bounded number
/// of times before surfacing them. NotFound/Terminal/Fatal pass straight
/// through.
pub(crate) async fn with_retry<T, F, Fut>(op_name: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(StoreError::Transient(reason)) if attempt < RETRY_ATTEMPTS => {
                warn!(
                    "{} hit transient store failure (attempt {}/{}): {}",
                    op_name, attempt, RETRY_ATTEMPTS, reason
                );
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
