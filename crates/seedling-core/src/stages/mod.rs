//! Destructive pipeline stages.
//!
//! Both stages validate model names against the run's
//! [`ModelRegistry`](crate::registry::ModelRegistry) before touching the
//! database, fan their work out concurrently, and wait for every operation to
//! settle before reporting. Results are written into the run's
//! [`RunResult`](crate::models::RunResult) only when the whole stage succeeds;
//! on failure the [`StageError`](crate::error::StageError) carries the effects
//! that were applied anyway.
//!
//! A stage timeout bounds each database operation rather than the stage as a
//! whole. An operation that runs out of time counts as failed, so the error
//! still reports every operation that completed. A timed-out operation may
//! still be applied by the database after the stage has reported.

use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

pub mod clear;
pub mod populate;

pub use clear::clear_models;
pub use populate::populate_models;

/// Awaits one database operation, failing it once `limit` elapses.
async fn bounded<T, F>(limit: Option<Duration>, operation: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .unwrap_or_else(|_| Err(ClientError::TimedOut { limit })),
        None => operation.await,
    }
}
