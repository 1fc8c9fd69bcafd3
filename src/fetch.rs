//! Tri-state outcome envelope handed to callers of the core operations.
//!
//! Services return `AppResult<T>`; callers that track progress wrap the call
//! in a [`FetchTask`] and read a [`Fetch`] from it. `Loading` is never
//! produced by the services themselves, only by a task that has not finished.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::future::Future;
use tokio::{sync::watch, task::JoinHandle};

use crate::error::{AppResult, ErrorKind};

/// Loading, success or a user-safe error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Fetch<T> {
    Loading,
    Success {
        data: T,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl<T> Fetch<T> {
    pub fn success(data: T) -> Self {
        Fetch::Success { data }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Fetch::Loading)
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Fetch::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Fetch::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl<T> From<AppResult<T>> for Fetch<T> {
    /// Logs the underlying error; only the user-safe message is kept
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Fetch::Success { data },
            Err(e) => {
                let kind = e.kind();
                if kind == ErrorKind::Validation {
                    tracing::info!(error = %e, "Operation rejected");
                } else {
                    tracing::error!(error = %e, kind = ?kind, "Operation failed");
                }
                Fetch::Error {
                    kind,
                    message: e.user_message(),
                }
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Fetch<T> {
    fn into_response(self) -> Response {
        let status = match &self {
            Fetch::Loading => StatusCode::ACCEPTED,
            Fetch::Success { .. } => StatusCode::OK,
            Fetch::Error { kind, .. } => kind.status_code(),
        };
        (status, Json(self)).into_response()
    }
}

/// A spawned operation yielding at most one terminal [`Fetch`]
///
/// Cancelling only stops local processing. Storage writes the operation has
/// already issued stay in place.
pub struct FetchTask<T> {
    handle: JoinHandle<AppResult<T>>,
    outcome: watch::Receiver<Fetch<()>>,
}

impl<T: Send + 'static> FetchTask<T> {
    pub fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (outcome_tx, outcome) = watch::channel(Fetch::Loading);
        let handle = tokio::spawn(async move {
            let result = operation.await;
            let terminal = match &result {
                Ok(_) => Fetch::success(()),
                Err(e) => Fetch::Error {
                    kind: e.kind(),
                    message: e.user_message(),
                },
            };
            let _ = outcome_tx.send(terminal);
            result
        });

        Self { handle, outcome }
    }

    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Current state without the payload: `Loading` while the operation
    /// runs, then its terminal `Success` or `Error`
    ///
    /// `None` once the task has stopped without an outcome (cancelled or
    /// panicked).
    pub fn snapshot(&self) -> Option<Fetch<()>> {
        let state = self.outcome.borrow().clone();
        if state.is_loading() && !self.is_pending() {
            return None;
        }
        Some(state)
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Waits for the outcome; `None` when the task was cancelled
    pub async fn finish(self) -> Option<Fetch<T>> {
        match self.handle.await {
            Ok(result) => Some(result.into()),
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Fetch task cancelled");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Fetch task panicked");
                Some(Fetch::Error {
                    kind: ErrorKind::Internal,
                    message: crate::error::LOAD_FAILURE_MESSAGE.to_string(),
                })
            }
        }
    }
}
