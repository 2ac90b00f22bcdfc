//! Per-run execution context
//!
//! A `RunContext` travels with one invocation of an agent or workflow. It
//! carries the cancellation token that every suspension point races against,
//! plus a few identifiers used for log correlation.

use crate::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Context passed to agents during execution
///
/// Cloning a context shares its cancellation token. Use [`RunContext::child`]
/// to derive a context that is cancelled with its parent but can also be
/// cancelled on its own.
///
/// # Example
///
/// ```
/// use agent_core::RunContext;
///
/// let ctx = RunContext::new().with_session_id("session-123");
/// let stage = ctx.child();
///
/// ctx.cancel();
/// assert!(stage.is_cancelled());
/// assert_eq!(stage.session_id(), Some("session-123"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancellation: CancellationToken,
    session_id: Option<String>,
}

impl RunContext {
    /// Create a new context with a fresh cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Get the session ID
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The token observed by this run
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Request cancellation of this run and everything derived from it
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Derive a context whose token is a child of this one
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            session_id: self.session_id.clone(),
        }
    }

    /// Fail fast with [`Error::Cancelled`] if cancellation was requested
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Await `fut` unless the run is cancelled first
    ///
    /// The future is dropped on cancellation, so partially received results
    /// never escape.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(Error::Cancelled),
            value = fut => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_returns_value() {
        let ctx = RunContext::new();
        let out = ctx.guard(async { 42usize }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_guard_stops_on_cancel() {
        let ctx = RunContext::new();
        let task_ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            task_ctx
                .guard(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    7usize
                })
                .await
        });

        ctx.cancel();
        let out = tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("guard should resolve quickly after cancellation")
            .expect("task should not panic");
        assert!(matches!(out, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_guard_refuses_when_already_cancelled() {
        let ctx = RunContext::new();
        ctx.cancel();
        let out = ctx.guard(async { 1 }).await;
        assert!(matches!(out, Err(Error::Cancelled)));
    }

    #[test]
    fn test_child_cancellation_is_one_way() {
        let parent = RunContext::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let sibling = parent.child();
        parent.cancel();
        assert!(sibling.is_cancelled());
        assert!(sibling.ensure_active().is_err());
    }
}
