//! Step contract and per-run context
//!
//! A step is an opaque async transformation `(context, value) -> value`.
//! The context carries the caller's cancellation token and optional
//! deadline; steps observe it before any outbound call.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{LlmError, Result};

/// One transformation in a chain
#[async_trait]
pub trait Step: Send + Sync {
    /// Short label for logs and telemetry
    fn name(&self) -> &str {
        "step"
    }

    /// Transform the threaded value
    async fn execute(&self, ctx: &StepContext, input: Value) -> Result<Value>;
}

/// Cancellation and deadline shared by every step of a run
#[derive(Debug, Clone)]
pub struct StepContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    timeout: Duration,
}

impl Default for StepContext {
    fn default() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: None,
            timeout: Duration::ZERO,
        }
    }
}

impl StepContext {
    /// Context that never cancels and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a caller-owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set a deadline `timeout` from now; a timeout too large to
    /// represent as an instant means no deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self.timeout = timeout;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Time left before the deadline, `None` without one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail with `Cancelled` or `Timeout` if the run must stop
    pub fn check(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(self.timeout_error());
            }
        }
        Ok(())
    }

    /// Run `future` unless cancellation or the deadline fires first
    pub async fn guard<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(LlmError::Cancelled),
            _ = expired => Err(self.timeout_error()),
            result = future => result,
        }
    }

    fn timeout_error(&self) -> LlmError {
        LlmError::Timeout {
            duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Step built from an async closure
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

/// Wrap an async closure as a named step.
///
/// The closure gets an owned copy of the context so the returned future
/// can be `'static`.
pub fn step_fn<F, Fut>(name: impl Into<String>, func: F) -> FnStep<F>
where
    F: Fn(StepContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    FnStep {
        name: name.into(),
        func,
    }
}

#[async_trait]
impl<F, Fut> Step for FnStep<F>
where
    F: Fn(StepContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StepContext, input: Value) -> Result<Value> {
        (self.func)(ctx.clone(), input).await
    }
}
