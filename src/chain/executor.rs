//! Chain executor
//!
//! Runs an ordered list of steps over one threaded value. Registration
//! takes the exclusive lock; runs take the shared lock for their whole
//! duration, so concurrent runs proceed in parallel and never observe a
//! half-updated step list.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::chain::step::{Step, StepContext};
use crate::errors::{LlmError, Result};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Ordered, append-only pipeline of steps
#[derive(Default)]
pub struct Chain {
    steps: RwLock<Vec<Arc<dyn Step>>>,
    telemetry: Option<TelemetryCollector>,
}

impl Chain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Report step events to a collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Append a step
    pub async fn add_step<S>(&self, step: S)
    where
        S: Step + 'static,
    {
        self.add_shared_step(Arc::new(step)).await;
    }

    /// Append a step that may also be used by other chains
    pub async fn add_shared_step(&self, step: Arc<dyn Step>) {
        let mut steps = self.steps.write().await;
        debug!(step = step.name(), position = steps.len(), "adding chain step");
        steps.push(step);
    }

    /// Remove every step
    pub async fn clear(&self) {
        self.steps.write().await.clear();
    }

    /// Number of registered steps
    pub async fn step_count(&self) -> usize {
        self.steps.read().await.len()
    }

    /// Run every step in order, feeding each output into the next step.
    ///
    /// Stops at the first failure and reports it with the zero-based index
    /// of the failing step. Cancellation is checked before each step.
    ///
    /// The shared lock is held until the run returns. A step must not call
    /// back into the chain running it (`add_step`, `clear`, `step_count` or
    /// `run`): a writer queued behind the run blocks later readers, so the
    /// call would never complete. Steps may freely run other chains.
    pub async fn run(&self, ctx: &StepContext, input: Value) -> Result<Value> {
        let steps = self.steps.read().await;
        let started = Instant::now();
        let mut value = input;

        for (index, step) in steps.iter().enumerate() {
            ctx.check().map_err(|e| step_error(index, e))?;

            self.record(TelemetryEvent::StepStarted {
                index,
                step: step.name().to_string(),
                timestamp: Instant::now(),
            });
            debug!(index, step = step.name(), "running step");

            let step_started = Instant::now();
            let outcome = step.execute(ctx, value).await;
            self.record(TelemetryEvent::StepCompleted {
                index,
                step: step.name().to_string(),
                duration_ms: step_started.elapsed().as_millis() as u64,
                success: outcome.is_ok(),
                timestamp: Instant::now(),
            });

            value = match outcome {
                Ok(output) => output,
                Err(e) => {
                    warn!(index, step = step.name(), error = %e, "chain step failed");
                    return Err(step_error(index, e));
                }
            };
        }

        info!(
            steps = steps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chain completed"
        );
        Ok(value)
    }

    /// Run with a string input; a non-string result is rendered as JSON text
    pub async fn run_string(&self, ctx: &StepContext, input: &str) -> Result<String> {
        match self.run(ctx, Value::String(input.to_string())).await? {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    /// Run with typed input and output, converting through JSON
    pub async fn run_typed<I, O>(&self, ctx: &StepContext, input: &I) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let value = serde_json::to_value(input)?;
        let output = self.run(ctx, value).await?;
        Ok(serde_json::from_value(output)?)
    }

    fn record(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }
}

fn step_error(index: usize, source: LlmError) -> LlmError {
    LlmError::StepExecution {
        index,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::step::step_fn;
    use serde::Deserialize;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn append(suffix: &'static str) -> impl Step {
        step_fn(suffix, move |_ctx, input: Value| async move {
            let text = input.as_str().unwrap_or_default();
            Ok(Value::String(format!("{}{}", text, suffix)))
        })
    }

    #[tokio::test]
    async fn test_empty_chain_returns_input() {
        let chain = Chain::new();
        assert_eq!(chain.step_count().await, 0);
        let output = chain.run(&StepContext::new(), json!({"a": 1})).await.unwrap();
        assert_eq!(output, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_steps_run_in_append_order() {
        let chain = Chain::new();
        chain.add_step(append("a")).await;
        chain.add_step(append("b")).await;
        chain.add_step(append("c")).await;

        let output = chain.run_string(&StepContext::new(), ">").await.unwrap();
        assert_eq!(output, ">abc");
        assert_eq!(chain.step_count().await, 3);
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_index() {
        let chain = Chain::new();
        chain.add_step(append("a")).await;
        chain
            .add_step(step_fn("boom", |_ctx, _input| async {
                Err(LlmError::Generic("boom".to_string()))
            }))
            .await;
        chain.add_step(append("never")).await;

        let err = chain.run_string(&StepContext::new(), "").await.unwrap_err();
        assert_eq!(err.step_index(), Some(1));
        assert!(matches!(err.root_cause(), LlmError::Generic(m) if m == "boom"));
    }

    #[tokio::test]
    async fn test_clear_returns_to_empty() {
        let chain = Chain::new();
        chain.add_step(append("a")).await;
        chain.clear().await;
        assert_eq!(chain.step_count().await, 0);
        assert_eq!(chain.run_string(&StepContext::new(), "x").await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_run_string_stringifies_non_string_output() {
        let chain = Chain::new();
        chain
            .add_step(step_fn("object", |_ctx, _input| async {
                Ok(json!({"answer": 42}))
            }))
            .await;

        let output = chain.run_string(&StepContext::new(), "q").await.unwrap();
        assert_eq!(output, r#"{"answer":42}"#);
    }

    #[tokio::test]
    async fn test_run_typed_round_trips_structs() {
        #[derive(Serialize)]
        struct Request {
            n: i64,
        }
        #[derive(Deserialize)]
        struct Reply {
            n: i64,
        }

        let chain = Chain::new();
        chain
            .add_step(step_fn("inc", |_ctx, input: Value| async move {
                let n = input["n"].as_i64().unwrap_or_default();
                Ok(json!({"n": n + 1}))
            }))
            .await;

        let reply: Reply = chain
            .run_typed(&StepContext::new(), &Request { n: 1 })
            .await
            .unwrap();
        assert_eq!(reply.n, 2);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_before_first_step() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = StepContext::new().with_cancellation(token);

        let chain = Chain::new();
        chain.add_step(append("a")).await;

        let err = chain.run(&ctx, json!("x")).await.unwrap_err();
        assert_eq!(err.step_index(), Some(0));
        assert!(matches!(err.root_cause(), LlmError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_between_steps() {
        let token = CancellationToken::new();
        let ctx = StepContext::new().with_cancellation(token.clone());

        let chain = Chain::new();
        chain
            .add_step(step_fn("cancel", move |_ctx, input| {
                let token = token.clone();
                async move {
                    token.cancel();
                    Ok(input)
                }
            }))
            .await;
        chain.add_step(append("b")).await;

        let err = chain.run(&ctx, json!("x")).await.unwrap_err();
        assert_eq!(err.step_index(), Some(1));
    }

    #[tokio::test]
    async fn test_step_can_run_a_separate_chain() {
        let inner = Arc::new(Chain::new());
        inner.add_step(append("-inner")).await;

        let outer = Arc::new(Chain::new());
        outer.add_step(append("a")).await;
        let nested = inner.clone();
        outer
            .add_step(step_fn("nested", move |ctx, input| {
                let nested = nested.clone();
                async move { nested.run(&ctx, input).await }
            }))
            .await;

        // A writer queued on the outer chain must not stall the inner run
        let writer = {
            let outer = outer.clone();
            tokio::spawn(async move { outer.add_step(append("late")).await })
        };

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            outer.run_string(&StepContext::new(), ">"),
        )
        .await
        .expect("nested chain run stalled")
        .unwrap();
        assert!(output == ">a-inner" || output == ">a-innerlate");

        writer.await.unwrap();
        assert_eq!(outer.step_count().await, 3);
        assert_eq!(inner.step_count().await, 1);
    }

    #[tokio::test]
    async fn test_telemetry_counts_steps() {
        let telemetry = TelemetryCollector::new();
        let chain = Chain::new().with_telemetry(telemetry.clone());
        chain.add_step(append("a")).await;
        chain
            .add_step(step_fn("fail", |_ctx, _input| async {
                Err(LlmError::Generic("no".to_string()))
            }))
            .await;

        let _ = chain.run(&StepContext::new(), json!("")).await;
        let stats = telemetry.get_stats();
        assert_eq!(stats.steps_executed, 2);
        assert_eq!(stats.steps_succeeded, 1);
        assert_eq!(stats.steps_failed, 1);
    }
}
