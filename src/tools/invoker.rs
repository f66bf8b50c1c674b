//! Tool invoker - validates, dispatches with a deadline, records every outcome.
//!
//! `execute` never returns an error: unknown tools, disabled tools, bad
//! parameters, handler failures, panics and timeouts all come back as an
//! `ExecutionResult` with `success == false`, and every result is appended
//! to the history before `execute` returns. The work runs on its own task,
//! so a caller that stops waiting does not cancel the bookkeeping.

use crate::control::SharedControl;
use crate::tools::handler::{HandlerSet, ToolCall};
use crate::tools::history::ExecutionResult;
use crate::types::{Error, ExecutionId, Result, SessionId};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Timeout applied when neither the request nor the config sets one.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Error text recorded when a handler misses its deadline.
pub const TIMEOUT_ERROR: &str = "timeout";

// =============================================================================
// Request
// =============================================================================

/// One invocation request. Transient.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub tool_id: String,
    pub action: String,
    pub parameters: Map<String, Value>,
    /// `None` uses the invoker's default.
    pub timeout: Option<Duration>,
    pub session_id: Option<SessionId>,
}

impl ExecutionRequest {
    pub fn new(tool_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            action: action.into(),
            parameters: Map::new(),
            timeout: None,
            session_id: None,
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    fn validate(&self) -> Result<()> {
        crate::validation::validate_non_empty(&self.tool_id, "toolId")?;
        crate::validation::validate_non_empty(&self.action, "action")?;
        if let Some(timeout) = self.timeout {
            crate::validation::validate_positive_duration(timeout, "timeout")?;
        }
        Ok(())
    }
}

// =============================================================================
// Status lookup
// =============================================================================

#[derive(Debug, Clone)]
struct InFlight {
    tool_id: String,
    action: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Where an execution stands, by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running {
        tool_id: String,
        action: String,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    },
    Finished(ExecutionResult),
}

// =============================================================================
// Invoker
// =============================================================================

/// Executes tool calls against the shared registry and history.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    control: SharedControl,
    handlers: Arc<HandlerSet>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    default_timeout: Duration,
}

impl ToolInvoker {
    pub fn new(control: SharedControl, handlers: HandlerSet) -> Self {
        Self {
            control,
            handlers: Arc::new(handlers),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            default_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    /// Run a request to completion and return its (already recorded) result.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute_as(ExecutionId::new(), request).await
    }

    /// Start a request in the background and return its id immediately.
    ///
    /// The id is queryable through [`ToolInvoker::status`] as soon as this returns.
    pub async fn submit(&self, request: ExecutionRequest) -> ExecutionId {
        let execution_id = ExecutionId::new();
        self.track(&execution_id, &request, Instant::now()).await;

        let invoker = self.clone();
        let id = execution_id.clone();
        tokio::spawn(async move {
            invoker.execute_as(id, request).await;
        });
        execution_id
    }

    /// Running executions come from the in-flight table; finished ones from
    /// the history.
    ///
    /// The in-flight table is read first. Finishing appends to
    /// the history before removing the in-flight entry, so an id missing from
    /// the table is already in the history unless it was evicted.
    pub async fn status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        if let Some(running) = self.running(execution_id).await {
            return Some(running);
        }
        let state = self.control.lock().await;
        state
            .history()
            .get(execution_id)
            .map(|result| ExecutionStatus::Finished(result.clone()))
    }

    async fn running(&self, execution_id: &str) -> Option<ExecutionStatus> {
        let in_flight = self.in_flight.lock().await;
        in_flight.get(execution_id).map(|entry| ExecutionStatus::Running {
            tool_id: entry.tool_id.clone(),
            action: entry.action.clone(),
            started_at: entry.started_at,
            elapsed_ms: elapsed_ms(entry.started),
        })
    }

    /// Number of executions currently running.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn execute_as(&self, execution_id: ExecutionId, request: ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();
        let tool_id = request.tool_id.clone();
        let action = request.action.clone();

        let invoker = self.clone();
        let id = execution_id.clone();
        let task = tokio::spawn(async move { invoker.run(id, request, started).await });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                // The task never reached its own bookkeeping.
                let result = ExecutionResult::failure(
                    execution_id,
                    &tool_id,
                    &action,
                    format!("execution aborted: {}", join_error),
                    elapsed_ms(started),
                );
                self.finish(result.clone()).await;
                result
            }
        }
    }

    async fn run(&self, execution_id: ExecutionId, request: ExecutionRequest, started: Instant) -> ExecutionResult {
        self.track(&execution_id, &request, started).await;

        let outcome = self.dispatch(&request).await;
        let took_ms = elapsed_ms(started);

        let result = match outcome {
            Ok(data) => {
                tracing::info!(
                    tool_id = %request.tool_id,
                    action = %request.action,
                    execution_id = %execution_id,
                    took_ms,
                    "tool execution succeeded"
                );
                ExecutionResult::success(execution_id, &request.tool_id, &request.action, data, took_ms)
            }
            Err(err) => {
                tracing::warn!(
                    tool_id = %request.tool_id,
                    action = %request.action,
                    execution_id = %execution_id,
                    took_ms,
                    code = err.code(),
                    error = %err,
                    "tool execution failed"
                );
                ExecutionResult::failure(
                    execution_id,
                    &request.tool_id,
                    &request.action,
                    failure_message(&err),
                    took_ms,
                )
            }
        };

        self.finish(result.clone()).await;
        result
    }

    /// Validate against the registry, then call the handler under the deadline.
    async fn dispatch(&self, request: &ExecutionRequest) -> Result<Value> {
        request.validate()?;

        let call = {
            let state = self.control.lock().await;
            let registry = state.registry();
            registry.ensure_available(&request.tool_id)?;

            let mut parameters = request.parameters.clone();
            registry.fill_defaults(&request.tool_id, &mut parameters)?;
            let problems = registry.validate_params(&request.tool_id, &parameters)?;
            if !problems.is_empty() {
                return Err(Error::validation(problems.join("; ")));
            }

            ToolCall {
                tool_id: request.tool_id.clone(),
                action: request.action.clone(),
                parameters,
                session_id: request.session_id.clone(),
            }
        };

        let handler = self.handlers.resolve(&request.tool_id).ok_or_else(|| {
            Error::tool_unavailable(format!("no handler bound for {}", request.tool_id))
        })?;

        let deadline = request.timeout.unwrap_or(self.default_timeout);
        let guarded = AssertUnwindSafe(handler.call(call)).catch_unwind();

        match tokio::time::timeout(deadline, guarded).await {
            Err(_elapsed) => Err(Error::timeout(format!(
                "{} did not answer within {}ms",
                request.tool_id,
                deadline.as_millis()
            ))),
            Ok(Err(panic)) => Err(Error::internal(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Ok(Ok(outcome)) => outcome,
        }
    }

    async fn track(&self, execution_id: &ExecutionId, request: &ExecutionRequest, started: Instant) {
        self.in_flight
            .lock()
            .await
            .entry(execution_id.as_str().to_string())
            .or_insert_with(|| InFlight {
                tool_id: request.tool_id.clone(),
                action: request.action.clone(),
                started_at: Utc::now(),
                started,
            });
    }

    /// Append to history, then drop the in-flight entry. Lookups read the
    /// in-flight table first, so they never fall between the two.
    async fn finish(&self, result: ExecutionResult) {
        let key = result.execution_id.as_str().to_string();
        self.control.lock().await.history_mut().append(result);
        self.in_flight.lock().await.remove(&key);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn failure_message(err: &Error) -> String {
    match err {
        Error::Timeout(_) => TIMEOUT_ERROR.to_string(),
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
