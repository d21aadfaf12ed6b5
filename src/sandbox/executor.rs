//! Batch execution engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value as Json};
use tokio::sync::oneshot;

use crate::error::{Result, SandboxError};
use crate::interp::Interpreter;
use crate::library::{global_library, Library};
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::environment;
use crate::sandbox::limits::{Interrupt, StepLimiter};
use crate::sandbox::serialize::from_json;

/// How long a worker may take to return after its interrupt is raised.
const TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// An ordered batch of lines plus the client's page contexts.
#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    pub lines: Vec<String>,
    /// Page name to that page's variable bindings.
    pub pages: Map<String, Json>,
}

impl EvaluationRequest {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            pages: Map::new(),
        }
    }

    /// Add one page context.
    pub fn with_page(mut self, name: impl Into<String>, vars: Json) -> Self {
        self.pages.insert(name.into(), vars);
        self
    }

    /// Parse a `{"lines": [...], "context": {...}}` payload.
    ///
    /// A missing `lines` field is an empty batch; a `lines` field that is not
    /// an array is rejected. Non-string entries are converted to their text
    /// form, and a `context` that is not an object is ignored.
    pub fn from_json(payload: &Json) -> Result<Self> {
        let lines = match payload.get("lines") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(lines)) => lines.iter().map(line_text).collect(),
            Some(_) => return Err(SandboxError::InvalidRequest("Invalid lines".to_string())),
        };
        let pages = match payload.get("context") {
            Some(Json::Object(pages)) => pages.clone(),
            _ => Map::new(),
        };
        Ok(Self { lines, pages })
    }
}

fn line_text(entry: &Json) -> String {
    match entry {
        Json::String(s) => s.clone(),
        other => from_json(other).to_display(),
    }
}

/// Per-line results and the exported variable snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    /// One entry per input line, in order.
    pub results: Vec<String>,
    pub context: Map<String, Json>,
    #[serde(skip)]
    pub metadata: ExecutionMetadata,
}

impl EvaluationResult {
    /// Number of lines whose result is an error.
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.starts_with("Error: ")).count()
    }
}

/// Execution statistics for a batch.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetadata {
    /// Wall time spent running the lines.
    pub duration: Duration,
    /// Interpreter steps taken across all lines.
    pub steps: u64,
    /// Deepest user function call nesting.
    pub peak_call_depth: usize,
    /// Whether the batch hit its deadline.
    pub timed_out: bool,
}

/// Evaluates batches against a fresh restricted environment each time.
#[derive(Debug, Clone)]
pub struct CalcSandbox {
    config: SandboxConfig,
    library: Arc<Library>,
}

impl CalcSandbox {
    /// Create a sandbox over the process-wide library state.
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_library(config, global_library())
    }

    /// Create a sandbox over a specific library state.
    pub fn with_library(config: SandboxConfig, library: Arc<Library>) -> Self {
        Self { config, library }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Evaluate a batch on a dedicated worker thread.
    ///
    /// The worker polls a shared interrupt that is raised once the timeout
    /// elapses; lines cut short render as timed out while the result stays
    /// aligned with the input. Only a worker that still has not returned
    /// after a short grace period fails the request.
    pub async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult> {
        self.config.validate()?;
        let timeout = self.config.timeout;
        let interrupt = Interrupt::new();
        let (tx, mut rx) = oneshot::channel();

        let library = Arc::clone(&self.library);
        let config = self.config.clone();
        let worker_interrupt = interrupt.clone();
        std::thread::Builder::new()
            .name("calcpad-batch".to_string())
            .stack_size(self.config.stack_size)
            .spawn(move || {
                let result = run_batch(&library, &config, worker_interrupt, &request);
                let _ = tx.send(result);
            })
            .map_err(|e| {
                SandboxError::RuntimeInit(anyhow::anyhow!("failed to spawn batch worker: {}", e))
            })?;

        tokio::select! {
            result = &mut rx => result.map_err(|_| {
                SandboxError::ExecutionFailed("batch worker exited without a result".to_string())
            }),
            _ = tokio::time::sleep(timeout) => {
                interrupt.raise();
                match tokio::time::timeout(TIMEOUT_GRACE, &mut rx).await {
                    Ok(Ok(result)) => Ok(result),
                    _ => {
                        tracing::warn!(?timeout, "batch worker did not stop after interrupt");
                        Err(SandboxError::Timeout(timeout))
                    }
                }
            }
        }
    }

    /// Evaluate a batch on the calling thread.
    ///
    /// Step, depth and deadline budgets still apply, but there is no outer
    /// race and the caller's stack is used.
    pub fn evaluate_blocking(&self, request: &EvaluationRequest) -> EvaluationResult {
        run_batch(&self.library, &self.config, Interrupt::new(), request)
    }
}

impl Default for CalcSandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

/// Run every line in order against one fresh environment.
fn run_batch(
    library: &Library,
    config: &SandboxConfig,
    interrupt: Interrupt,
    request: &EvaluationRequest,
) -> EvaluationResult {
    let started = Instant::now();
    tracing::debug!(
        lines = request.lines.len(),
        pages = request.pages.len(),
        "batch started"
    );

    let limiter = StepLimiter::new(config, interrupt);
    let globals = environment::globals(&library.registry);
    let mut interp = Interpreter::new(globals, &library.registry, limiter);
    environment::bind_pages(&mut interp, &request.pages);

    let results: Vec<String> = request
        .lines
        .iter()
        .map(|line| interp.run_line(line))
        .collect();
    let context = environment::export(&interp.bindings(), config.max_output_len);

    let limiter = interp.limiter();
    let metadata = ExecutionMetadata {
        duration: started.elapsed(),
        steps: limiter.total_steps(),
        peak_call_depth: limiter.peak_call_depth(),
        timed_out: limiter.timed_out(),
    };
    if metadata.timed_out {
        tracing::warn!(elapsed = ?metadata.duration, "batch hit its deadline");
    }
    tracing::debug!(
        lines = results.len(),
        steps = metadata.steps,
        elapsed = ?metadata.duration,
        "batch finished"
    );

    EvaluationResult {
        results,
        context,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_from_json() {
        let request = EvaluationRequest::from_json(&json!({
            "lines": ["1+1", 5, true, null],
            "context": {"page1": {"x": 1}}
        }))
        .unwrap();
        assert_eq!(request.lines, ["1+1", "5", "True", "None"]);
        assert!(request.pages.contains_key("page1"));
    }

    #[test]
    fn test_request_rejects_non_list_lines() {
        let err = EvaluationRequest::from_json(&json!({"lines": "1+1"})).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_request_defaults() {
        let request = EvaluationRequest::from_json(&json!({"context": [1, 2]})).unwrap();
        assert!(request.lines.is_empty());
        assert!(request.pages.is_empty());
    }

    #[test]
    fn test_blocking_evaluation() {
        let sandbox = CalcSandbox::default();
        let result = sandbox.evaluate_blocking(&EvaluationRequest::new(["x = 5", "x * 2"]));
        assert_eq!(result.results, ["", "10"]);
        assert_eq!(result.context["x"], json!(5));
        assert!(result.metadata.steps > 0);
        assert!(!result.metadata.timed_out);
    }

    #[tokio::test]
    async fn test_async_evaluation() {
        let sandbox = CalcSandbox::default();
        let result = sandbox
            .evaluate(EvaluationRequest::new(["1+1", "1/0", "# note", ""]))
            .await
            .unwrap();
        assert_eq!(result.results.len(), 4);
        assert_eq!(result.results[0], "2");
        assert!(result.results[1].starts_with("Error: "));
        assert_eq!(result.results[2], "");
        assert_eq!(result.error_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_interrupts_hung_line() {
        let config = SandboxConfig::builder()
            .timeout(Duration::from_millis(100))
            .max_steps(u64::MAX)
            .build();
        let sandbox = CalcSandbox::new(config);
        let result = sandbox
            .evaluate(EvaluationRequest::new(["x = 1", "while True: pass", "x"]))
            .await
            .unwrap();
        assert_eq!(result.results[0], "");
        assert_eq!(result.results[1], "Error: execution timed out");
        assert_eq!(result.results[2], "Error: execution timed out");
        assert!(result.metadata.timed_out);
    }
}
