//! Typed operations behind the calcpad endpoints.
//!
//! Each method takes the request data already extracted by a transport
//! layer and returns a serializable response using the client's camelCase
//! field names. Routing and request parsing live outside this crate.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;

use crate::errlog::{ErrorEntry, ErrorLog};
use crate::error::{Result, SandboxError};
use crate::library::{global_library, Library, ModuleDescriptor, SearchResponse};
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::executor::{CalcSandbox, EvaluationRequest, EvaluationResult};

#[derive(Debug, Clone, Serialize)]
pub struct LibrariesResponse {
    pub libraries: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub library: String,
    pub name: String,
    pub signature: String,
    pub doc: String,
    pub doc_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedResponse {
    pub logged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogsResponse {
    pub errors: Vec<ErrorEntry>,
}

/// Shared service state: library, sandbox and error log.
#[derive(Debug, Clone)]
pub struct CalcpadService {
    sandbox: CalcSandbox,
    errors: Arc<ErrorLog>,
}

impl Default for CalcpadService {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl CalcpadService {
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_library(config, global_library())
    }

    pub fn with_library(config: SandboxConfig, library: Arc<Library>) -> Self {
        Self {
            sandbox: CalcSandbox::with_library(config, library),
            errors: Arc::new(ErrorLog::default()),
        }
    }

    fn library(&self) -> &Library {
        self.sandbox.library()
    }

    pub fn sandbox(&self) -> &CalcSandbox {
        &self.sandbox
    }

    /// Evaluate a `{"lines": [...], "context": {...}}` payload.
    pub async fn evaluate(&self, payload: &Json) -> Result<EvaluationResult> {
        let request = EvaluationRequest::from_json(payload)?;
        self.sandbox.evaluate(request).await
    }

    /// Every configured library with its availability and doc template.
    pub fn libraries(&self) -> LibrariesResponse {
        LibrariesResponse {
            libraries: self.library().registry.descriptors(),
        }
    }

    pub fn function_search(&self, raw: &str) -> SearchResponse {
        self.library().matcher().search(raw)
    }

    /// Metadata and doc link for one function.
    ///
    /// Names that are not indexed still resolve, with the bare name as
    /// signature and an empty description.
    pub fn function_info(&self, library: &str, name: &str) -> Result<FunctionInfo> {
        let (library, name) = (library.trim(), name.trim());
        if library.is_empty() || name.is_empty() {
            return Err(SandboxError::InvalidRequest(
                "Missing lib or name".to_string(),
            ));
        }
        let state = self.library();
        let descriptor = state.index.describe(library, name);
        Ok(FunctionInfo {
            library: library.to_string(),
            name: name.to_string(),
            signature: descriptor.signature,
            doc: descriptor.description,
            doc_url: state.registry.catalog().doc_url(library, name),
        })
    }

    /// Record a `{"type", "message", "lineNo"}` diagnostic entry.
    pub fn log_error(&self, payload: &Json) -> LoggedResponse {
        let text = |key: &str, default: &str| match payload.get(key) {
            None => default.to_string(),
            Some(Json::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let line_no = payload.get("lineNo").filter(|v| !v.is_null()).cloned();
        let entry = self
            .errors
            .record(text("type", "client"), text("message", "Unknown error"), line_no);
        tracing::debug!(kind = entry.kind.as_str(), "error logged: {}", entry.message);
        LoggedResponse { logged: true }
    }

    pub fn error_logs(&self) -> ErrorLogsResponse {
        ErrorLogsResponse {
            errors: self.errors.entries(),
        }
    }
}
