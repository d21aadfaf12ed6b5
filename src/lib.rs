//! # Calcpad Sandbox
//!
//! Line-by-line evaluation of calculator-style code against a restricted
//! environment, plus function search over a curated set of numeric
//! libraries.
//!
//! Lines are run by a small purpose-built interpreter, never by a host
//! language runtime. Each request gets a brand-new environment holding only
//! a whitelist of builtins and the available library modules, and every
//! batch runs on its own worker thread under step, recursion, size and
//! wall-clock budgets.
//!
//! ## Example
//!
//! ```rust,no_run
//! use calcpad_sandbox::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SandboxConfig::builder()
//!         .timeout(Duration::from_secs(5))
//!         .build();
//!
//!     let sandbox = CalcSandbox::new(config);
//!     let request = EvaluationRequest::new(["r = 2", "math.pi * r ** 2", "1/0"]);
//!     let result = sandbox.evaluate(request).await?;
//!
//!     assert_eq!(result.results[0], "");
//!     assert_eq!(result.results[1], "12.566370614359172");
//!     assert_eq!(result.results[2], "Error: division by zero");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Isolation Model
//!
//! 1. **Restricted grammar**: only the interpreter's expression and
//!    statement subset exists; there is no reflection, I/O or process access
//! 2. **Import gate**: imports resolve only against the available modules
//! 3. **Resource limits**: per-line step budget, recursion depth and
//!    sequence size are bounded
//! 4. **Interrupt**: a timed-out batch is stopped cooperatively even inside
//!    a tight loop

pub mod errlog;
pub mod error;
pub mod interp;
pub mod library;
pub mod prelude;
pub mod sandbox;
pub mod service;

// Re-export main types at crate root for convenience
pub use errlog::{ErrorEntry, ErrorLog};
pub use error::{Result, SandboxError};
pub use library::{global_library, Library, LibraryCatalog};
pub use sandbox::config::{SandboxConfig, SandboxConfigBuilder};
pub use sandbox::executor::{
    CalcSandbox, EvaluationRequest, EvaluationResult, ExecutionMetadata,
};
pub use service::CalcpadService;
