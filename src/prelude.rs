//! Prelude module for convenient imports.

pub use crate::error::{Result, SandboxError};
pub use crate::library::{Library, LibraryCatalog};
pub use crate::sandbox::{
    config::SandboxConfig,
    executor::{CalcSandbox, EvaluationRequest, EvaluationResult},
};
pub use crate::service::CalcpadService;
