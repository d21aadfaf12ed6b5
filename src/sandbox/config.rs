//! Sandbox configuration with builder pattern.

use std::time::Duration;

use crate::error::{Result, SandboxError};

/// Smallest worker stack a batch may run on.
pub const MIN_STACK_SIZE: usize = 1024 * 1024;

/// Configuration for the line evaluator.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock budget for a whole batch.
    pub timeout: Duration,
    /// Maximum interpreter steps per line (fuel).
    pub max_steps: u64,
    /// Maximum nesting of user function calls.
    pub max_call_depth: usize,
    /// Longest list, string or materialised range a line may build.
    pub max_sequence_len: usize,
    /// Largest rendered line result, and the size budget of the exported
    /// context, in bytes of text.
    pub max_output_len: usize,
    /// Stack size of the worker thread that runs a batch.
    pub stack_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_steps: 1_000_000,
            max_call_depth: 64,
            max_sequence_len: 1_000_000,
            max_output_len: 4_000_000,
            stack_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl SandboxConfig {
    /// Create a new builder for SandboxConfig.
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    /// Reject budgets that would make every batch fail or hang.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(SandboxError::Config("timeout must be positive".to_string()));
        }
        if self.max_steps == 0 {
            return Err(SandboxError::Config("max_steps must be positive".to_string()));
        }
        if self.max_sequence_len == 0 || self.max_output_len == 0 {
            return Err(SandboxError::Config(
                "size limits must be positive".to_string(),
            ));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(SandboxError::Config(format!(
                "stack_size must be at least {MIN_STACK_SIZE} bytes"
            )));
        }
        Ok(())
    }
}

/// Builder for creating SandboxConfig instances.
#[derive(Debug, Clone, Default)]
pub struct SandboxConfigBuilder {
    timeout: Option<Duration>,
    max_steps: Option<u64>,
    max_call_depth: Option<usize>,
    max_sequence_len: Option<usize>,
    max_output_len: Option<usize>,
    stack_size: Option<usize>,
}

impl SandboxConfigBuilder {
    /// Set the batch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the per-line step budget.
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Set the maximum user function call depth.
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }

    /// Set the longest sequence a line may build.
    pub fn max_sequence_len(mut self, len: usize) -> Self {
        self.max_sequence_len = Some(len);
        self
    }

    /// Set the largest rendered result and export budget.
    pub fn max_output_len(mut self, len: usize) -> Self {
        self.max_output_len = Some(len);
        self
    }

    /// Set the worker thread stack size in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Build the SandboxConfig.
    pub fn build(self) -> SandboxConfig {
        let default = SandboxConfig::default();
        SandboxConfig {
            timeout: self.timeout.unwrap_or(default.timeout),
            max_steps: self.max_steps.unwrap_or(default.max_steps),
            max_call_depth: self.max_call_depth.unwrap_or(default.max_call_depth),
            max_sequence_len: self.max_sequence_len.unwrap_or(default.max_sequence_len),
            max_output_len: self.max_output_len.unwrap_or(default.max_output_len),
            stack_size: self.stack_size.unwrap_or(default.stack_size),
        }
    }

    /// Build and validate the SandboxConfig.
    pub fn try_build(self) -> Result<SandboxConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
