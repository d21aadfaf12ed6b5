//! Resource limiting for the line interpreter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::sandbox::config::SandboxConfig;

/// How many steps pass between deadline and interrupt checks.
const CHECK_INTERVAL: u64 = 256;

/// Cross-thread stop signal raised when a batch overruns its timeout.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Step, depth, size and time budgets enforced while a batch runs.
#[derive(Debug)]
pub struct StepLimiter {
    /// Maximum steps a single line may take.
    max_steps: u64,
    /// Steps taken by the current line.
    line_steps: u64,
    /// Steps taken by the whole batch.
    total_steps: u64,
    max_call_depth: usize,
    call_depth: usize,
    /// Deepest call nesting seen.
    peak_call_depth: usize,
    max_sequence_len: usize,
    max_output_len: usize,
    deadline: Option<Instant>,
    interrupt: Interrupt,
    timed_out: bool,
}

impl StepLimiter {
    pub fn new(config: &SandboxConfig, interrupt: Interrupt) -> Self {
        Self {
            max_steps: config.max_steps,
            line_steps: 0,
            total_steps: 0,
            max_call_depth: config.max_call_depth,
            call_depth: 0,
            peak_call_depth: 0,
            max_sequence_len: config.max_sequence_len,
            max_output_len: config.max_output_len,
            deadline: Instant::now().checked_add(config.timeout),
            interrupt,
            timed_out: false,
        }
    }

    /// Start the budget for a new line.
    pub fn begin_line(&mut self) {
        self.line_steps = 0;
        self.call_depth = 0;
    }

    /// Charge one step.
    pub fn tick(&mut self) -> EvalResult<()> {
        self.line_steps += 1;
        self.total_steps += 1;
        if self.line_steps > self.max_steps {
            return Err(EvalError::new(
                ErrorKind::Resource,
                format!("execution step limit exceeded ({} steps)", self.max_steps),
            ));
        }
        if self.line_steps % CHECK_INTERVAL == 0 {
            self.check_time()?;
        }
        Ok(())
    }

    /// Fails once the batch deadline has passed or the interrupt was raised.
    pub fn check_time(&mut self) -> EvalResult<()> {
        if self.timed_out {
            return Err(EvalError::timed_out());
        }
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        if expired || self.interrupt.is_raised() {
            self.timed_out = true;
            return Err(EvalError::timed_out());
        }
        Ok(())
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn enter_call(&mut self) -> EvalResult<()> {
        if self.call_depth >= self.max_call_depth {
            return Err(EvalError::new(
                ErrorKind::Recursion,
                "maximum recursion depth exceeded",
            ));
        }
        self.call_depth += 1;
        self.peak_call_depth = self.peak_call_depth.max(self.call_depth);
        Ok(())
    }

    pub fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Rejects sequences longer than the configured maximum.
    pub fn check_len(&self, len: usize) -> EvalResult<()> {
        if len > self.max_sequence_len {
            return Err(EvalError::new(
                ErrorKind::Resource,
                format!(
                    "sequence of length {len} exceeds the limit of {}",
                    self.max_sequence_len
                ),
            ));
        }
        Ok(())
    }

    /// Longest text a line result may render to.
    pub fn max_output_len(&self) -> usize {
        self.max_output_len
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn peak_call_depth(&self) -> usize {
        self.peak_call_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(max_steps: u64) -> StepLimiter {
        let config = SandboxConfig::builder().max_steps(max_steps).build();
        StepLimiter::new(&config, Interrupt::new())
    }

    #[test]
    fn test_limiter_allows_within_budget() {
        let mut limiter = limiter(10);
        for _ in 0..10 {
            limiter.tick().unwrap();
        }
        assert_eq!(limiter.total_steps(), 10);
    }

    #[test]
    fn test_limiter_denies_over_budget() {
        let mut limiter = limiter(3);
        for _ in 0..3 {
            limiter.tick().unwrap();
        }
        let err = limiter.tick().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resource);

        limiter.begin_line();
        assert!(limiter.tick().is_ok());
    }

    #[test]
    fn test_interrupt_stops_execution() {
        let interrupt = Interrupt::new();
        let config = SandboxConfig::builder().build();
        let mut limiter = StepLimiter::new(&config, interrupt.clone());
        assert!(limiter.check_time().is_ok());

        interrupt.raise();
        assert_eq!(limiter.check_time().unwrap_err().kind, ErrorKind::Timeout);
        assert!(limiter.timed_out());
    }

    #[test]
    fn test_expired_deadline() {
        let config = SandboxConfig::builder().timeout(Duration::ZERO).build();
        let mut limiter = StepLimiter::new(&config, Interrupt::new());
        assert!(limiter.check_time().is_err());
    }

    #[test]
    fn test_call_depth() {
        let config = SandboxConfig::builder().max_call_depth(2).build();
        let mut limiter = StepLimiter::new(&config, Interrupt::new());
        limiter.enter_call().unwrap();
        limiter.enter_call().unwrap();
        assert_eq!(
            limiter.enter_call().unwrap_err().kind,
            ErrorKind::Recursion
        );
        limiter.leave_call();
        assert!(limiter.enter_call().is_ok());
        assert_eq!(limiter.peak_call_depth(), 2);
    }
}
