//! Line-level evaluation errors.
//!
//! These never escape a batch: the evaluator catches them and renders each
//! one as that line's result string.

use std::fmt;

/// Classification of a fault raised while evaluating a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    Value,
    ZeroDivision,
    Overflow,
    Index,
    Key,
    Attribute,
    /// An import of a module outside the available set.
    Import,
    Statistics,
    Recursion,
    Timeout,
    /// Step budget or sequence size limit exhausted.
    Resource,
    Runtime,
}

impl ErrorKind {
    /// The Python-style exception name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Value => "ValueError",
            ErrorKind::ZeroDivision => "ZeroDivisionError",
            ErrorKind::Overflow => "OverflowError",
            ErrorKind::Index => "IndexError",
            ErrorKind::Key => "KeyError",
            ErrorKind::Attribute => "AttributeError",
            ErrorKind::Import => "ImportError",
            ErrorKind::Statistics => "StatisticsError",
            ErrorKind::Recursion => "RecursionError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Resource => "MemoryError",
            ErrorKind::Runtime => "RuntimeError",
        }
    }
}

/// A fault raised by a line, rendered as `Error: <message>`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn name(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("name '{name}' is not defined"))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZeroDivision, message)
    }

    pub fn overflow() -> Self {
        Self::new(ErrorKind::Overflow, "integer overflow")
    }

    pub fn import_denied(module: &str) -> Self {
        Self::new(ErrorKind::Import, format!("Module '{module}' is not allowed"))
    }

    pub fn timed_out() -> Self {
        Self::new(ErrorKind::Timeout, "execution timed out")
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    pub fn is_import_denied(&self) -> bool {
        self.kind == ErrorKind::Import
    }

    /// The string stored as the line's result.
    pub fn render(&self) -> String {
        format!("Error: {}", self.message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_error_marker() {
        let err = EvalError::zero_division("division by zero");
        assert_eq!(err.render(), "Error: division by zero");
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_import_denied_message() {
        let err = EvalError::import_denied("os");
        assert!(err.is_import_denied());
        assert_eq!(err.message, "Module 'os' is not allowed");
    }
}
