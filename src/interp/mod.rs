//! A small interpreter for a restricted, Python-like line language.
//!
//! Lines are tokenized, parsed into a syntax tree and evaluated by a tree
//! walker with a fixed capability table: a short builtin whitelist, the
//! natively provided library modules, and nothing else. No host
//! interpreter, file, process or network access is reachable from a line.

pub mod ast;
pub mod builtins;
pub mod complex;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod methods;
pub mod native;
pub mod ops;
pub mod parser;
pub mod scope;
pub mod value;

pub use error::{ErrorKind, EvalError, EvalResult};
pub use eval::{ImportGate, Interpreter};
pub use native::{ModuleSpec, NativeFunction};
pub use value::Value;
