//! Natively provided library modules.
//!
//! Each module is a static registration table: the callables a line may
//! invoke, their parameter text and documentation, plus numeric constants.
//! The tables double as the source of the function index.

/// A registration entry without keyword arguments.
macro_rules! entry {
    ($name:literal, $params:literal, $doc:literal, $call:expr) => {
        NativeFunction {
            name: $name,
            params: $params,
            keywords: &[],
            doc: $doc,
            call: $call,
        }
    };
}

pub mod cmath;
pub mod math;
pub mod random;
pub mod statistics;

use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::native::{Args, ModuleSpec};
use crate::interp::value::Value;

/// Every module with a native provider.
pub static NATIVE_MODULES: &[&ModuleSpec] = &[
    &math::MATH,
    &cmath::CMATH,
    &statistics::STATISTICS,
    &random::RANDOM,
];

/// Look up the native provider for a module name.
pub fn provider(name: &str) -> Option<&'static ModuleSpec> {
    NATIVE_MODULES.iter().copied().find(|spec| spec.name == name)
}

pub(crate) fn domain_error() -> EvalError {
    EvalError::value("math domain error")
}

pub(crate) fn range_error() -> EvalError {
    EvalError::new(ErrorKind::Overflow, "math range error")
}

/// Wrap a float result, mapping NaN from a non-NaN input to a domain
/// error and infinity from a finite input to a range error.
pub(crate) fn checked_float(input: &[f64], result: f64) -> EvalResult<Value> {
    if result.is_nan() && !input.iter().any(|x| x.is_nan()) {
        return Err(domain_error());
    }
    if result.is_infinite() && input.iter().all(|x| x.is_finite()) {
        return Err(range_error());
    }
    Ok(Value::Float(result))
}

/// Single real argument.
pub(crate) fn one_real(args: &Args, name: &str) -> EvalResult<f64> {
    args.expect(name, 1, 1)?;
    args.f64(0, name)
}

/// Two real arguments.
pub(crate) fn two_reals(args: &Args, name: &str) -> EvalResult<(f64, f64)> {
    args.expect(name, 2, 2)?;
    Ok((args.f64(0, name)?, args.f64(1, name)?))
}

/// `isclose` shared by math and cmath: keyword-only tolerances.
pub(crate) fn tolerances(args: &Args) -> EvalResult<(f64, f64)> {
    let rel_tol = match args.keyword("rel_tol") {
        Some(v) => v.expect_f64("isclose()")?,
        None => 1e-9,
    };
    let abs_tol = match args.keyword("abs_tol") {
        Some(v) => v.expect_f64("isclose()")?,
        None => 0.0,
    };
    if rel_tol < 0.0 || abs_tol < 0.0 {
        return Err(EvalError::value("tolerances must be non-negative"));
    }
    Ok((rel_tol, abs_tol))
}

pub(crate) fn is_close(a_minus_b: f64, a_abs: f64, b_abs: f64, rel_tol: f64, abs_tol: f64) -> bool {
    a_minus_b <= (rel_tol * b_abs).max(rel_tol * a_abs) || a_minus_b <= abs_tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_lookup() {
        assert_eq!(provider("math").map(|m| m.name), Some("math"));
        assert!(provider("numpy").is_none());
    }

    #[test]
    fn test_checked_float() {
        assert!(checked_float(&[1.0], f64::NAN).is_err());
        assert!(checked_float(&[f64::NAN], f64::NAN).is_ok());
        assert_eq!(
            checked_float(&[1000.0], f64::INFINITY).unwrap_err().kind,
            ErrorKind::Overflow
        );
    }
}
