//! The fixed whitelist of computational builtins.
//!
//! Nothing here performs I/O or reflects on the interpreter.

use std::cmp::Ordering;

use crate::interp::error::{EvalError, EvalResult};
use crate::interp::native::{Args, NativeFunction, Runtime};
use crate::interp::ops;
use crate::interp::value::{compare_values, RangeValue, Value};
use crate::interp::ast::BinOp;

pub static BUILTINS: &[NativeFunction] = &[
    NativeFunction {
        name: "abs",
        params: "x, /",
        keywords: &[],
        doc: "Return the absolute value of the argument.",
        call: builtin_abs,
    },
    NativeFunction {
        name: "min",
        params: "iterable, *, default",
        keywords: &["default"],
        doc: "Return the smallest item in an iterable or the smallest of two or more arguments.",
        call: builtin_min,
    },
    NativeFunction {
        name: "max",
        params: "iterable, *, default",
        keywords: &["default"],
        doc: "Return the largest item in an iterable or the largest of two or more arguments.",
        call: builtin_max,
    },
    NativeFunction {
        name: "sum",
        params: "iterable, /, start=0",
        keywords: &["start"],
        doc: "Return the sum of a 'start' value (default: 0) plus an iterable of numbers.",
        call: builtin_sum,
    },
    NativeFunction {
        name: "range",
        params: "start, stop[, step]",
        keywords: &[],
        doc: "Return an object that produces a sequence of integers from start to stop by step.",
        call: builtin_range,
    },
    NativeFunction {
        name: "len",
        params: "obj, /",
        keywords: &[],
        doc: "Return the number of items in a container.",
        call: builtin_len,
    },
    NativeFunction {
        name: "round",
        params: "number, ndigits=None",
        keywords: &["ndigits"],
        doc: "Round a number to a given precision in decimal digits.",
        call: builtin_round,
    },
    NativeFunction {
        name: "pow",
        params: "base, exp, mod=None",
        keywords: &[],
        doc: "Equivalent to base**exp with 2 arguments or base**exp % mod with 3 arguments.",
        call: builtin_pow,
    },
];

pub fn lookup(name: &str) -> Option<&'static NativeFunction> {
    BUILTINS.iter().find(|f| f.name == name)
}

fn builtin_abs(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("abs", 1, 1)?;
    match args.arg(0) {
        Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(EvalError::overflow),
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Complex(c) => Ok(Value::Float(c.abs())),
        other => Err(EvalError::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

fn extremum(rt: &mut Runtime, args: Args, name: &str, wanted: Ordering) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvalError::type_error(format!(
            "{name} expected at least 1 argument, got 0"
        )));
    }
    let items = if args.len() == 1 {
        rt.collect(&args.arg(0))?
    } else {
        args.positional.clone()
    };
    let mut best: Option<Value> = None;
    for item in items {
        rt.tick()?;
        best = Some(match best {
            None => item,
            Some(current) => {
                if compare_values(&item, &current)? == Some(wanted) {
                    item
                } else {
                    current
                }
            }
        });
    }
    match best {
        Some(value) => Ok(value),
        None => args.keyword("default").cloned().ok_or_else(|| {
            EvalError::value(format!("{name}() arg is an empty sequence"))
        }),
    }
}

fn builtin_min(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    extremum(rt, args, "min", Ordering::Less)
}

fn builtin_max(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    extremum(rt, args, "max", Ordering::Greater)
}

fn builtin_sum(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("sum", 1, 2)?;
    let mut total = match (args.get(1), args.keyword("start")) {
        (Some(start), _) | (None, Some(start)) => start.clone(),
        (None, None) => Value::Int(0),
    };
    if matches!(total, Value::Str(_)) {
        return Err(EvalError::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in rt.collect(&args.arg(0))? {
        rt.tick()?;
        total = ops::binary(BinOp::Add, &total, &item, &rt.limiter)?;
    }
    Ok(total)
}

fn builtin_range(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("range", 1, 3)?;
    let (start, stop, step) = match args.len() {
        1 => (0, args.int(0, "range()")?, 1),
        2 => (args.int(0, "range()")?, args.int(1, "range()")?, 1),
        _ => (
            args.int(0, "range()")?,
            args.int(1, "range()")?,
            args.int(2, "range()")?,
        ),
    };
    if step == 0 {
        return Err(EvalError::value("range() arg 3 must not be zero"));
    }
    Ok(Value::Range(RangeValue { start, stop, step }))
}

fn builtin_len(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("len", 1, 1)?;
    let len = match args.arg(0) {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(dict) => dict.borrow().len(),
        Value::Range(r) => r.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| EvalError::overflow())
}

fn builtin_round(_rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("round", 1, 2)?;
    let ndigits = match (args.get(1), args.keyword("ndigits")) {
        (Some(Value::None), _) | (None, None) | (None, Some(Value::None)) => None,
        (Some(n), _) | (None, Some(n)) => Some(n.expect_int("round()")?),
    };
    match (args.arg(0), ndigits) {
        (Value::Int(i), None) => Ok(Value::Int(i)),
        (Value::Bool(b), None) => Ok(Value::Int(b as i64)),
        (Value::Int(i), Some(n)) => Ok(Value::Int(round_int(i, n)?)),
        (Value::Float(f), None) => {
            let rounded = f.round_ties_even();
            if !rounded.is_finite() {
                return Err(EvalError::value("cannot convert float infinity or NaN to integer"));
            }
            if rounded.abs() >= 9.2e18 {
                return Err(EvalError::overflow());
            }
            Ok(Value::Int(rounded as i64))
        }
        (Value::Float(f), Some(n)) => Ok(Value::Float(round_float(f, n))),
        (other, _) => Err(EvalError::type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

/// Round to a negative number of digits, half to even, in exact integer
/// arithmetic.
fn round_int(value: i64, ndigits: i64) -> EvalResult<i64> {
    if ndigits >= 0 {
        return Ok(value);
    }
    // 10**20 / 2 is already beyond every i64, so deeper rounding is 0.
    let Some(factor) = ndigits
        .checked_neg()
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n <= 19)
        .map(|n| 10i128.pow(n))
    else {
        return Ok(0);
    };
    let value = i128::from(value);
    let mut quotient = value.div_euclid(factor);
    let twice_rem = 2 * value.rem_euclid(factor);
    if twice_rem > factor || (twice_rem == factor && quotient % 2 != 0) {
        quotient += 1;
    }
    i64::try_from(quotient * factor).map_err(|_| EvalError::overflow())
}

fn round_float(value: f64, ndigits: i64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let ndigits = ndigits.clamp(-308, 308) as i32;
    let factor = 10f64.powi(ndigits);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}

fn builtin_pow(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("pow", 2, 3)?;
    let base = args.arg(0);
    let exp = args.arg(1);
    let Some(modulus) = args.get(2).filter(|m| !matches!(m, Value::None)) else {
        return ops::binary(BinOp::Pow, &base, &exp, &rt.limiter);
    };
    let (Some(b), Some(e), Some(m)) = (base.as_int(), exp.as_int(), modulus.as_int()) else {
        return Err(EvalError::type_error(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    };
    if m == 0 {
        return Err(EvalError::value("pow() 3rd argument cannot be 0"));
    }
    if e < 0 {
        return Err(EvalError::value("base is not invertible for the given modulus"));
    }
    Ok(Value::Int(mod_pow(b, e, m)))
}

/// Modular exponentiation with Python's sign convention for the result.
fn mod_pow(base: i64, mut exp: i64, modulus: i64) -> i64 {
    let m = modulus.unsigned_abs() as u128;
    let mut result: u128 = 1 % m;
    let mut b = (base as i128).rem_euclid(m as i128) as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        exp >>= 1;
    }
    let result = result as i64;
    if modulus < 0 && result != 0 {
        result + modulus
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::error::ErrorKind;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::{Interrupt, StepLimiter};

    fn runtime() -> Runtime {
        Runtime::new(StepLimiter::new(&SandboxConfig::default(), Interrupt::new()))
    }

    fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let func = lookup(name).unwrap();
        func.invoke(&mut runtime(), Args::new(args))
    }

    #[test]
    fn test_whitelist_is_fixed() {
        let names: Vec<_> = BUILTINS.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec!["abs", "min", "max", "sum", "range", "len", "round", "pow"]
        );
        assert!(lookup("open").is_none());
        assert!(lookup("eval").is_none());
    }

    #[test]
    fn test_round_is_bankers() {
        assert!(matches!(call("round", vec![Value::Float(2.5)]), Ok(Value::Int(2))));
        assert!(matches!(call("round", vec![Value::Float(3.5)]), Ok(Value::Int(4))));
        assert!(matches!(
            call("round", vec![Value::Float(3.14159), Value::Int(2)]),
            Ok(Value::Float(f)) if (f - 3.14).abs() < 1e-12
        ));
    }

    #[test]
    fn test_round_int_negative_digits() {
        let round = |value: i64, ndigits: i64| {
            call("round", vec![Value::Int(value), Value::Int(ndigits)]).map(|v| v.repr())
        };
        assert_eq!(round(1250, -2).unwrap(), "1200");
        assert_eq!(round(1350, -2).unwrap(), "1400");
        assert_eq!(round(-1251, -2).unwrap(), "-1300");
        assert_eq!(round(15, -4_294_967_297).unwrap(), "0");
        assert_eq!(round(5, i64::MIN).unwrap(), "0");
        assert_eq!(round(9_000_000_000_000_000_000, -18).unwrap(), "9000000000000000000");
        assert_eq!(round(i64::MAX, -1).unwrap_err().kind, ErrorKind::Overflow);
    }

    #[test]
    fn test_len_of_huge_range_overflows() {
        let range = Value::Range(RangeValue {
            start: i64::MIN,
            stop: i64::MAX,
            step: 1,
        });
        assert_eq!(call("len", vec![range]).unwrap_err().kind, ErrorKind::Overflow);
    }

    #[test]
    fn test_min_max_sum() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert!(matches!(call("min", vec![list.clone()]), Ok(Value::Int(1))));
        assert!(matches!(call("max", vec![Value::Int(3), Value::Int(9)]), Ok(Value::Int(9))));
        assert!(matches!(call("sum", vec![list]), Ok(Value::Int(6))));
        assert!(call("min", vec![Value::list(Vec::new())]).is_err());
    }

    #[test]
    fn test_modular_pow() {
        assert!(matches!(
            call("pow", vec![Value::Int(3), Value::Int(4), Value::Int(5)]),
            Ok(Value::Int(1))
        ));
        assert!(matches!(
            call("pow", vec![Value::Int(2), Value::Int(10)]),
            Ok(Value::Int(1024))
        ));
    }

    #[test]
    fn test_len_and_range() {
        let range = call("range", vec![Value::Int(0), Value::Int(10), Value::Int(2)]).unwrap();
        assert!(matches!(call("len", vec![range]), Ok(Value::Int(5))));
        assert!(call("range", vec![Value::Int(0), Value::Int(1), Value::Int(0)]).is_err());
        assert!(call("len", vec![Value::Int(3)]).is_err());
    }
}
